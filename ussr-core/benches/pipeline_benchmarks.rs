/*!
Performance benchmarks for transformer pipelines and filesystem I/O.
*/

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tempfile::TempDir;
use ussr_core::transform::{Compress, JsonToYaml};
use ussr_core::{
    create_default_manager, ComposedTransformer, LocationKind, ManagerConfig, Resource,
    ResourceManager,
};

// Build a JSON array of records of roughly the requested size
fn generate_json(size_kb: usize) -> Vec<u8> {
    let target_bytes = size_kb * 1024;
    let mut rows = Vec::new();
    let mut total = 0;

    while total < target_bytes {
        let row = serde_json::json!({
            "sample": rows.len(),
            "sensor": format!("sensor_{}", rows.len() % 16),
            "reading": rand::random::<f64>(),
            "flags": ["calibrated", "checked"],
        });
        total += row.to_string().len();
        rows.push(row);
    }

    serde_json::to_vec(&serde_json::Value::Array(rows)).unwrap()
}

fn json_resource(data: &[u8]) -> Resource {
    Resource::new("bench", "bench", LocationKind::Filesystem)
        .with_content_type("json")
        .with_payload(data.to_vec())
}

fn benchmark_single_transformers(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_transform");
    let manager = create_default_manager().unwrap();

    for size_kb in [1, 10, 100].iter() {
        let data = generate_json(*size_kb);
        group.throughput(Throughput::Bytes(data.len() as u64));

        for key in ["yaml", "zlib.bin", "gz"] {
            group.bench_with_input(
                BenchmarkId::new(key, format!("{size_kb}KB")),
                &data,
                |b, data| {
                    b.iter(|| {
                        let mut resource = json_resource(data);
                        manager.apply(black_box(&mut resource), key).unwrap();
                        black_box(resource);
                    });
                },
            );
        }
    }

    group.finish();
}

fn benchmark_composed_roundtrip(c: &mut Criterion) {
    let mut group = c.benchmark_group("composed_roundtrip");

    let mut manager = ResourceManager::new();
    manager.register(
        "yaml.gz",
        ComposedTransformer::new()
            .then(JsonToYaml)
            .then(Compress::gzip(6)),
    );

    let data = generate_json(100);
    group.throughput(Throughput::Bytes(data.len() as u64));

    group.bench_function("json_yaml_gzip", |b| {
        b.iter(|| {
            let mut resource = json_resource(&data);
            manager.apply(&mut resource, "yaml.gz").unwrap();
            manager.invert(&mut resource, "yaml.gz").unwrap();
            black_box(resource);
        });
    });

    group.finish();
}

fn benchmark_filesystem_save(c: &mut Criterion) {
    let mut group = c.benchmark_group("filesystem_save");

    let temp_dir = TempDir::new().unwrap();
    let config = ManagerConfig::default().with_base_dir(temp_dir.path());
    let manager = ResourceManager::with_defaults(&config).unwrap();

    for size_kb in [1, 100].iter() {
        let data = generate_json(*size_kb);
        group.throughput(Throughput::Bytes(data.len() as u64));

        group.bench_with_input(
            BenchmarkId::new("save", format!("{size_kb}KB")),
            &data,
            |b, data| {
                b.iter(|| {
                    let mut resource = json_resource(data);
                    resource.name = format!("bench_{}", rand::random::<u32>());
                    manager.save(black_box(&resource)).unwrap();
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_single_transformers,
    benchmark_composed_roundtrip,
    benchmark_filesystem_save
);
criterion_main!(benches);
