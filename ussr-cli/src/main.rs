/*!
USSR CLI - Command-line interface for USSR resource transformations.

This CLI inspects resource files, converts them with the registered
transformers and fetches remote resources to local disk.
*/

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tabled::{Table, Tabled};
use tracing::{error, info};
use ussr_core::config::{DEFAULT_COMPRESSION_LEVEL, DEFAULT_HTTP_TIMEOUT_SECS};
use ussr_core::resource::content_key;
use ussr_core::{
    Direction, Location, LocationKind, ManagerConfig, Resource, ResourceManager, TransformOptions,
};

#[derive(Parser)]
#[command(name = "ussr")]
#[command(about = "CLI for USSR resource transformations")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Compression level for the zlib.bin and gz transformers (0-9)
    #[arg(long, global = true, env = "USSR_COMPRESSION_LEVEL", default_value_t = DEFAULT_COMPRESSION_LEVEL)]
    compression_level: u32,

    /// Timeout in seconds for fetching URL resources
    #[arg(long, global = true, env = "USSR_HTTP_TIMEOUT", default_value_t = DEFAULT_HTTP_TIMEOUT_SECS)]
    http_timeout: u64,

    /// Root directory for relative output locations
    #[arg(long, global = true, env = "USSR_BASE_DIR")]
    base_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the registered transformer keys
    Keys,
    /// Show details of a resource file
    Inspect {
        /// Path to the resource file
        file: PathBuf,
    },
    /// Apply a transformer to a resource file and save the result
    Convert {
        /// Path to the resource file
        file: PathBuf,
        /// Transformer key to apply
        #[arg(short, long)]
        to: String,
        /// Undo the transformer instead of applying it
        #[arg(short, long)]
        inverse: bool,
        /// Directory to write the result to (defaults to the input's directory)
        #[arg(short, long)]
        out_dir: Option<PathBuf>,
    },
    /// Download a resource and save it to disk
    Fetch {
        /// URL of the resource
        url: String,
        /// Name of the saved resource
        #[arg(short, long)]
        name: String,
        /// File extension (inferred from the URL when omitted)
        #[arg(short, long)]
        extension: Option<String>,
        /// Directory to write the resource to
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,
    },
}

#[derive(Tabled)]
struct TransformerInfo {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Source")]
    source: String,
    #[tabled(rename = "Target")]
    target: String,
    #[tabled(rename = "Steps")]
    steps: usize,
}

fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose);

    let config = create_manager_config(&cli);
    let manager = ResourceManager::with_defaults(&config)?;

    match cli.command {
        Commands::Keys => list_keys(&manager),
        Commands::Inspect { file } => inspect_resource(&file)?,
        Commands::Convert {
            file,
            to,
            inverse,
            out_dir,
        } => convert_resource(&manager, &config, &file, &to, inverse, out_dir.as_deref())?,
        Commands::Fetch {
            url,
            name,
            extension,
            out_dir,
        } => fetch_resource(&manager, &config, &url, &name, extension, &out_dir)?,
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug"))
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn create_manager_config(cli: &Cli) -> ManagerConfig {
    let mut config = ManagerConfig::default()
        .with_compression_level(cli.compression_level)
        .with_http_timeout_secs(cli.http_timeout);
    if let Some(base_dir) = &cli.base_dir {
        config = config.with_base_dir(base_dir);
    }
    config
}

fn list_keys(manager: &ResourceManager) {
    let rows: Vec<TransformerInfo> = manager
        .keys()
        .into_iter()
        .filter_map(|key| {
            let transformer = manager.get(key).ok()?;
            Some(TransformerInfo {
                key: key.to_string(),
                source: transformer.source_type().unwrap_or("-").to_string(),
                target: transformer.content_type().to_string(),
                steps: transformer.steps(),
            })
        })
        .collect();

    if rows.is_empty() {
        println!("No transformers registered");
    } else {
        println!("{}", Table::new(rows));
    }
}

fn inspect_resource(file: &Path) -> Result<(), anyhow::Error> {
    info!("Inspecting resource: {}", file.display());

    let resource = Resource::from_file(file)
        .with_context(|| format!("Failed to read resource {}", file.display()))?;

    println!("Resource Details:");
    println!("  Name: {}", resource.name);
    println!("  Location: {}", resource.location);
    println!(
        "  Content Type: {}",
        resource.content_type.as_deref().unwrap_or("unknown")
    );
    println!("  Size: {}", format_size(resource.payload.len() as u64));
    println!("  SHA-256: {}", resource.digest());

    Ok(())
}

fn convert_resource(
    manager: &ResourceManager,
    config: &ManagerConfig,
    file: &Path,
    key: &str,
    inverse: bool,
    out_dir: Option<&Path>,
) -> Result<(), anyhow::Error> {
    let direction = if inverse {
        Direction::Inverse
    } else {
        Direction::Forward
    };
    info!("Converting {} ({} {})", file.display(), direction, key);

    let mut resource = Resource::from_file(file)
        .with_context(|| format!("Failed to read resource {}", file.display()))?;

    if let Err(e) = manager.transform(&mut resource, key, direction, &TransformOptions::default()) {
        error!("✗ Failed to convert {}: {}", file.display(), e);
        return Err(e.into());
    }

    if let Some(out_dir) = out_dir {
        resource.location = out_dir.to_string_lossy().into_owned();
    }
    manager.save(&resource)?;

    println!("✓ Wrote {}", output_path(config, &resource).display());
    Ok(())
}

fn fetch_resource(
    manager: &ResourceManager,
    config: &ManagerConfig,
    url: &str,
    name: &str,
    extension: Option<String>,
    out_dir: &Path,
) -> Result<(), anyhow::Error> {
    let location = Location::parse(url)?;
    if location.kind != LocationKind::Url {
        bail!("Not an http(s) URL: {url}");
    }

    info!("Fetching {}", url);
    let mut resource = Resource::new(name, location.location, LocationKind::Url);
    manager.load(&mut resource)?;

    let extension = extension.or_else(|| url_extension(url));
    resource.location_kind = LocationKind::Filesystem;
    resource.location = out_dir.to_string_lossy().into_owned();
    if let Some(extension) = extension {
        resource.content_type = Some(content_key(&extension).to_string());
        resource.extension = Some(extension);
    }
    manager.save(&resource)?;

    println!(
        "✓ Saved {} ({})",
        output_path(config, &resource).display(),
        format_size(resource.payload.len() as u64)
    );
    Ok(())
}

fn output_path(config: &ManagerConfig, resource: &Resource) -> PathBuf {
    let path = resource.path();
    match &config.base_dir {
        Some(base) if path.is_relative() => base.join(path),
        _ => path,
    }
}

/// Extension of the last path segment of a URL, ignoring query and fragment
fn url_extension(url: &str) -> Option<String> {
    let without_query = url.split(|c| c == '?' || c == '#').next().unwrap_or(url);
    let (_, path) = without_query.split_once("://")?;
    let (_, path) = path.split_once('/')?;
    Path::new(path)
        .extension()
        .map(|extension| extension.to_string_lossy().into_owned())
}

fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
    }

    #[test]
    fn test_url_extension() {
        assert_eq!(
            url_extension("https://example.org/data/table.csv?raw=1"),
            Some("csv".to_string())
        );
        assert_eq!(url_extension("https://example.org/"), None);
        assert_eq!(url_extension("https://example.org"), None);
    }

    #[test]
    fn test_cli_parses_global_flags() {
        let cli = Cli::try_parse_from([
            "ussr",
            "--compression-level",
            "9",
            "convert",
            "data.json",
            "--to",
            "yaml",
        ])
        .unwrap();

        assert_eq!(cli.compression_level, 9);
        assert!(matches!(cli.command, Commands::Convert { ref to, inverse: false, .. } if to == "yaml"));
    }

    #[test]
    fn test_convert_writes_next_to_out_dir() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("data.json");
        std::fs::write(&input, br#"{"key":"value"}"#).unwrap();

        let config = ManagerConfig::default();
        let manager = ResourceManager::with_defaults(&config).unwrap();
        let out_dir = temp_dir.path().join("out");

        convert_resource(&manager, &config, &input, "yaml", false, Some(&out_dir)).unwrap();

        let written = std::fs::read_to_string(out_dir.join("data.yaml")).unwrap();
        assert_eq!(written, "key: value\n");
    }

    #[test]
    fn test_convert_inverse_does_not_overwrite_input() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("data.json");
        std::fs::write(&input, br#"{"a":1}"#).unwrap();

        let config = ManagerConfig::default();
        let manager = ResourceManager::with_defaults(&config).unwrap();

        convert_resource(&manager, &config, &input, "gz", false, None).unwrap();
        let compressed_path = temp_dir.path().join("data.gz");
        let compressed = std::fs::read(&compressed_path).unwrap();
        assert_ne!(compressed, br#"{"a":1}"#);

        convert_resource(&manager, &config, &compressed_path, "gz", true, None).unwrap();

        assert_eq!(std::fs::read(&compressed_path).unwrap(), compressed);
        assert_eq!(
            std::fs::read(temp_dir.path().join("data")).unwrap(),
            br#"{"a":1}"#
        );
    }

    #[test]
    fn test_convert_inverse_restores_inner_extension() {
        let temp_dir = TempDir::new().unwrap();
        let config = ManagerConfig::default();
        let manager = ResourceManager::with_defaults(&config).unwrap();

        let location = temp_dir.path().to_string_lossy();
        let mut resource = Resource::new("data.json", location, LocationKind::Filesystem)
            .with_payload(br#"{"a":1}"#.to_vec());
        manager.apply(&mut resource, "zlib.bin").unwrap();
        manager.save(&resource).unwrap();
        let input = temp_dir.path().join("data.json.zlib.bin");

        let out_dir = temp_dir.path().join("out");
        convert_resource(&manager, &config, &input, "zlib.bin", true, Some(&out_dir)).unwrap();

        assert_eq!(
            std::fs::read(out_dir.join("data.json")).unwrap(),
            br#"{"a":1}"#
        );
        assert!(input.exists());
    }
}
