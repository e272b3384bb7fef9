/*!
# USSR Core

Uniform resources with invertible, composable transformations.

A [`Resource`] is a named payload together with its location and content
type. Transformers convert a resource's payload from one format to another
and can undo that conversion; chains of transformers compose into a single
transformer. A [`ResourceManager`] registers transformers under content-type
keys, keeps the resource's content-type tag in step with its payload, and
saves or loads resources through the handler for their location kind.

## Built-in transformers

| Key        | Transformer          | Payload                        |
|------------|----------------------|--------------------------------|
| `yaml`     | `JsonToYaml`         | JSON text to YAML text         |
| `json`     | `YamlToJson`         | YAML text to JSON text         |
| `csv.json` | `CsvToJson`          | CSV with headers to JSON array |
| `zlib.bin` | `Compress::zlib`     | bytes to zlib stream           |
| `gz`       | `Compress::gzip`     | bytes to gzip stream           |
| `bytes`    | `TextEncoder`        | text to encoded bytes          |
| `message`  | `MessageParser`      | RFC 822 bytes to MIME message  |

## Usage

```rust
use ussr_core::{create_default_manager, LocationKind, Payload, Resource};

let manager = create_default_manager()?;

let mut resource = Resource::new("my_resource", "example", LocationKind::Memory)
    .with_content_type("json")
    .with_payload(br#"{"key":"value","age":30}"#.to_vec());

manager.apply(&mut resource, "yaml")?;
assert_eq!(resource.payload, Payload::Bytes(b"key: value\nage: 30\n".to_vec()));

manager.invert(&mut resource, "yaml")?;
assert_eq!(resource.payload, Payload::Bytes(br#"{"key":"value","age":30}"#.to_vec()));
# Ok::<(), ussr_core::UssrError>(())
```
*/

pub mod compression;
pub mod config;
pub mod error;
pub mod handler;
pub mod manager;
pub mod message;
pub mod observability;
pub mod registry;
pub mod resource;
pub mod transform;


pub use config::{Location, ManagerConfig};
pub use error::{Result, UssrError};
pub use handler::{Handler, HandlerFactory, MemoryHandler};
pub use manager::{create_default_manager, ResourceManager};
pub use message::MimeMessage;
pub use observability::{init_default_observability, init_observability};
pub use registry::TransformerRegistry;
pub use resource::{ContentTag, LocationKind, Payload, Resource};
pub use transform::{compose, ComposedTransformer, Direction, TransformOptions, Transformer};

#[cfg(feature = "local")]
pub use handler::local::FileSystemHandler;
#[cfg(feature = "metrics")]
pub use observability::UssrMetrics;
