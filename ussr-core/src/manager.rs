/*!
Resource manager that dispatches transformations and location I/O.

The manager owns a [`TransformerRegistry`] and a [`HandlerFactory`]. It
resolves transformers by content-type key, keeps the resource's content-type
tag in step with its payload, and routes saves and loads to the handler for
the resource's location kind.
*/

use tracing::{debug, info};

use crate::config::ManagerConfig;
use crate::handler::{Handler, HandlerFactory, MemoryHandler};
use crate::registry::TransformerRegistry;
use crate::resource::{LocationKind, Resource};
use crate::transform::{
    Compress, CsvToJson, Direction, JsonToYaml, MessageParser, TextEncoder, TransformOptions,
    Transformer, YamlToJson,
};
use crate::{Result, UssrError};

#[cfg(feature = "metrics")]
use crate::observability::{MetricsTimer, UssrMetrics};

/// Registers transformers and handlers and applies them to resources
///
/// # Example
/// ```rust
/// use ussr_core::transform::JsonToYaml;
/// use ussr_core::{Direction, LocationKind, Resource, ResourceManager, TransformOptions};
///
/// let mut manager = ResourceManager::new();
/// manager.register("yaml", JsonToYaml);
///
/// let mut resource = Resource::new("my_resource", "example", LocationKind::Memory)
///     .with_content_type("json")
///     .with_payload(br#"{"key":"value","age":30}"#.to_vec());
///
/// manager.transform(&mut resource, "yaml", Direction::Forward, &TransformOptions::default())?;
/// assert_eq!(resource.content_type.as_deref(), Some("yaml"));
///
/// manager.transform(&mut resource, "yaml", Direction::Inverse, &TransformOptions::default())?;
/// assert_eq!(resource.content_type.as_deref(), Some("json"));
/// # Ok::<(), ussr_core::UssrError>(())
/// ```
#[derive(Default)]
pub struct ResourceManager {
    transformers: TransformerRegistry,
    handlers: HandlerFactory,
}

impl ResourceManager {
    /// Create a manager with no transformers and no handlers
    pub fn new() -> Self {
        Self {
            transformers: TransformerRegistry::new(),
            handlers: HandlerFactory::new(),
        }
    }

    /// Create a manager with the built-in transformers and handlers
    ///
    /// Registered keys: `yaml`, `json`, `csv.json`, `zlib.bin`, `gz`, `bytes`
    /// and `message`. Handlers cover every location kind enabled at build time.
    pub fn with_defaults(config: &ManagerConfig) -> Result<Self> {
        config.validate()?;

        let mut manager = Self::new();
        manager.register_default(JsonToYaml);
        manager.register_default(YamlToJson);
        manager.register("csv.json", CsvToJson);
        manager.register_default(Compress::zlib(config.compression_level));
        manager.register_default(Compress::gzip(config.compression_level));
        manager.register_default(TextEncoder);
        manager.register_default(MessageParser);

        manager.add_handler(LocationKind::Memory, MemoryHandler);

        #[cfg(feature = "local")]
        {
            use crate::handler::local::FileSystemHandler;
            let handler = match &config.base_dir {
                Some(base_dir) => FileSystemHandler::with_base_dir(base_dir),
                None => FileSystemHandler::new(),
            };
            manager.add_handler(LocationKind::Filesystem, handler);
        }

        #[cfg(feature = "url")]
        {
            use crate::handler::url::UrlHandler;
            let timeout = std::time::Duration::from_secs(config.http_timeout_secs);
            manager.add_handler(LocationKind::Url, UrlHandler::blocking(timeout)?);
        }

        Ok(manager)
    }

    /// Register `transformer` under `key`, silently replacing any previous one
    pub fn register<K, T>(&mut self, key: K, transformer: T) -> Option<Box<dyn Transformer>>
    where
        K: Into<String>,
        T: Transformer + 'static,
    {
        self.transformers.register(key, transformer)
    }

    /// Register `transformer` under the content type it produces
    pub fn register_default<T>(&mut self, transformer: T) -> Option<Box<dyn Transformer>>
    where
        T: Transformer + 'static,
    {
        self.transformers.register_default(transformer)
    }

    pub fn add_handler<H: Handler + 'static>(&mut self, kind: LocationKind, handler: H) {
        self.handlers.add_handler(kind, handler);
    }

    pub fn transformers(&self) -> &TransformerRegistry {
        &self.transformers
    }

    pub fn handlers(&self) -> &HandlerFactory {
        &self.handlers
    }

    /// Look up the transformer registered under `key`
    pub fn get(&self, key: &str) -> Result<&dyn Transformer> {
        self.transformers.resolve(key)
    }

    /// Registered transformer keys in sorted order
    pub fn keys(&self) -> Vec<&str> {
        self.transformers.keys()
    }

    /// Apply the transformer registered under `key` to `resource`
    ///
    /// A forward application records the current content-type tag in the
    /// resource's lineage and retags it as `key`. An inverse application of
    /// the key the resource is currently tagged with restores, in order of
    /// preference: the recorded tag, the transformer's source type, the inner
    /// suffix of a compound name (`data.json` tagged `gz` becomes `data`
    /// tagged `json`), or no tag at all. It never leaves the resource tagged
    /// `key`. Inverting any other key discards the lineage and retags with
    /// the source type when there is one. Partial applications (with
    /// `options.until` set) leave the tag alone.
    ///
    /// # Errors
    /// * `UssrError::UnregisteredTransformer` - nothing is registered under
    ///   `key`; the resource is not touched
    /// * `UssrError::Decode` - the payload is not valid input for the transformer
    pub fn transform<'r>(
        &self,
        resource: &'r mut Resource,
        key: &str,
        direction: Direction,
        options: &TransformOptions,
    ) -> Result<&'r mut Resource> {
        let transformer = self.transformers.resolve(key)?;

        debug!(
            name = %resource.name,
            key,
            %direction,
            payload = resource.payload.kind(),
            "Applying transformer"
        );

        let outcome = transformer.apply(resource, direction, options);

        #[cfg(feature = "metrics")]
        match &outcome {
            Ok(()) => UssrMetrics::global().record_transform(key, direction.as_str()),
            Err(_) => UssrMetrics::global().record_transform_error(key, direction.as_str()),
        }

        outcome?;

        if options.until.is_none() {
            match direction {
                Direction::Forward => resource.push_tag(key),
                Direction::Inverse => Self::restore_tag(resource, key, transformer),
            }
        }

        Ok(resource)
    }

    /// Forward application with default options
    pub fn apply<'r>(&self, resource: &'r mut Resource, key: &str) -> Result<&'r mut Resource> {
        self.transform(resource, key, Direction::Forward, &TransformOptions::default())
    }

    /// Inverse application with default options
    pub fn invert<'r>(&self, resource: &'r mut Resource, key: &str) -> Result<&'r mut Resource> {
        self.transform(resource, key, Direction::Inverse, &TransformOptions::default())
    }

    fn restore_tag(resource: &mut Resource, key: &str, transformer: &dyn Transformer) {
        if resource.content_type.as_deref() != Some(key) {
            // Out of order: the recorded lineage no longer matches the payload
            resource.clear_lineage();
            if let Some(source) = transformer.source_type() {
                resource.set_tag(source);
            }
            return;
        }
        if resource.pop_tag() {
            return;
        }
        if let Some(source) = transformer.source_type() {
            resource.set_tag(source);
        } else if !resource.unwrap_name_suffix() {
            resource.clear_tag();
        }
    }

    /// Return a deep, independent copy of `resource`
    pub fn clone_resource(&self, resource: &Resource) -> Resource {
        resource.clone()
    }

    /// Persist the resource through the handler for its location kind
    pub fn save(&self, resource: &Resource) -> Result<()> {
        let handler = self.handler_for(resource.location_kind, "save")?;

        info!(
            name = %resource.name,
            kind = %resource.location_kind,
            location = %resource.location,
            "Saving resource"
        );

        #[cfg(feature = "metrics")]
        let timer = MetricsTimer::start(resource.location_kind.as_str(), "save");

        handler.save(resource)?;

        #[cfg(feature = "metrics")]
        {
            timer.finish();
            UssrMetrics::global().record_payload_size(resource.payload.len());
        }

        Ok(())
    }

    /// Transform a copy of the resource to `key` and persist the copy
    ///
    /// The original resource is left as it is; the transformed copy is returned.
    pub fn save_as(&self, resource: &Resource, key: &str) -> Result<Resource> {
        let mut converted = self.clone_resource(resource);
        self.apply(&mut converted, key)?;
        self.save(&converted)?;
        Ok(converted)
    }

    /// Replace the resource's payload with what its handler loads
    pub fn load<'r>(&self, resource: &'r mut Resource) -> Result<&'r mut Resource> {
        let handler = self.handler_for(resource.location_kind, "load")?;

        info!(
            name = %resource.name,
            kind = %resource.location_kind,
            location = %resource.location,
            "Loading resource"
        );

        #[cfg(feature = "metrics")]
        let timer = MetricsTimer::start(resource.location_kind.as_str(), "load");

        let payload = handler.load(resource)?;

        #[cfg(feature = "metrics")]
        {
            timer.finish();
            UssrMetrics::global().record_payload_size(payload.len());
        }

        resource.payload = payload;
        Ok(resource)
    }

    fn handler_for(&self, kind: LocationKind, operation: &'static str) -> Result<&dyn Handler> {
        self.handlers
            .get(kind)
            .ok_or_else(|| UssrError::unsupported_location(kind, operation))
    }
}

/// Convenience function to create a manager with default configuration
///
/// # Example
/// ```rust
/// let manager = ussr_core::create_default_manager()?;
/// assert!(manager.keys().contains(&"zlib.bin"));
/// # Ok::<(), ussr_core::UssrError>(())
/// ```
pub fn create_default_manager() -> Result<ResourceManager> {
    ResourceManager::with_defaults(&ManagerConfig::default())
}
