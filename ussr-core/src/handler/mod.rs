/*!
Location handlers for persisting and retrieving resources.

A handler performs the raw I/O for one [`LocationKind`]. The
[`ResourceManager`](crate::ResourceManager) picks a handler from its
[`HandlerFactory`] by the resource's location kind and never touches the
filesystem or network itself.
*/

#[cfg(feature = "local")]
pub mod local;
#[cfg(feature = "url")]
pub mod url;

use std::collections::HashMap;

use async_trait::async_trait;
use futures::io::AsyncRead;
use tracing::warn;

use crate::resource::{LocationKind, Payload, Resource};
use crate::Result;

#[cfg(feature = "async-rt")]
use once_cell::sync::Lazy;
#[cfg(feature = "async-rt")]
use std::sync::Arc;
#[cfg(feature = "async-rt")]
use tokio::runtime::Runtime;

#[cfg(feature = "async-rt")]
static GLOBAL_RT: Lazy<Runtime> = Lazy::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(num_cpus::get().clamp(1, 4))
        .enable_all()
        .build()
        .expect("Failed to create handler runtime")
});

/// Saves and loads the payload of resources at one kind of location
#[cfg_attr(test, mockall::automock)]
pub trait Handler {
    /// Persist `resource.payload` at the resource's location
    fn save(&self, resource: &Resource) -> Result<()>;

    /// Read the payload stored at the resource's location
    fn load(&self, resource: &Resource) -> Result<Payload>;
}

/// Async counterpart of [`Handler`] for network-backed locations
#[async_trait]
pub trait AsyncHandler: Send + Sync {
    async fn save(&self, resource: &Resource) -> Result<()>;

    /// Open a reader over the bytes stored at the resource's location
    async fn load(&self, resource: &Resource) -> Result<Box<dyn AsyncRead + Send + Unpin>>;
}

/// Blocking wrapper that drives an [`AsyncHandler`] on a shared runtime
///
/// Calls block the current thread until the async operation completes, so
/// this must not be used from within an async context.
#[cfg(feature = "async-rt")]
pub struct BlockingHandler<A: AsyncHandler> {
    inner: Arc<A>,
}

#[cfg(feature = "async-rt")]
impl<A: AsyncHandler> BlockingHandler<A> {
    pub fn new(handler: A) -> Self {
        Self {
            inner: Arc::new(handler),
        }
    }
}

#[cfg(feature = "async-rt")]
impl<A: AsyncHandler> Handler for BlockingHandler<A> {
    fn save(&self, resource: &Resource) -> Result<()> {
        GLOBAL_RT.block_on(self.inner.save(resource))
    }

    fn load(&self, resource: &Resource) -> Result<Payload> {
        use futures::io::AsyncReadExt;

        GLOBAL_RT.block_on(async {
            let mut reader = self.inner.load(resource).await?;
            let mut data = Vec::new();
            reader.read_to_end(&mut data).await?;
            Ok(Payload::Bytes(data))
        })
    }
}

/// Handler for in-memory resources
///
/// There is nowhere to persist to, so both operations are no-ops that emit a
/// warning. Loading hands back the payload the resource already holds.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryHandler;

impl Handler for MemoryHandler {
    fn save(&self, resource: &Resource) -> Result<()> {
        warn!(name = %resource.name, "Cannot save a resource held in memory");
        Ok(())
    }

    fn load(&self, resource: &Resource) -> Result<Payload> {
        warn!(
            name = %resource.name,
            "Cannot load a resource from memory, keeping its current payload"
        );
        Ok(resource.payload.clone())
    }
}

/// Maps location kinds to the handler responsible for them
#[derive(Default)]
pub struct HandlerFactory {
    handlers: HashMap<LocationKind, Box<dyn Handler>>,
}

impl HandlerFactory {
    /// Create a factory with no handlers registered
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register `handler` for `kind`, replacing any previous one
    pub fn add_handler<H: Handler + 'static>(&mut self, kind: LocationKind, handler: H) {
        self.handlers.insert(kind, Box::new(handler));
    }

    pub fn get(&self, kind: LocationKind) -> Option<&dyn Handler> {
        self.handlers.get(&kind).map(|handler| handler.as_ref())
    }

    pub fn supports(&self, kind: LocationKind) -> bool {
        self.handlers.contains_key(&kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_handler_is_a_noop() {
        let handler = MemoryHandler;
        let resource = Resource::in_memory("scratch", "payload");

        assert!(handler.save(&resource).is_ok());
        assert_eq!(
            handler.load(&resource).unwrap(),
            Payload::Text("payload".to_string())
        );
    }

    #[test]
    fn test_factory_lookup() {
        let mut factory = HandlerFactory::new();
        assert!(factory.get(LocationKind::Memory).is_none());

        factory.add_handler(LocationKind::Memory, MemoryHandler);
        assert!(factory.supports(LocationKind::Memory));
        assert!(!factory.supports(LocationKind::Url));

        assert!(factory.get(LocationKind::Memory).is_some());
    }

    #[cfg(feature = "async-rt")]
    #[test]
    fn test_blocking_handler_reads_async_source() {
        struct Fixed;

        #[async_trait]
        impl AsyncHandler for Fixed {
            async fn save(&self, _resource: &Resource) -> Result<()> {
                Ok(())
            }

            async fn load(
                &self,
                _resource: &Resource,
            ) -> Result<Box<dyn AsyncRead + Send + Unpin>> {
                Ok(Box::new(futures::io::Cursor::new(b"remote bytes".to_vec())))
            }
        }

        let handler = BlockingHandler::new(Fixed);
        let resource = Resource::new("r", "mem://r", LocationKind::Url);

        assert_eq!(
            handler.load(&resource).unwrap(),
            Payload::Bytes(b"remote bytes".to_vec())
        );
        assert!(handler.save(&resource).is_ok());
    }
}
