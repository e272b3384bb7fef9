/*!
HTTP handler for URL locations.
*/

use std::time::Duration;

use async_trait::async_trait;
use futures::io::AsyncRead;
use reqwest::Client;
use tracing::{error, info};

use super::{AsyncHandler, BlockingHandler};
use crate::resource::{LocationKind, Resource};
use crate::{Result, UssrError};

/// Fetches resources with an HTTP GET of their location
///
/// URL locations are read-only; saving fails with
/// [`UssrError::UnsupportedLocation`].
#[derive(Debug, Clone)]
pub struct UrlHandler {
    client: Client,
}

impl UrlHandler {
    /// Create a handler whose requests time out after `timeout`
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// Wrap the handler for use from synchronous code
    pub fn blocking(timeout: Duration) -> Result<BlockingHandler<Self>> {
        Ok(BlockingHandler::new(Self::new(timeout)?))
    }
}

#[async_trait]
impl AsyncHandler for UrlHandler {
    async fn save(&self, _resource: &Resource) -> Result<()> {
        Err(UssrError::unsupported_location(LocationKind::Url, "save"))
    }

    async fn load(&self, resource: &Resource) -> Result<Box<dyn AsyncRead + Send + Unpin>> {
        let response = self
            .client
            .get(&resource.location)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| {
                error!(url = %resource.location, error = %e, "Failed to fetch resource");
                UssrError::Http(e)
            })?;

        let body = response.bytes().await?;
        info!(url = %resource.location, bytes = body.len(), "Fetched resource");

        Ok(Box::new(futures::io::Cursor::new(body.to_vec())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::Handler;

    #[test]
    fn test_save_is_unsupported() {
        let handler = UrlHandler::blocking(Duration::from_secs(1)).unwrap();
        let resource = Resource::new("page", "http://127.0.0.1:9/page", LocationKind::Url)
            .with_payload("body");

        match handler.save(&resource).unwrap_err() {
            UssrError::UnsupportedLocation { kind, operation } => {
                assert_eq!(kind, LocationKind::Url);
                assert_eq!(operation, "save");
            }
            other => panic!("Expected unsupported location, got {other:?}"),
        }
    }

    #[test]
    fn test_unreachable_host_is_http_error() {
        let handler = UrlHandler::blocking(Duration::from_secs(2)).unwrap();
        // Port 9 (discard) is not served on loopback in test environments
        let resource = Resource::new("page", "http://127.0.0.1:9/page", LocationKind::Url);

        assert!(matches!(
            handler.load(&resource).unwrap_err(),
            UssrError::Http(_)
        ));
    }
}
