//! Static asset dispatch

use crate::content_type;
use crate::registry::StaticResourceRegistry;
use crate::resource::ResolvedResource;
use kiln_core::error::Result;
use std::sync::Arc;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Response side of a request as seen by the static layer
pub trait ResponseSink: Send {
    /// Set the `Content-Type` of the response
    fn set_content_type(&mut self, content_type: &str);

    /// Response body stream
    fn body(&mut self) -> &mut (dyn AsyncWrite + Unpin + Send);
}

/// Serves requests that target a registered static resource
#[derive(Clone)]
pub struct StaticAssetDispatcher {
    registry: Arc<StaticResourceRegistry>,
}

impl StaticAssetDispatcher {
    /// Create a dispatcher over a shared registry
    pub fn new(registry: Arc<StaticResourceRegistry>) -> Self {
        Self { registry }
    }

    /// The registry this dispatcher reads from
    pub fn registry(&self) -> &Arc<StaticResourceRegistry> {
        &self.registry
    }

    /// Try to serve `request_path` from the registered handlers.
    ///
    /// Returns `Ok(true)` when the first matching handler's resource was
    /// written to `response`, `Ok(false)` when nothing matched. Errors while
    /// streaming are returned as-is and leave a truncated body behind.
    pub async fn dispatch(&self, request_path: &str, response: &mut dyn ResponseSink) -> Result<bool> {
        let Some(handlers) = self.registry.handlers() else {
            return Ok(false);
        };

        for handler in &handlers {
            let Some(resource) = handler.resolve(request_path).await else {
                continue;
            };
            if write_resource(request_path, resource, response).await? {
                tracing::debug!("📁 Served {} from {} source", request_path, handler.kind());
                return Ok(true);
            }
        }

        tracing::trace!("No static resource for {}", request_path);
        Ok(false)
    }
}

/// Stream a resolved resource into `response`.
///
/// Returns `Ok(false)` without touching the response when the resource is
/// not readable.
async fn write_resource(
    request_path: &str,
    resource: ResolvedResource,
    response: &mut dyn ResponseSink,
) -> Result<bool> {
    let path = resource.path().to_string();
    let Some(mut reader) = resource.into_reader() else {
        tracing::debug!("Skipping unreadable resource {}", path);
        return Ok(false);
    };

    if let Some(content_type) = content_type::resolve(request_path) {
        response.set_content_type(content_type);
    }

    let body = response.body();
    let copied = tokio::io::copy(&mut reader, &mut *body).await?;
    body.flush().await?;

    tracing::trace!("Wrote {} bytes from {}", copied, path);
    Ok(true)
}
