//! Demo application
//!
//! Serves the `/public` folder of the embedded bundle and answers `/hello`.

use async_trait::async_trait;
use kiln_core::Result;
use kiln_filter::{Application, ApplicationContext, ApplicationRegistry, DynamicRouter, EffectiveRequest};
use kiln_static::ResponseSink;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;

/// Name the demo application is registered under
pub const WELCOME: &str = "welcome";

/// Demo application
#[derive(Debug, Default)]
pub struct WelcomeApplication;

impl Application for WelcomeApplication {
    fn init(&mut self, ctx: &mut ApplicationContext<'_>) -> Result<()> {
        ctx.static_files().configure_static_resources("/public");
        ctx.set_router(Arc::new(WelcomeRouter));
        Ok(())
    }

    fn destroy(&mut self) {
        tracing::info!("👋 Welcome application stopped");
    }
}

struct WelcomeRouter;

#[async_trait]
impl DynamicRouter for WelcomeRouter {
    async fn handle(&self, request: &EffectiveRequest, response: &mut dyn ResponseSink) -> Result<bool> {
        if request.path_info() != "/hello" {
            return Ok(false);
        }

        response.set_content_type("text/plain; charset=utf-8");
        response.body().write_all(b"Hello from Kiln\n").await?;
        Ok(true)
    }
}

/// Applications shipped with the binary
pub fn applications() -> ApplicationRegistry {
    let mut registry = ApplicationRegistry::new();
    registry.register(WELCOME, || Box::new(WelcomeApplication));
    registry
}
