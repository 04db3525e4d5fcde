//! Application traits

use crate::path::EffectiveRequest;
use async_trait::async_trait;
use kiln_core::Result;
use kiln_static::{ResponseSink, StaticResourceRegistry};
use std::sync::Arc;

/// Dynamic request handling supplied by the application
#[async_trait]
pub trait DynamicRouter: Send + Sync {
    /// Handle a request the static layer did not consume.
    ///
    /// Returns `Ok(false)` when no route matches.
    async fn handle(&self, request: &EffectiveRequest, response: &mut dyn ResponseSink) -> Result<bool>;
}

/// What an application can reach while it initializes
pub struct ApplicationContext<'a> {
    static_files: &'a StaticResourceRegistry,
    router: Option<Arc<dyn DynamicRouter>>,
}

impl<'a> ApplicationContext<'a> {
    pub(crate) fn new(static_files: &'a StaticResourceRegistry) -> Self {
        Self {
            static_files,
            router: None,
        }
    }

    /// Static resource registry of the filter
    pub fn static_files(&self) -> &StaticResourceRegistry {
        self.static_files
    }

    /// Install the router used for requests that are not static resources
    pub fn set_router(&mut self, router: Arc<dyn DynamicRouter>) {
        self.router = Some(router);
    }

    pub(crate) fn into_router(self) -> Option<Arc<dyn DynamicRouter>> {
        self.router
    }
}

/// An application hosted behind the filter
pub trait Application: Send + Sync {
    /// Called once when the filter starts
    fn init(&mut self, ctx: &mut ApplicationContext<'_>) -> Result<()>;

    /// Called once when the filter is taken down
    fn destroy(&mut self) {}
}
