//! The front-controller filter

use crate::path::{mount_prefix_from_pattern, EffectiveRequest};
use crate::registry::ApplicationRegistry;
use crate::traits::{Application, ApplicationContext, DynamicRouter};
use kiln_core::config::FilterConfig;
use kiln_core::error::{Error, Result};
use kiln_static::{ResponseSink, StaticAssetDispatcher, StaticResourceRegistry};
use parking_lot::Mutex;
use std::sync::Arc;

/// How a request left the filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOutcome {
    /// Served from a static resource
    Static,
    /// Handled by the application's router
    Routed,
    /// Neither matched; the host decides what to answer
    Unhandled,
}

/// Front controller: path translation, static resources, then the
/// application's router
pub struct AppFilter {
    mount_prefix: String,
    dispatcher: StaticAssetDispatcher,
    router: Option<Arc<dyn DynamicRouter>>,
    application: Mutex<Option<Box<dyn Application>>>,
}

impl AppFilter {
    /// Start the filter.
    ///
    /// Resolves the mount prefix, registers the configured static locations
    /// (embedded first, then external) and initializes the application named
    /// by `application_class`. Any failure here is fatal for the deployment;
    /// when the application's `init` fails it is destroyed and the static
    /// registry is cleared again.
    pub fn init(
        config: &FilterConfig,
        applications: &ApplicationRegistry,
        registry: Arc<StaticResourceRegistry>,
    ) -> Result<Self> {
        let mount_prefix = mount_prefix_from_pattern(config.filter_mapping_url_pattern.as_deref())?;

        let name = config
            .application_class
            .as_deref()
            .ok_or_else(|| Error::Application("No application_class configured".to_string()))?;
        let mut application = applications.create(name)?;

        if let Some(location) = &config.static_files.location {
            registry.configure_static_resources(location);
        }
        if let Some(location) = &config.static_files.external_location {
            registry.configure_external_static_resources(location);
        }

        let mut ctx = ApplicationContext::new(&registry);
        if let Err(e) = application.init(&mut ctx) {
            tracing::error!("❌ Application {} failed to initialize: {}", name, e);
            application.destroy();
            registry.clear();
            return Err(e);
        }
        let router = ctx.into_router();

        tracing::info!(
            "🚀 Application {} initialized (mount prefix {:?}, {} static source(s), router: {})",
            name,
            mount_prefix,
            registry.len(),
            router.is_some()
        );

        Ok(Self {
            mount_prefix,
            dispatcher: StaticAssetDispatcher::new(registry),
            router,
            application: Mutex::new(Some(application)),
        })
    }

    /// Mount prefix stripped from incoming paths
    pub fn mount_prefix(&self) -> &str {
        &self.mount_prefix
    }

    /// Static resource registry used by this filter
    pub fn static_files(&self) -> &Arc<StaticResourceRegistry> {
        self.dispatcher.registry()
    }

    /// Run one request through the filter.
    ///
    /// I/O errors while streaming a static resource are returned to the host,
    /// which owns the error response.
    pub async fn do_filter(&self, request_uri: &str, response: &mut dyn ResponseSink) -> Result<FilterOutcome> {
        let request = EffectiveRequest::new(request_uri, &self.mount_prefix);
        tracing::debug!("{} -> {}", request.original_uri(), request.path_info());

        if self.dispatcher.dispatch(request.path_info(), response).await? {
            return Ok(FilterOutcome::Static);
        }

        if let Some(router) = &self.router {
            if router.handle(&request, response).await? {
                return Ok(FilterOutcome::Routed);
            }
        }

        Ok(FilterOutcome::Unhandled)
    }

    /// Take the application down. Only the first call has an effect.
    pub fn destroy(&self) {
        if let Some(mut application) = self.application.lock().take() {
            application.destroy();
            tracing::info!("Application destroyed");
        }
    }
}

impl Drop for AppFilter {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use kiln_core::config::StaticFilesConfig;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::{AsyncWrite, AsyncWriteExt};

    #[derive(Default)]
    struct RecordingResponse {
        content_type: Option<String>,
        body: Vec<u8>,
    }

    impl ResponseSink for RecordingResponse {
        fn set_content_type(&mut self, content_type: &str) {
            self.content_type = Some(content_type.to_string());
        }

        fn body(&mut self) -> &mut (dyn AsyncWrite + Unpin + Send) {
            &mut self.body
        }
    }

    /// Answers `/hello` and echoes the path it saw
    struct HelloRouter;

    #[async_trait]
    impl DynamicRouter for HelloRouter {
        async fn handle(&self, request: &EffectiveRequest, response: &mut dyn ResponseSink) -> Result<bool> {
            if request.path_info() != "/hello" {
                return Ok(false);
            }
            response.set_content_type("text/plain");
            response.body().write_all(b"hello from ").await?;
            response.body().write_all(request.request_uri().as_bytes()).await?;
            Ok(true)
        }
    }

    #[derive(Default)]
    struct Counters {
        init: AtomicUsize,
        destroy: AtomicUsize,
    }

    struct TestApp {
        counters: Arc<Counters>,
        external: Option<String>,
        fail: bool,
    }

    impl Application for TestApp {
        fn init(&mut self, ctx: &mut ApplicationContext<'_>) -> Result<()> {
            self.counters.init.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(Error::Application("boom".to_string()));
            }
            if let Some(external) = &self.external {
                ctx.static_files().configure_external_static_resources(external);
            }
            ctx.set_router(Arc::new(HelloRouter));
            Ok(())
        }

        fn destroy(&mut self) {
            self.counters.destroy.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn applications(counters: Arc<Counters>, external: Option<String>, fail: bool) -> ApplicationRegistry {
        let mut registry = ApplicationRegistry::new();
        registry.register("test", move || {
            Box::new(TestApp {
                counters: counters.clone(),
                external: external.clone(),
                fail,
            })
        });
        registry
    }

    fn config(pattern: Option<&str>) -> FilterConfig {
        FilterConfig {
            application_class: Some("test".to_string()),
            filter_mapping_url_pattern: pattern.map(str::to_string),
            static_files: StaticFilesConfig::default(),
        }
    }

    fn site() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<h1>site</h1>").unwrap();
        std::fs::write(dir.path().join("style.css"), "h1 {}").unwrap();
        dir
    }

    #[tokio::test]
    async fn test_static_dynamic_and_unhandled() {
        let dir = site();
        let counters = Arc::new(Counters::default());
        let apps = applications(counters.clone(), Some(dir.path().to_str().unwrap().to_string()), false);
        let filter = AppFilter::init(&config(Some("/app/*")), &apps, Arc::new(StaticResourceRegistry::new())).unwrap();
        assert_eq!(filter.mount_prefix(), "/app");

        let mut response = RecordingResponse::default();
        assert_eq!(filter.do_filter("/app/style.css", &mut response).await.unwrap(), FilterOutcome::Static);
        assert_eq!(response.content_type.as_deref(), Some("text/css"));
        assert_eq!(response.body, b"h1 {}");

        let mut response = RecordingResponse::default();
        assert_eq!(filter.do_filter("/app", &mut response).await.unwrap(), FilterOutcome::Static);
        assert_eq!(response.body, b"<h1>site</h1>");

        let mut response = RecordingResponse::default();
        assert_eq!(filter.do_filter("/app/hello", &mut response).await.unwrap(), FilterOutcome::Routed);
        assert_eq!(response.body, b"hello from /hello");

        let mut response = RecordingResponse::default();
        assert_eq!(filter.do_filter("/app/missing", &mut response).await.unwrap(), FilterOutcome::Unhandled);
        assert!(response.body.is_empty());

        assert_eq!(counters.init.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_paths_outside_mount_are_untouched() {
        let dir = site();
        let apps = applications(Arc::default(), Some(dir.path().to_str().unwrap().to_string()), false);
        let filter = AppFilter::init(&config(Some("/app/*")), &apps, Arc::new(StaticResourceRegistry::new())).unwrap();

        let mut response = RecordingResponse::default();
        // seen as /hello/style.css, which exists nowhere
        assert_eq!(
            filter.do_filter("/hello/style.css", &mut response).await.unwrap(),
            FilterOutcome::Unhandled
        );
    }

    #[tokio::test]
    async fn test_sibling_of_mount_is_not_translated() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("le.css"), "inside the mount").unwrap();
        let apps = applications(Arc::default(), Some(dir.path().to_str().unwrap().to_string()), false);
        let filter = AppFilter::init(&config(Some("/app/*")), &apps, Arc::new(StaticResourceRegistry::new())).unwrap();

        let mut response = RecordingResponse::default();
        assert_eq!(filter.do_filter("/apple.css", &mut response).await.unwrap(), FilterOutcome::Unhandled);
        assert!(response.body.is_empty());

        let mut response = RecordingResponse::default();
        assert_eq!(filter.do_filter("/app/le.css", &mut response).await.unwrap(), FilterOutcome::Static);
        assert_eq!(response.body, b"inside the mount");
    }

    #[tokio::test]
    async fn test_configured_locations_come_first() {
        let configured = site();
        let from_app = tempfile::tempdir().unwrap();
        std::fs::write(from_app.path().join("style.css"), "from app").unwrap();

        let apps = applications(Arc::default(), Some(from_app.path().to_str().unwrap().to_string()), false);
        let mut config = config(None);
        config.static_files.external_location = Some(configured.path().to_str().unwrap().to_string());
        let filter = AppFilter::init(&config, &apps, Arc::new(StaticResourceRegistry::new())).unwrap();

        // the application's own external location was ignored as a duplicate
        assert_eq!(filter.static_files().len(), 1);
        let mut response = RecordingResponse::default();
        assert_eq!(filter.do_filter("/style.css", &mut response).await.unwrap(), FilterOutcome::Static);
        assert_eq!(response.body, b"h1 {}");
    }

    #[test]
    fn test_destroy_runs_once() {
        let counters = Arc::new(Counters::default());
        let apps = applications(counters.clone(), None, false);
        let filter = AppFilter::init(&config(None), &apps, Arc::new(StaticResourceRegistry::new())).unwrap();

        filter.destroy();
        filter.destroy();
        drop(filter);
        assert_eq!(counters.destroy.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_destroys_application() {
        let counters = Arc::new(Counters::default());
        let apps = applications(counters.clone(), None, false);
        let filter = AppFilter::init(&config(None), &apps, Arc::new(StaticResourceRegistry::new())).unwrap();

        drop(filter);
        assert_eq!(counters.destroy.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_init_failures() {
        let apps = applications(Arc::default(), None, false);
        let registry = Arc::new(StaticResourceRegistry::new());

        let mut missing = config(None);
        missing.application_class = None;
        assert!(matches!(AppFilter::init(&missing, &apps, registry.clone()), Err(Error::Application(_))));

        let mut unknown = config(None);
        unknown.application_class = Some("nope".to_string());
        assert!(matches!(AppFilter::init(&unknown, &apps, registry.clone()), Err(Error::Application(_))));

        assert!(matches!(
            AppFilter::init(&config(Some("app")), &apps, registry.clone()),
            Err(Error::Config(_))
        ));

        let failing = applications(Arc::default(), None, true);
        assert!(matches!(AppFilter::init(&config(None), &failing, registry), Err(Error::Application(_))));
    }

    #[test]
    fn test_failed_init_rolls_back() {
        let dir = site();
        let counters = Arc::new(Counters::default());
        let apps = applications(counters.clone(), None, true);
        let registry = Arc::new(StaticResourceRegistry::new());

        let mut config = config(None);
        config.static_files.external_location = Some(dir.path().to_str().unwrap().to_string());
        assert!(AppFilter::init(&config, &apps, registry.clone()).is_err());

        assert_eq!(counters.init.load(Ordering::SeqCst), 1);
        assert_eq!(counters.destroy.load(Ordering::SeqCst), 1);
        assert!(registry.is_empty());
        assert!(!registry.is_configured(kiln_static::SourceKind::External));
    }
}
