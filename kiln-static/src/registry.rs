//! Static resource registry

use crate::resource::{ResourceHandler, SourceKind, DEFAULT_WELCOME_FILE};
use include_dir::Dir;
use parking_lot::RwLock;
use std::sync::Arc;

/// Ordered set of static resource handlers.
///
/// Handlers are tried in the order they were configured. Each source kind can
/// be configured at most once until [`clear`](Self::clear) is called; later
/// attempts are logged and ignored.
pub struct StaticResourceRegistry {
    bundle: Option<&'static Dir<'static>>,
    welcome_file: String,
    state: RwLock<RegistryState>,
}

#[derive(Default)]
struct RegistryState {
    handlers: Vec<Arc<ResourceHandler>>,
    embedded_configured: bool,
    external_configured: bool,
}

impl RegistryState {
    fn configured(&mut self, kind: SourceKind) -> &mut bool {
        match kind {
            SourceKind::Embedded => &mut self.embedded_configured,
            SourceKind::External => &mut self.external_configured,
        }
    }
}

impl StaticResourceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            bundle: None,
            welcome_file: DEFAULT_WELCOME_FILE.to_string(),
            state: RwLock::new(RegistryState::default()),
        }
    }

    /// Attach the embedded bundle that embedded locations resolve against
    pub fn with_bundle(mut self, bundle: &'static Dir<'static>) -> Self {
        self.bundle = Some(bundle);
        self
    }

    /// Set the welcome file used by handlers configured afterwards
    pub fn with_welcome_file(mut self, welcome_file: impl Into<String>) -> Self {
        self.welcome_file = welcome_file.into();
        self
    }

    /// Register a source of the given kind rooted at `base_path`.
    ///
    /// Does nothing (besides logging) when `base_path` is empty, when the kind
    /// is already configured or when `base_path` is not a folder of that source.
    pub fn configure(&self, kind: SourceKind, base_path: &str) {
        if base_path.trim().is_empty() {
            tracing::error!("Static resource location for {} source must not be empty", kind);
            return;
        }

        let mut state = self.state.write();
        if *state.configured(kind) {
            tracing::debug!("Ignoring {} static location {}: already configured", kind, base_path);
            return;
        }

        let handler = match kind {
            SourceKind::Embedded => match self.bundle {
                Some(bundle) => ResourceHandler::embedded(bundle, base_path, self.welcome_file.as_str()),
                None => {
                    tracing::error!("No embedded bundle attached, cannot serve {}", base_path);
                    return;
                }
            },
            SourceKind::External => ResourceHandler::external(base_path, self.welcome_file.as_str()),
        };

        match handler {
            Ok(handler) => {
                state.handlers.push(Arc::new(handler));
                *state.configured(kind) = true;
                tracing::info!("StaticResourceHandler configured with {} folder = {}", kind, base_path);
            }
            Err(e) => {
                tracing::error!("Error when creating {} StaticResourceHandler: {}", kind, e);
            }
        }
    }

    /// Register a folder of the embedded bundle
    pub fn configure_static_resources(&self, folder: &str) {
        self.configure(SourceKind::Embedded, folder);
    }

    /// Register a directory on the local filesystem
    pub fn configure_external_static_resources(&self, folder: &str) {
        self.configure(SourceKind::External, folder);
    }

    /// Remove every handler and reset both configured flags
    pub fn clear(&self) {
        let mut state = self.state.write();
        *state = RegistryState::default();
        tracing::debug!("Static resource configuration cleared");
    }

    /// Snapshot of the handlers in priority order, `None` if nothing is configured
    pub fn handlers(&self) -> Option<Vec<Arc<ResourceHandler>>> {
        let state = self.state.read();
        if state.handlers.is_empty() {
            None
        } else {
            Some(state.handlers.clone())
        }
    }

    /// Whether a source of `kind` has been configured
    pub fn is_configured(&self, kind: SourceKind) -> bool {
        let state = self.state.read();
        match kind {
            SourceKind::Embedded => state.embedded_configured,
            SourceKind::External => state.external_configured,
        }
    }

    /// Number of configured handlers
    pub fn len(&self) -> usize {
        self.state.read().handlers.len()
    }

    /// Whether no handler is configured
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for StaticResourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
