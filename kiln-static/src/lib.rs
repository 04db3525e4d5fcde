//! Kiln Static Resource Module
//!
//! Resolves requests against pre-registered static sources and serves them:
//! - Embedded bundles compiled in with `include_dir`
//! - External directories on the local filesystem
//! - Welcome-file fallback for directories
//! - Content type from a fixed extension table

pub mod content_type;
mod dispatcher;
mod registry;
mod resource;

#[cfg(test)]
mod test_bundle;

pub use dispatcher::{ResponseSink, StaticAssetDispatcher};
pub use registry::StaticResourceRegistry;
pub use resource::{ResolvedResource, ResourceHandler, SourceKind, DEFAULT_WELCOME_FILE};
