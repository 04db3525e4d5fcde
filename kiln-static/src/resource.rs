//! Resource handlers
//!
//! A [`ResourceHandler`] resolves a request path against a single source,
//! either a folder inside an embedded bundle or a directory on disk.

use include_dir::Dir;
use kiln_core::error::{Error, Result};
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncRead;

/// File served when a request resolves to a directory
pub const DEFAULT_WELCOME_FILE: &str = "index.html";

/// Kind of source a handler serves from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// Folder inside the bundle compiled into the binary
    Embedded,
    /// Directory on the local filesystem
    External,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Embedded => f.write_str("embedded"),
            SourceKind::External => f.write_str("external"),
        }
    }
}

enum Source {
    Embedded {
        bundle: &'static Dir<'static>,
        /// Folder inside the bundle, without leading or trailing slash
        base: String,
    },
    External {
        /// Canonicalized root directory
        root: PathBuf,
    },
}

/// Resolves request paths against one static source
pub struct ResourceHandler {
    source: Source,
    welcome_file: String,
}

impl fmt::Debug for ResourceHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let base = match &self.source {
            Source::Embedded { base, .. } => format!("/{}", base),
            Source::External { root } => root.display().to_string(),
        };
        f.debug_struct("ResourceHandler")
            .field("kind", &self.kind())
            .field("base", &base)
            .field("welcome_file", &self.welcome_file)
            .finish()
    }
}

impl ResourceHandler {
    /// Create a handler serving `folder` from an embedded bundle.
    ///
    /// Fails with [`Error::Config`] when `folder` is not a directory of the bundle.
    pub fn embedded(
        bundle: &'static Dir<'static>,
        folder: &str,
        welcome_file: impl Into<String>,
    ) -> Result<Self> {
        let absolute = format!("/{}", folder.trim_start_matches('/'));
        let segments = canonical_segments(&absolute)
            .ok_or_else(|| Error::Config(format!("Invalid static resource location: {}", folder)))?;
        let base = segments.join("/");

        if bundle_dir(bundle, &base).is_none() {
            return Err(Error::Config(format!(
                "Static resource location must be a folder: {}",
                folder
            )));
        }

        Ok(Self {
            source: Source::Embedded { bundle, base },
            welcome_file: welcome_file.into(),
        })
    }

    /// Create a handler serving a directory on the local filesystem.
    ///
    /// Fails with [`Error::Config`] when `folder` does not exist or is not a directory.
    pub fn external(folder: impl AsRef<Path>, welcome_file: impl Into<String>) -> Result<Self> {
        let folder = folder.as_ref();
        let root = std::fs::canonicalize(folder).map_err(|e| {
            Error::Config(format!(
                "External static resource location {} is not accessible: {}",
                folder.display(),
                e
            ))
        })?;

        if !root.is_dir() {
            return Err(Error::Config(format!(
                "External static resource location must be a folder: {}",
                folder.display()
            )));
        }

        Ok(Self {
            source: Source::External { root },
            welcome_file: welcome_file.into(),
        })
    }

    /// Source kind of this handler
    pub fn kind(&self) -> SourceKind {
        match self.source {
            Source::Embedded { .. } => SourceKind::Embedded,
            Source::External { .. } => SourceKind::External,
        }
    }

    /// Welcome file name
    pub fn welcome_file(&self) -> &str {
        &self.welcome_file
    }

    /// Resolve a request path to a resource.
    ///
    /// Returns `None` when nothing matches, including paths that would leave
    /// the handler's base.
    pub async fn resolve(&self, request_path: &str) -> Option<ResolvedResource> {
        let Some(segments) = canonical_segments(request_path) else {
            tracing::debug!("Rejected request path {:?}", request_path);
            return None;
        };

        match &self.source {
            Source::Embedded { bundle, base } => self.resolve_embedded(*bundle, base, &segments),
            Source::External { root } => self.resolve_external(root, &segments).await,
        }
    }

    fn resolve_embedded(
        &self,
        bundle: &'static Dir<'static>,
        base: &str,
        segments: &[&str],
    ) -> Option<ResolvedResource> {
        let mut target = join_bundle_path(base, segments);
        if bundle_dir(bundle, &target).is_some() {
            target = join_bundle_path(&target, &[self.welcome_file.as_str()]);
        }

        let file = bundle.get_file(&target)?;
        tracing::trace!("Resolved embedded resource {}", target);
        Some(ResolvedResource {
            path: target,
            body: Some(ResourceBody::Embedded(file.contents())),
        })
    }

    async fn resolve_external(&self, root: &Path, segments: &[&str]) -> Option<ResolvedResource> {
        let mut target = root.to_path_buf();
        target.extend(segments);

        let mut metadata = tokio::fs::metadata(&target).await.ok()?;
        if metadata.is_dir() {
            target.push(&self.welcome_file);
            metadata = tokio::fs::metadata(&target).await.ok()?;
        }
        if !metadata.is_file() {
            return None;
        }

        // Symlinks may still point outside the root
        let canonical = tokio::fs::canonicalize(&target).await.ok()?;
        if !canonical.starts_with(root) {
            tracing::warn!(
                "Refusing {}: resolves outside of {}",
                target.display(),
                root.display()
            );
            return None;
        }

        let path = canonical.display().to_string();
        match tokio::fs::File::open(&canonical).await {
            Ok(file) => {
                tracing::trace!("Resolved external resource {}", path);
                Some(ResolvedResource {
                    path,
                    body: Some(ResourceBody::File(file)),
                })
            }
            Err(e) if e.kind() == ErrorKind::PermissionDenied => {
                tracing::debug!("Resource {} is not readable", path);
                Some(ResolvedResource::unreadable(path))
            }
            Err(e) => {
                tracing::debug!("Failed to open {}: {}", path, e);
                None
            }
        }
    }
}

enum ResourceBody {
    Embedded(&'static [u8]),
    File(tokio::fs::File),
}

/// A resource found by a [`ResourceHandler`], valid for a single request
pub struct ResolvedResource {
    path: String,
    body: Option<ResourceBody>,
}

impl fmt::Debug for ResolvedResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedResource")
            .field("path", &self.path)
            .field("readable", &self.is_readable())
            .finish()
    }
}

impl ResolvedResource {
    /// A resource that exists but whose bytes cannot be read
    pub(crate) fn unreadable(path: String) -> Self {
        Self { path, body: None }
    }

    /// Path of the resource inside its source
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Whether the resource can be streamed
    pub fn is_readable(&self) -> bool {
        self.body.is_some()
    }

    /// Take the byte stream of a readable resource
    pub fn into_reader(self) -> Option<Box<dyn AsyncRead + Send + Unpin>> {
        match self.body? {
            ResourceBody::Embedded(bytes) => Some(Box::new(bytes)),
            ResourceBody::File(file) => Some(Box::new(file)),
        }
    }
}

/// Split an absolute request path into normalized segments.
///
/// `.` and empty segments are dropped and `..` removes the previous segment.
/// Returns `None` for relative paths, for paths climbing above the root and
/// for segments containing a backslash or NUL.
pub(crate) fn canonical_segments(path: &str) -> Option<Vec<&str>> {
    if !path.starts_with('/') {
        return None;
    }

    let mut segments = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            s if s.contains(['\\', '\0']) => return None,
            s => segments.push(s),
        }
    }
    Some(segments)
}

fn join_bundle_path(base: &str, segments: &[&str]) -> String {
    let mut path = base.to_string();
    for segment in segments {
        if !path.is_empty() {
            path.push('/');
        }
        path.push_str(segment);
    }
    path
}

fn bundle_dir(bundle: &'static Dir<'static>, path: &str) -> Option<&'static Dir<'static>> {
    if path.is_empty() {
        Some(bundle)
    } else {
        bundle.get_dir(path)
    }
}
