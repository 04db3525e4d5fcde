//! Request path translation
//!
//! The filter may be mounted below the root of the host (for example at
//! `/app/*`). Everything downstream of it sees paths as if it were mounted at
//! `/`.

use kiln_core::error::{Error, Result};

/// Compute the path downstream logic should see.
///
/// Returns `full_path` unchanged when `mount_prefix` is empty or does not
/// match it on a segment boundary (`/appendix` is outside `/app`). Otherwise
/// the prefix is stripped and the result always starts with `/`.
pub fn translate(full_path: &str, mount_prefix: &str) -> String {
    let prefix = mount_prefix.trim_end_matches('/');
    if prefix.is_empty() {
        return full_path.to_string();
    }

    match full_path.strip_prefix(prefix) {
        Some("") => "/".to_string(),
        Some(rest) if rest.starts_with('/') => rest.to_string(),
        _ => full_path.to_string(),
    }
}

/// Derive the mount prefix from a filter mapping URL pattern.
///
/// `None` and `/*` mount at the root (empty prefix), `/app/*` mounts at
/// `/app`. Any other shape is rejected.
pub fn mount_prefix_from_pattern(pattern: Option<&str>) -> Result<String> {
    let pattern = match pattern.map(str::trim) {
        None | Some("") | Some("/*") => return Ok(String::new()),
        Some(p) => p,
    };

    if !pattern.starts_with('/') || !pattern.ends_with("/*") {
        return Err(Error::Config(format!(
            "The filter mapping URL pattern must start with \"/\" and end with \"/*\", got {:?}",
            pattern
        )));
    }

    Ok(pattern[..pattern.len() - 2].trim_end_matches('/').to_string())
}

/// A request as presented to everything behind the filter.
///
/// Holds the effective path next to the URI the host received; the inbound
/// request itself is never modified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveRequest {
    original_uri: String,
    path: String,
}

impl EffectiveRequest {
    /// Translate `request_uri` against `mount_prefix`
    pub fn new(request_uri: &str, mount_prefix: &str) -> Self {
        Self {
            original_uri: request_uri.to_string(),
            path: translate(request_uri, mount_prefix),
        }
    }

    /// Path info, relative to the mount point
    pub fn path_info(&self) -> &str {
        &self.path
    }

    /// Request URI, relative to the mount point
    pub fn request_uri(&self) -> &str {
        &self.path
    }

    /// URI as received by the host
    pub fn original_uri(&self) -> &str {
        &self.original_uri
    }
}
