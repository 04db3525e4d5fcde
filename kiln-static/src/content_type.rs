//! Content type handling

/// Extension to MIME type table. Lookups are done on the lowercased extension.
const CONTENT_TYPES: &[(&str, &str)] = &[
    ("svg", "image/svg+xml"),
    ("css", "text/css"),
    ("js", "application/x-javascript"),
    ("png", "image/png"),
    ("gif", "image/gif"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
];

/// Get the content type for a request path from its extension.
///
/// Returns `None` when the path has no extension, ends with a dot, or the
/// extension is not in the table.
pub fn resolve(path: &str) -> Option<&'static str> {
    let dot = path.rfind('.')?;
    let extension = &path[dot + 1..];
    if extension.is_empty() {
        return None;
    }

    let extension = extension.to_ascii_lowercase();
    CONTENT_TYPES
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|(_, content_type)| *content_type)
}
