//! Request path resolution and content-type mapping for the content server

use std::path::{Path, PathBuf};

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Map a file's extension to the content type sent with it
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path.extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("html") | Some("htm") => "text/html",
        Some("js") | Some("mjs") => "text/javascript",
        Some("css") => "text/css",
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        _ => FALLBACK_CONTENT_TYPE,
    }
}

/// Resolve a request path against the server root
///
/// `/` maps to `index_page`. Returns `None` for anything that could escape the root.
pub fn resolve_request_path(root: &Path, index_page: &str, request_path: &str) -> Option<PathBuf> {
    // Query strings never reach the filesystem
    let request_path = request_path.split(['?', '#']).next().unwrap_or_default();
    let relative = request_path.trim_start_matches('/');

    let relative = if relative.is_empty() { index_page } else { relative };

    if relative.contains('\\') || relative.contains('\0') {
        return None;
    }

    let mut resolved = root.to_path_buf();
    for segment in relative.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return None,
            s => resolved.push(s),
        }
    }

    Some(resolved)
}
