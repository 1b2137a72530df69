//! Utility functions and helpers.

pub mod date;
pub mod http;
pub mod progress;

use url::Url;

/// Document extensions accepted as exhibit targets.
const DOCUMENT_EXTENSIONS: [&str; 4] = ["htm", "html", "pdf", "txt"];

/// Resolve a potentially relative URL against a base URL.
pub fn resolve_url(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }
    let lower = href.to_ascii_lowercase();
    if lower.starts_with("javascript:") || lower.starts_with("mailto:") {
        return None;
    }
    let mut url = base.join(href).ok()?;
    url.set_fragment(None);
    Some(url)
}

/// Resolve an href and keep it only if it points at an exhibit document.
///
/// Accepted targets are http(s) URLs whose file name ends in one of
/// [`DOCUMENT_EXTENSIONS`] and is not an index artifact. Links back to the
/// page itself are rejected.
pub fn normalize_document_url(base: &Url, href: &str) -> Option<Url> {
    let url = resolve_url(base, href)?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }

    let file_name = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or("")
        .to_ascii_lowercase();
    let (stem, extension) = file_name.rsplit_once('.')?;
    if stem.is_empty() || !DOCUMENT_EXTENSIONS.contains(&extension) {
        return None;
    }
    if stem.contains("index") {
        return None;
    }

    let mut page = base.clone();
    page.set_fragment(None);
    if url == page {
        return None;
    }
    Some(url)
}
