//! Content-type handling

/// Fallback type for responses that declare none
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Strip parameters from a content type
///
/// `"text/html; charset=utf-8"` becomes `"text/html"`. A blank result falls
/// back to [`OCTET_STREAM`].
pub fn normalize_content_type(content_type: &str) -> &str {
    let essence = content_type
        .split_once(';')
        .map_or(content_type, |(essence, _)| essence)
        .trim();

    if essence.is_empty() {
        OCTET_STREAM
    } else {
        essence
    }
}
