//! MIME type utilities for labelling streams

/// Strip parameters from a MIME type: `video/mp4; codecs="avc1"` -> `video/mp4`
pub fn essence(mime_type: &str) -> &str {
    mime_type.split(';').next().unwrap_or("").trim()
}

/// Upper-cased top-level media kind, e.g. `VIDEO` or `AUDIO`.
///
/// Falls back to `MEDIA` when the MIME type is missing or malformed.
pub fn media_kind(mime_type: &str) -> String {
    let top = essence(mime_type).split('/').next().unwrap_or("").trim();
    if top.is_empty() {
        "MEDIA".to_string()
    } else {
        top.to_uppercase()
    }
}
