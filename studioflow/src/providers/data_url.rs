//! `data:` URL encoding for assets that never had a remote URL.
//!
//! Speech synthesis returns raw bytes; they are kept inline in the
//! narration artifact as a base64 `data:` URL.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// A decoded `data:` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl {
    /// The declared MIME type (`text/plain` if absent).
    pub mime_type: String,
    /// The payload bytes.
    pub bytes: Vec<u8>,
}

/// Encodes bytes as a base64 `data:` URL.
#[must_use]
pub fn encode_data_url(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{mime_type};base64,{}", STANDARD.encode(bytes))
}

/// Decodes a `data:` URL. Returns `None` if `url` is not one.
///
/// Both base64 and percent-free plain payloads are accepted.
pub fn decode_data_url(url: &str) -> Option<Result<DataUrl, String>> {
    let rest = url.strip_prefix("data:")?;
    let Some((header, payload)) = rest.split_once(',') else {
        return Some(Err("data URL has no ',' separator".to_string()));
    };

    let (mime, is_base64) = match header.strip_suffix(";base64") {
        Some(mime) => (mime, true),
        None => (header, false),
    };
    let mime_type = if mime.is_empty() {
        "text/plain".to_string()
    } else {
        mime.to_string()
    };

    let bytes = if is_base64 {
        match STANDARD.decode(payload.trim()) {
            Ok(bytes) => bytes,
            Err(e) => return Some(Err(format!("invalid base64 payload: {e}"))),
        }
    } else {
        payload.as_bytes().to_vec()
    };

    Some(Ok(DataUrl { mime_type, bytes }))
}

/// File extension for common MIME types used in bundles.
#[must_use]
pub fn extension_for_mime(mime_type: &str) -> &'static str {
    match mime_type {
        "audio/mpeg" | "audio/mp3" => "mp3",
        "audio/wav" | "audio/x-wav" => "wav",
        "audio/ogg" => "ogg",
        "image/png" => "png",
        "image/jpeg" => "jpg",
        "image/webp" => "webp",
        "video/mp4" => "mp4",
        "video/webm" => "webm",
        _ => "bin",
    }
}
