//! `data:<mime>;base64,<payload>` handling for audio uploads.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

use crate::error::VoiceError;

static DATA_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^data:.*?;base64,(.*)").expect("data url pattern is valid"));

/// Return the base64 payload of a data URL without decoding it.
pub fn extract_payload(data_url: &str) -> Result<&str, VoiceError> {
    DATA_URL
        .captures(data_url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .ok_or_else(|| VoiceError::InvalidInput("Invalid data url".to_string()))
}

/// Parse and base64-decode a data URL into raw bytes.
pub fn decode(data_url: &str) -> Result<Vec<u8>, VoiceError> {
    let payload = extract_payload(data_url)?;
    STANDARD
        .decode(payload.trim())
        .map_err(|e| VoiceError::Decode(e.to_string()))
}

pub fn encode(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type, STANDARD.encode(bytes))
}

/// MIME type from a file extension, `audio/wav` when unknown.
pub fn guess_mime(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("mp3") => "audio/mpeg",
        Some("ogg" | "oga" | "opus") => "audio/ogg",
        Some("webm") => "audio/webm",
        Some("flac") => "audio/flac",
        Some("m4a" | "mp4") => "audio/mp4",
        _ => "audio/wav",
    }
}

/// Read a file and wrap it as a data URL.
pub fn file_to_data_url(path: &Path) -> std::io::Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(encode(guess_mime(path), &bytes))
}
