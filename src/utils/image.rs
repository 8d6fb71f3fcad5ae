//! Image payload helpers
//!
//! Clients send photos as JSON strings: either a data URL
//! (`data:image/webp;base64,...`) or bare base64.

use base64::{engine::general_purpose, Engine};
use image::DynamicImage;
use anyhow::Result;

/// Decoded image payload
#[derive(Debug, Clone)]
pub struct ImagePayload {
    pub bytes: Vec<u8>,
    /// MIME type taken from a data URL header, when present
    pub mime_hint: Option<String>,
}

/// Split a data URL into (mime hint, base64 body). Bare base64 passes through.
pub fn split_data_url(payload: &str) -> (Option<String>, &str) {
    if !payload.starts_with("data:image") {
        return (None, payload);
    }

    match payload.split_once(',') {
        Some((header, body)) => {
            let mime = header
                .split_once(':')
                .and_then(|(_, rest)| rest.split(';').next())
                .filter(|m| !m.is_empty())
                .map(str::to_string);
            (mime, body)
        }
        None => (None, payload),
    }
}

/// Decode a data URL or base64 string into raw bytes
pub fn decode_payload(payload: &str) -> Result<ImagePayload> {
    let (mime_hint, body) = split_data_url(payload.trim());

    let cleaned: String = body.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if cleaned.is_empty() {
        anyhow::bail!("empty base64 payload");
    }

    let bytes = general_purpose::STANDARD
        .decode(&cleaned)
        .or_else(|_| general_purpose::STANDARD_NO_PAD.decode(cleaned.trim_end_matches('=')))?;

    Ok(ImagePayload { bytes, mime_hint })
}

/// Encode image to JPEG bytes
pub fn encode_jpeg(image: &DynamicImage) -> Result<Vec<u8>> {
    let mut buffer = std::io::Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image.to_rgb8()).write_to(&mut buffer, image::ImageFormat::Jpeg)?;
    Ok(buffer.into_inner())
}
