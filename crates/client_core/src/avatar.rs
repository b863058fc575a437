//! Avatar ingestion: raw upload bytes to a displayable `data:` URL.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::ImageFormat;
use shared::domain::{AvatarFormat, AvatarImage};

use crate::error::ClientError;

fn allowed_format(format: ImageFormat) -> Option<AvatarFormat> {
    match format {
        ImageFormat::Png => Some(AvatarFormat::Png),
        ImageFormat::Jpeg => Some(AvatarFormat::Jpeg),
        ImageFormat::Gif => Some(AvatarFormat::Gif),
        ImageFormat::WebP => Some(AvatarFormat::WebP),
        _ => None,
    }
}

fn image_format(format: AvatarFormat) -> ImageFormat {
    match format {
        AvatarFormat::Png => ImageFormat::Png,
        AvatarFormat::Jpeg => ImageFormat::Jpeg,
        AvatarFormat::Gif => ImageFormat::Gif,
        AvatarFormat::WebP => ImageFormat::WebP,
    }
}

/// Decodes `bytes` and returns an avatar reference. Only PNG, JPEG, GIF and
/// WebP payloads up to `max_bytes` are accepted.
pub fn ingest(bytes: &[u8], max_bytes: usize) -> Result<AvatarImage, ClientError> {
    if bytes.is_empty() {
        return Err(ClientError::validation("avatar upload is empty"));
    }
    if bytes.len() > max_bytes {
        return Err(ClientError::validation(format!(
            "avatar is {} bytes; the limit is {max_bytes} bytes",
            bytes.len()
        )));
    }

    let detected = image::guess_format(bytes)
        .map_err(|_| ClientError::validation("avatar is not a recognized image"))?;
    let format = allowed_format(detected).ok_or_else(|| {
        ClientError::validation(format!(
            "avatar format {detected:?} is not allowed; use PNG, JPEG, GIF or WebP"
        ))
    })?;

    let decoded = image::load_from_memory_with_format(bytes, image_format(format))
        .map_err(|err| ClientError::validation(format!("avatar could not be decoded: {err}")))?;

    Ok(AvatarImage {
        format,
        width: decoded.width(),
        height: decoded.height(),
        byte_len: bytes.len(),
        data_url: format!("data:{};base64,{}", format.mime_type(), STANDARD.encode(bytes)),
    })
}
