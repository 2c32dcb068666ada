//! Client image decoding: base64 payload to RGB raster.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::RgbImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("unsupported or corrupt image data: {0}")]
    Image(#[from] image::ImageError),
}

/// Decode a client-submitted image into an RGB raster.
///
/// Browsers send data URLs (`data:image/png;base64,...`); everything after
/// the first comma is the payload. Bare base64 is accepted as-is.
pub fn decode_base64_image(payload: &str) -> Result<RgbImage, DecodeError> {
    let body = match payload.split_once(',') {
        Some((_, rest)) => rest,
        None => payload,
    };
    let bytes = STANDARD.decode(body.trim())?;
    let img = image::load_from_memory(&bytes)?;
    Ok(img.to_rgb8())
}
