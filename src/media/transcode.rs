use image::imageops::FilterType;
use image::GenericImageView;

use crate::error::AppError;

/// Bounding box that transcoded images are fitted into.
pub const MAX_WIDTH: u32 = 1920;
pub const MAX_HEIGHT: u32 = 1080;
/// Fixed WebP encoding quality.
pub const WEBP_QUALITY: f32 = 80.0;

pub const WEBP_MIME: &str = "image/webp";

/// Output of a successful transcode.
#[derive(Debug, Clone)]
pub struct Transcoded {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Raster images are transcoded; SVG and non-images pass through untouched.
pub fn is_transcodable(mimetype: &str) -> bool {
    let mimetype = mimetype.to_ascii_lowercase();
    mimetype.starts_with("image/") && mimetype != "image/svg+xml"
}

/// Decode, fit within the bounding box without upscaling, and encode as WebP.
///
/// CPU bound; call through [`transcode_blocking`] from async code.
pub fn transcode_to_webp(data: &[u8]) -> Result<Transcoded, AppError> {
    let img = image::load_from_memory(data)
        .map_err(|e| AppError::Transcode(format!("decode failed: {}", e)))?;

    let (width, height) = img.dimensions();
    let img = if width > MAX_WIDTH || height > MAX_HEIGHT {
        img.resize(MAX_WIDTH, MAX_HEIGHT, FilterType::Lanczos3)
    } else {
        img
    };

    let (width, height) = img.dimensions();
    let rgba = img.to_rgba8();
    let encoded = webp::Encoder::from_rgba(&rgba, width, height).encode(WEBP_QUALITY);

    Ok(Transcoded {
        bytes: encoded.to_vec(),
        width,
        height,
    })
}

/// Run [`transcode_to_webp`] on the blocking pool.
pub async fn transcode_blocking(data: Vec<u8>) -> Result<Transcoded, AppError> {
    tokio::task::spawn_blocking(move || transcode_to_webp(&data))
        .await
        .map_err(|e| AppError::Internal(format!("Failed to process image: {}", e)))?
}
