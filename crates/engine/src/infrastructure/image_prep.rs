//! Shrinks scanned images before they are uploaded to the vision model.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};

use crate::infrastructure::ports::ExtractionError;

pub const DEFAULT_MAX_DIMENSION: u32 = 2000;
pub const DEFAULT_MAX_BYTES: usize = 5 * 1024 * 1024;
pub const DEFAULT_JPEG_QUALITY: u8 = 85;

#[derive(Debug, Clone)]
pub struct ImagePrepConfig {
    /// Longest side allowed before down-sampling.
    pub max_dimension: u32,
    /// Upload budget per image.
    pub max_bytes: usize,
    pub jpeg_quality: u8,
}

impl Default for ImagePrepConfig {
    fn default() -> Self {
        Self {
            max_dimension: DEFAULT_MAX_DIMENSION,
            max_bytes: DEFAULT_MAX_BYTES,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PreparedImage {
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
    pub downsampled: bool,
}

impl PreparedImage {
    pub fn data_url(&self) -> String {
        use base64::Engine;
        format!(
            "data:{};base64,{}",
            self.mime_type,
            base64::engine::general_purpose::STANDARD.encode(&self.bytes)
        )
    }
}

pub fn needs_downsampling(width: u32, height: u32, max_dimension: u32) -> bool {
    width.max(height) > max_dimension
}

fn mime_type(format: ImageFormat) -> Result<&'static str, ExtractionError> {
    match format {
        ImageFormat::Png => Ok("image/png"),
        ImageFormat::Jpeg => Ok("image/jpeg"),
        other => Err(ExtractionError::Image(format!(
            "unsupported image format {:?}",
            other
        ))),
    }
}

/// Down-sample (nearest neighbour) and re-encode as JPEG when the longer side is
/// over the limit, unless that would make the file bigger. An image still over
/// the byte budget gets one JPEG re-encode at full size before it is rejected.
pub fn prepare_image(bytes: &[u8], config: &ImagePrepConfig) -> Result<PreparedImage, ExtractionError> {
    let format = image::guess_format(bytes)
        .map_err(|e| ExtractionError::Image(format!("unrecognized image: {}", e)))?;
    let original_mime = mime_type(format)?;
    let decoded = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| ExtractionError::Image(format!("could not decode image: {}", e)))?;

    let mut prepared = PreparedImage {
        bytes: bytes.to_vec(),
        mime_type: original_mime,
        downsampled: false,
    };

    if needs_downsampling(decoded.width(), decoded.height(), config.max_dimension) {
        let resized = decoded.resize(config.max_dimension, config.max_dimension, FilterType::Nearest);
        let encoded = encode_jpeg(&resized, config.jpeg_quality)?;
        tracing::debug!(
            original_width = decoded.width(),
            original_height = decoded.height(),
            width = resized.width(),
            height = resized.height(),
            original_bytes = bytes.len(),
            encoded_bytes = encoded.len(),
            "Down-sampled image"
        );
        if encoded.len() < bytes.len() {
            prepared = PreparedImage {
                bytes: encoded,
                mime_type: "image/jpeg",
                downsampled: true,
            };
        }
    }

    // Small enough on the page but too heavy on disk: a JPEG may still fit.
    if prepared.bytes.len() > config.max_bytes && prepared.mime_type != "image/jpeg" {
        let encoded = encode_jpeg(&decoded, config.jpeg_quality)?;
        tracing::debug!(
            original_bytes = prepared.bytes.len(),
            encoded_bytes = encoded.len(),
            max_bytes = config.max_bytes,
            "Re-encoded oversized image as JPEG"
        );
        if encoded.len() < prepared.bytes.len() {
            prepared = PreparedImage {
                bytes: encoded,
                mime_type: "image/jpeg",
                downsampled: false,
            };
        }
    }

    if prepared.bytes.len() > config.max_bytes {
        return Err(ExtractionError::Image(format!(
            "image is {} bytes, over the {} byte limit",
            prepared.bytes.len(),
            config.max_bytes
        )));
    }
    Ok(prepared)
}

fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Vec<u8>, ExtractionError> {
    let mut buffer = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
    DynamicImage::ImageRgb8(image.to_rgb8())
        .write_with_encoder(encoder)
        .map_err(|e| ExtractionError::Image(format!("could not encode JPEG: {}", e)))?;
    Ok(buffer.into_inner())
}
