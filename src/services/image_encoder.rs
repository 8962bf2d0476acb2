// src/services/image_encoder.rs
use crate::errors::AnalysisError;
use crate::models::{EncodedImage, ImageUpload};
use base64::{Engine as _, engine::general_purpose};
use image::{DynamicImage, GenericImageView, ImageFormat as ImgFormat};
use log::{debug, info};
use std::path::Path;

/// Raw size above which an image is downscaled before inlining. Base64
/// grows the payload by ~33% and the inline request limit is 20MB.
pub const MAX_INLINE_BYTES: usize = 15_000_000;

pub struct ImageEncoder {
    max_inline_bytes: usize,
}

impl Default for ImageEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageEncoder {
    pub fn new() -> Self {
        Self {
            max_inline_bytes: MAX_INLINE_BYTES,
        }
    }

    pub fn with_inline_limit(max_inline_bytes: usize) -> Self {
        Self { max_inline_bytes }
    }

    /// Reads the whole file behind `path`. Read failures are not retried.
    pub async fn read_file(
        &self,
        path: &Path,
        declared_media_type: Option<&str>,
    ) -> Result<ImageUpload, AnalysisError> {
        let data = tokio::fs::read(path).await.map_err(|e| {
            AnalysisError::Encoding(format!("Failed to read {}: {}", path.display(), e))
        })?;

        Ok(ImageUpload {
            filename: path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned()),
            media_type: declared_media_type.map(str::to_string),
            data,
        })
    }

    pub fn encode(&self, upload: &ImageUpload) -> Result<EncodedImage, AnalysisError> {
        if upload.data.is_empty() {
            return Err(AnalysisError::Encoding("Image payload is empty".to_string()));
        }

        let media_type = resolve_media_type(upload.media_type.as_deref(), &upload.data)?;

        if upload.data.len() > self.max_inline_bytes {
            let shrunk = self.shrink_to_inline_limit(&upload.data)?;
            info!(
                "Downscaled image from {} to {} bytes for inline upload",
                upload.data.len(),
                shrunk.len()
            );
            return Ok(EncodedImage {
                data: general_purpose::STANDARD.encode(&shrunk),
                media_type: "image/jpeg".to_string(),
            });
        }

        debug!("Encoding {} byte image as {}", upload.data.len(), media_type);

        Ok(EncodedImage {
            data: general_purpose::STANDARD.encode(&upload.data),
            media_type,
        })
    }

    fn shrink_to_inline_limit(&self, data: &[u8]) -> Result<Vec<u8>, AnalysisError> {
        let img = image::load_from_memory(data)
            .map_err(|e| AnalysisError::Encoding(format!("Failed to load image: {}", e)))?;

        let (width, height) = img.dimensions();

        let scale_factor = ((self.max_inline_bytes as f64 / data.len() as f64).sqrt() * 0.9) as f32;
        let new_width = ((width as f32 * scale_factor) as u32).max(256);
        let new_height = ((height as f32 * scale_factor) as u32).max(256);

        let resized = img.resize(new_width, new_height, image::imageops::FilterType::Lanczos3);
        let rgb = DynamicImage::ImageRgb8(resized.to_rgb8());

        let mut output = Vec::new();
        rgb.write_to(&mut std::io::Cursor::new(&mut output), ImgFormat::Jpeg)
            .map_err(|e| {
                AnalysisError::Encoding(format!("Failed to encode resized image: {}", e))
            })?;

        Ok(output)
    }
}

pub fn decode(encoded: &str) -> Result<Vec<u8>, AnalysisError> {
    general_purpose::STANDARD
        .decode(encoded)
        .map_err(|e| AnalysisError::Encoding(format!("Invalid base64 payload: {}", e)))
}

/// Uses the declared type when it names an image, otherwise sniffs the
/// magic bytes.
fn resolve_media_type(declared: Option<&str>, data: &[u8]) -> Result<String, AnalysisError> {
    if let Some(declared) = declared.map(str::trim) {
        if declared.to_ascii_lowercase().starts_with("image/") {
            return Ok(declared.to_ascii_lowercase());
        }
    }

    let format = image::guess_format(data)
        .map_err(|_| AnalysisError::Encoding("Unrecognized image format".to_string()))?;

    match format {
        ImgFormat::Png => Ok("image/png".to_string()),
        ImgFormat::Jpeg => Ok("image/jpeg".to_string()),
        ImgFormat::Gif => Ok("image/gif".to_string()),
        ImgFormat::WebP => Ok("image/webp".to_string()),
        ImgFormat::Bmp => Ok("image/bmp".to_string()),
        ImgFormat::Tiff => Ok("image/tiff".to_string()),
        other => Err(AnalysisError::Encoding(format!(
            "Unsupported image format: {:?}",
            other
        ))),
    }
}
