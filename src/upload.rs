// upload.rs — Validates an uploaded image, decodes it for OCR and renders
// the downscaled JPEG preview shown next to the action buttons.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::{imageops, DynamicImage, GenericImageView, ImageFormat};
use serde::Serialize;

use crate::adapters::ServiceError;

/// MIME types accepted by the upload slot.
pub const ACCEPTED_MIME_TYPES: [&str; 2] = ["image/jpeg", "image/png"];

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Unsupported image type '{0}' (expected JPG, JPEG or PNG)")]
    UnsupportedType(String),
    #[error("Uploaded file is empty")]
    Empty,
    #[error("Uploaded data is not valid base64: {0}")]
    BadEncoding(String),
    #[error("Uploaded file is not a JPEG or PNG image")]
    UnrecognizedContent,
    #[error("Preview rendering failed: {0}")]
    Preview(String),
}

// ── UploadedImage ───────────────────────────────────────────────────────
/// An image received from the upload slot.
///
/// Immutable once constructed; adapters borrow it and never copy the payload.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    filename: String,
    mime_type: String,
    bytes: Vec<u8>,
}

impl UploadedImage {
    /// Validate and wrap an uploaded payload.
    ///
    /// The declared MIME type must be one of [`ACCEPTED_MIME_TYPES`] (`image/jpg`
    /// is accepted as an alias of `image/jpeg`), and the bytes themselves must
    /// sniff as JPEG or PNG. When the declared type disagrees with the content,
    /// the sniffed type wins since that is what the vision service will see.
    pub fn new(
        filename: impl Into<String>,
        mime_type: &str,
        bytes: Vec<u8>,
    ) -> Result<Self, UploadError> {
        let declared = normalize_mime(mime_type)
            .ok_or_else(|| UploadError::UnsupportedType(mime_type.to_string()))?;
        if bytes.is_empty() {
            return Err(UploadError::Empty);
        }

        let sniffed = match image::guess_format(&bytes) {
            Ok(format @ (ImageFormat::Jpeg | ImageFormat::Png)) => format.to_mime_type(),
            _ => return Err(UploadError::UnrecognizedContent),
        };
        let filename = filename.into();
        if sniffed != declared {
            log::warn!(
                "Upload '{}' declared {} but contains {}",
                filename,
                declared,
                sniffed
            );
        }

        Ok(Self {
            filename,
            mime_type: sniffed.to_string(),
            bytes,
        })
    }

    /// Same as [`UploadedImage::new`] with a base64 payload, as sent by the webview.
    pub fn from_base64(
        filename: impl Into<String>,
        mime_type: &str,
        data: &str,
    ) -> Result<Self, UploadError> {
        // Tolerate a full `data:` URL as produced by FileReader.readAsDataURL.
        let payload = match data.split_once(";base64,") {
            Some((_, rest)) => rest,
            None => data,
        };
        let bytes = BASE64
            .decode(payload.trim())
            .map_err(|e| UploadError::BadEncoding(e.to_string()))?;
        Self::new(filename, mime_type, bytes)
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Decode into a bitmap for the OCR engine.
    pub fn decode(&self) -> Result<DynamicImage, ServiceError> {
        image::load_from_memory(&self.bytes).map_err(|e| ServiceError::ImageDecode(e.to_string()))
    }

    /// Render the preview shown in the UI.
    ///
    /// Images wider than `max_width` are downscaled (aspect preserved) and the
    /// result is JPEG-encoded at `jpeg_quality` and wrapped in a `data:` URL.
    pub fn render_preview(&self, max_width: u32, jpeg_quality: u8) -> Result<ImagePreview, UploadError> {
        let img = self
            .decode()
            .map_err(|e| UploadError::Preview(e.to_string()))?;

        let img = downscale(img, max_width);
        let (w, h) = img.dimensions();

        let mut jpeg_buf: Vec<u8> = Vec::new();
        {
            let mut encoder = JpegEncoder::new_with_quality(&mut jpeg_buf, jpeg_quality);
            encoder
                .encode(img.to_rgb8().as_raw(), w, h, image::ExtendedColorType::Rgb8)
                .map_err(|e| UploadError::Preview(format!("jpeg encode: {e}")))?;
        }

        Ok(ImagePreview {
            filename: self.filename.clone(),
            data_url: format!("data:image/jpeg;base64,{}", BASE64.encode(&jpeg_buf)),
            width: w,
            height: h,
        })
    }
}

/// Preview payload returned to the webview after a successful upload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagePreview {
    pub filename: String,
    pub data_url: String,
    /// Width of the (possibly downscaled) preview
    pub width: u32,
    /// Height of the (possibly downscaled) preview
    pub height: u32,
}

fn normalize_mime(mime_type: &str) -> Option<&'static str> {
    let lower = mime_type.trim().to_ascii_lowercase();
    let canonical = match lower.as_str() {
        "image/jpg" | "image/pjpeg" => "image/jpeg",
        other => other,
    };
    ACCEPTED_MIME_TYPES.into_iter().find(|accepted| *accepted == canonical)
}

fn downscale(img: DynamicImage, max_width: u32) -> DynamicImage {
    if max_width == 0 || img.width() <= max_width {
        return img;
    }
    let ratio = max_width as f64 / img.width() as f64;
    let new_h = ((img.height() as f64 * ratio).round() as u32).max(1);
    img.resize_exact(max_width, new_h, imageops::FilterType::Triangle)
}
