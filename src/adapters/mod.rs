use async_trait::async_trait;
use image::DynamicImage;

use crate::upload::UploadedImage;

pub mod gemini_vision;
pub mod google_tts;
pub mod tesseract;
pub mod types;
pub use types::*;

/// Vision-language model that turns an image into a scene description.
#[async_trait]
pub trait SceneDescriber: Send + Sync {
    /// Send `prompt` together with the uploaded image.
    /// A response without any text yields [`NO_VALID_RESPONSE_TEXT`] instead of an error.
    async fn describe(&self, prompt: &str, image: &UploadedImage) -> Result<String, ServiceError>;

    /// Provider name for logging/display
    fn name(&self) -> &str;
}

/// OCR engine. Returns whatever text was detected, possibly empty.
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    async fn recognize(&self, image: &DynamicImage) -> Result<String, ServiceError>;

    fn name(&self) -> &str;
}

/// Text-to-speech engine.
///
/// Failures never propagate: they are logged and reported as `None`,
/// and the caller decides how to surface them.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> Option<AudioArtifact>;

    fn name(&self) -> &str;
}
