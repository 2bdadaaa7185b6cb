use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Serialize, Serializer};

/// Returned by the scene describer when the model answered without any text part.
pub const NO_VALID_RESPONSE_TEXT: &str = "No valid response text";

/// Error type for external service calls
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Connection failed: {0}")]
    ConnectionError(String),
    #[error("Authentication failed: {0}")]
    AuthError(String),
    #[error("Rate limited: {0}")]
    RateLimited(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Not configured: {0}")]
    NotConfigured(String),
    #[error("Image could not be decoded: {0}")]
    ImageDecode(String),
    #[error("OCR failed: {0}")]
    OcrError(String),
}

/// Encoded speech audio, produced fresh for every speak trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioArtifact {
    pub mime_type: String,
    /// Serialized as base64 so the webview can build a `data:` URL.
    #[serde(serialize_with = "serialize_base64")]
    pub data: Vec<u8>,
}

impl AudioArtifact {
    pub fn mp3(data: Vec<u8>) -> Self {
        Self {
            mime_type: "audio/mpeg".into(),
            data,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

fn serialize_base64<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&BASE64.encode(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audio_artifact_serializes_as_base64() {
        let audio = AudioArtifact::mp3(vec![0xFF, 0xFB, 0x90]);
        let v = serde_json::to_value(&audio).unwrap();
        assert_eq!(v["mimeType"], "audio/mpeg");
        assert_eq!(v["data"], BASE64.encode([0xFF, 0xFB, 0x90]));
    }

    #[test]
    fn rate_limited_message_carries_body() {
        let e = ServiceError::RateLimited("quota exceeded".into());
        assert_eq!(e.to_string(), "Rate limited: quota exceeded");
    }
}
