use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::Client;
use serde_json::{json, Value};

use super::{SceneDescriber, ServiceError, NO_VALID_RESPONSE_TEXT};
use crate::upload::UploadedImage;

pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-1.5-pro";

/// Google Gemini `generateContent` client.
pub struct GeminiVisionClient {
    endpoint: String,
    api_key: String,
    model: String,
    client: Client,
}

impl GeminiVisionClient {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: model.into(),
            client: Client::new(),
        }
    }

    fn request_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model,
        )
    }

    fn build_request_body(&self, prompt: &str, image: &UploadedImage) -> Value {
        json!({
            "contents": [
                {
                    "role": "user",
                    "parts": [
                        { "text": prompt },
                        {
                            "inline_data": {
                                "mime_type": image.mime_type(),
                                "data": BASE64.encode(image.bytes()),
                            }
                        }
                    ]
                }
            ]
        })
    }
}

/// Concatenate the text parts of the first candidate.
/// Returns `None` when the response carries no text at all
/// (e.g. the prompt was blocked or the candidate list is empty).
fn response_text(body: &Value) -> Option<String> {
    let parts = body.pointer("/candidates/0/content/parts")?.as_array()?;
    let texts: Vec<&str> = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
        .collect();
    if texts.is_empty() {
        None
    } else {
        Some(texts.concat())
    }
}

/// Map a non-success HTTP status to a service error.
/// A rejected key comes back as 400 with reason `API_KEY_INVALID`.
fn status_error(status: u16, body: String) -> ServiceError {
    match status {
        401 | 403 => ServiceError::AuthError(body),
        400 if body.contains("API_KEY_INVALID") => ServiceError::AuthError(body),
        429 => ServiceError::RateLimited(body),
        _ => ServiceError::ConnectionError(format!("HTTP {}: {}", status, body)),
    }
}

#[async_trait]
impl SceneDescriber for GeminiVisionClient {
    async fn describe(&self, prompt: &str, image: &UploadedImage) -> Result<String, ServiceError> {
        if self.api_key.trim().is_empty() {
            return Err(ServiceError::NotConfigured(
                "Gemini API key is not set".into(),
            ));
        }

        let body = self.build_request_body(prompt, image);
        log::debug!(
            "Gemini request: model={} image={} ({} bytes)",
            self.model,
            image.filename(),
            image.bytes().len()
        );

        let response = self
            .client
            .post(self.request_url())
            .header("Content-Type", "application/json")
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ServiceError::ConnectionError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read error body".into());
            return Err(status_error(status.as_u16(), error_body));
        }

        let parsed: Value = response
            .json()
            .await
            .map_err(|e| ServiceError::InvalidResponse(format!("bad JSON: {e}")))?;

        Ok(response_text(&parsed).unwrap_or_else(|| {
            log::warn!("Gemini response carried no text part");
            NO_VALID_RESPONSE_TEXT.to_string()
        }))
    }

    fn name(&self) -> &str {
        "gemini-vision"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_image() -> UploadedImage {
        let png = crate::upload::test_support::tiny_png();
        UploadedImage::new("cup.png", "image/png", png).unwrap()
    }

    #[test]
    fn test_request_body_structure() {
        let client = GeminiVisionClient::new(DEFAULT_ENDPOINT, "k", DEFAULT_MODEL);
        let image = sample_image();
        let body = client.build_request_body("Describe the scene.", &image);

        let parts = body["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0]["text"], "Describe the scene.");
        assert_eq!(parts[1]["inline_data"]["mime_type"], "image/png");
        let decoded = BASE64
            .decode(parts[1]["inline_data"]["data"].as_str().unwrap())
            .unwrap();
        assert_eq!(decoded, image.bytes());
    }

    #[test]
    fn test_request_url_construction() {
        let client = GeminiVisionClient::new(
            "https://generativelanguage.googleapis.com/v1beta/",
            "k",
            "gemini-1.5-pro",
        );
        assert_eq!(
            client.request_url(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-pro:generateContent"
        );
    }

    #[test]
    fn test_response_text_single_part() {
        let body = json!({
            "candidates": [{ "content": { "parts": [{ "text": "1. **Items:** A cup" }] } }]
        });
        assert_eq!(response_text(&body).as_deref(), Some("1. **Items:** A cup"));
    }

    #[test]
    fn test_response_text_concatenates_parts() {
        let body = json!({
            "candidates": [{ "content": { "parts": [{ "text": "Hello" }, { "text": " world" }] } }]
        });
        assert_eq!(response_text(&body).as_deref(), Some("Hello world"));
    }

    #[test]
    fn test_response_without_text_is_none() {
        let blocked = json!({ "promptFeedback": { "blockReason": "SAFETY" } });
        assert!(response_text(&blocked).is_none());

        let empty_parts = json!({ "candidates": [{ "content": { "parts": [] } }] });
        assert!(response_text(&empty_parts).is_none());
    }

    #[test]
    fn test_status_error_mapping() {
        assert!(matches!(
            status_error(403, "denied".into()),
            ServiceError::AuthError(_)
        ));
        assert!(matches!(
            status_error(429, String::new()),
            ServiceError::RateLimited(_)
        ));
        match status_error(500, "boom".into()) {
            ServiceError::ConnectionError(msg) => assert!(msg.contains("500")),
            other => panic!("expected ConnectionError, got: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_key_is_auth_error() {
        let body = r#"{"error":{"code":400,"message":"API key not valid. Please pass a valid API key.","status":"INVALID_ARGUMENT","details":[{"reason":"API_KEY_INVALID"}]}}"#;
        assert!(matches!(
            status_error(400, body.into()),
            ServiceError::AuthError(_)
        ));
        assert!(matches!(
            status_error(400, "bad image".into()),
            ServiceError::ConnectionError(_)
        ));
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_at_first_use() {
        let client = GeminiVisionClient::new(DEFAULT_ENDPOINT, "  ", DEFAULT_MODEL);
        let err = client.describe("p", &sample_image()).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotConfigured(_)));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_connection_error() {
        let client = GeminiVisionClient::new("http://127.0.0.1:1", "k", DEFAULT_MODEL);
        let err = client.describe("p", &sample_image()).await.unwrap_err();
        assert!(matches!(err, ServiceError::ConnectionError(_)));
    }

    #[test]
    fn test_client_name() {
        let client = GeminiVisionClient::new(DEFAULT_ENDPOINT, "k", DEFAULT_MODEL);
        assert_eq!(client.name(), "gemini-vision");
    }
}
