// coordinator.rs — Routes the three user triggers (describe / extract /
// speak) to exactly one adapter each and turns the result into an `Outcome`
// for the presentation layer.
//
// Service errors stop here: every trigger returns an `Outcome`, never an
// `Err`, and a failed trigger leaves the session untouched.

use crate::adapters::gemini_vision::GeminiVisionClient;
use crate::adapters::google_tts::GoogleTts;
use crate::adapters::tesseract::TesseractRecognizer;
use crate::adapters::{AudioArtifact, SceneDescriber, SpeechSynthesizer, TextRecognizer};
use crate::extraction::{ExtractedFragment, OverallDescriptionRule, TextExtractionRule};
use crate::session::SessionState;
use crate::settings::Settings;
use crate::upload::UploadedImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Instruction sent with every describe trigger. Item 2 is what the speak
/// trigger later reads aloud.
pub const SCENE_PROMPT: &str = "You are an AI assistant helping visually impaired individuals by describing the scene in the image. Provide:
1. List of items detected in the image with their purpose.
2. Overall description of the image.
3. Suggestions for actions or precautions for the visually impaired.
";

pub const MSG_NO_IMAGE: &str = "Please upload an image first.";
pub const MSG_NO_CONTENT: &str = "Content not available for conversion.";
pub const MSG_NO_OVERALL_DESCRIPTION: &str = "No valid 'Overall Description' to convert.";
pub const MSG_AUDIO_FAILED: &str = "Failed to generate audio.";
pub const MSG_SCENE_DONE: &str = "Scene description generated.";
pub const MSG_TEXT_DONE: &str = "Text extracted from the image.";
pub const MSG_SPEECH_DONE: &str = "Text-to-Speech Conversion Completed!";

/// A user action. Each one runs at most one adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Trigger {
    Describe,
    Extract,
    Speak,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Trigger::Describe => "describe",
            Trigger::Extract => "extract",
            Trigger::Speak => "speak",
        };
        f.write_str(name)
    }
}

/// Result payload rendered by the UI.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum Payload {
    SceneDescription(String),
    ExtractedText(String),
    Audio(AudioArtifact),
}

/// What the presentation layer should show after a trigger: one banner,
/// plus a payload on success.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "level", rename_all = "camelCase")]
pub enum Outcome {
    Success { message: String, payload: Payload },
    Warning { message: String, detail: Option<String> },
    Error { message: String },
}

impl Outcome {
    fn warning(message: &str) -> Self {
        Outcome::Warning {
            message: message.to_string(),
            detail: None,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Outcome::Error {
            message: message.into(),
        }
    }

    /// The generic catch-all banner for a failed service call.
    fn service_failure(err: impl fmt::Display) -> Self {
        Self::error(format!("An error occurred: {err}"))
    }

    pub fn message(&self) -> &str {
        match self {
            Outcome::Success { message, .. }
            | Outcome::Warning { message, .. }
            | Outcome::Error { message } => message,
        }
    }

    pub fn payload(&self) -> Option<&Payload> {
        match self {
            Outcome::Success { payload, .. } => Some(payload),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    pub fn is_warning(&self) -> bool {
        matches!(self, Outcome::Warning { .. })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Outcome::Error { .. })
    }
}

/// Holds the adapters and dispatches triggers against a caller-owned session.
pub struct EventCoordinator {
    describer: Arc<dyn SceneDescriber>,
    recognizer: Arc<dyn TextRecognizer>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    rule: Box<dyn TextExtractionRule>,
    prompt: String,
}

impl EventCoordinator {
    pub fn new(
        describer: Arc<dyn SceneDescriber>,
        recognizer: Arc<dyn TextRecognizer>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
    ) -> Self {
        Self {
            describer,
            recognizer,
            synthesizer,
            rule: Box::new(OverallDescriptionRule),
            prompt: SCENE_PROMPT.to_string(),
        }
    }

    /// Build the production adapters (Gemini, Tesseract, Google TTS) from settings.
    pub fn from_settings(settings: &Settings) -> Self {
        let describer = GeminiVisionClient::new(
            &settings.vision_endpoint,
            &settings.api_key,
            &settings.vision_model,
        );
        let recognizer = TesseractRecognizer::new(&settings.tesseract_cmd, &settings.ocr_language);
        let synthesizer = GoogleTts::new(&settings.tts_endpoint, &settings.tts_language);
        log::info!(
            "EventCoordinator configured (model={}, ocr={}, tts_lang={}, api_key_set={})",
            settings.vision_model,
            settings.tesseract_cmd,
            settings.tts_language,
            !settings.api_key.trim().is_empty()
        );
        Self::new(Arc::new(describer), Arc::new(recognizer), Arc::new(synthesizer))
            .with_prompt(&settings.vision_prompt)
    }

    /// Replace the extraction rule used by the speak trigger.
    pub fn with_rule(mut self, rule: Box<dyn TextExtractionRule>) -> Self {
        self.rule = rule;
        self
    }

    pub fn with_prompt(mut self, prompt: &str) -> Self {
        if prompt.trim().is_empty() {
            log::warn!("Empty vision prompt ignored, keeping the built-in prompt");
        } else {
            self.prompt = prompt.to_string();
        }
        self
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Dispatch a trigger by kind.
    pub async fn handle(
        &self,
        trigger: Trigger,
        session: &mut SessionState,
        image: Option<&UploadedImage>,
    ) -> Outcome {
        log::info!("Trigger: {}", trigger);
        // No trigger is processed until an image is uploaded, Speak included.
        let outcome = match image {
            None => Outcome::warning(MSG_NO_IMAGE),
            Some(image) => match trigger {
                Trigger::Describe => self.describe(session, Some(image)).await,
                Trigger::Extract => self.extract(session, Some(image)).await,
                Trigger::Speak => self.speak(session).await,
            },
        };
        match &outcome {
            Outcome::Success { .. } => log::info!("Trigger {} succeeded", trigger),
            Outcome::Warning { message, .. } => log::warn!("Trigger {}: {}", trigger, message),
            Outcome::Error { message } => log::error!("Trigger {}: {}", trigger, message),
        }
        outcome
    }

    /// Ask the vision model for a scene description and store it as the
    /// session content.
    pub async fn describe(&self, session: &mut SessionState, image: Option<&UploadedImage>) -> Outcome {
        let Some(image) = image else {
            return Outcome::warning(MSG_NO_IMAGE);
        };

        match self.describer.describe(&self.prompt, image).await {
            Ok(text) => {
                log::debug!("{} returned {} chars", self.describer.name(), text.len());
                session.set_content(text.clone());
                Outcome::Success {
                    message: MSG_SCENE_DONE.into(),
                    payload: Payload::SceneDescription(text),
                }
            }
            Err(e) => Outcome::service_failure(e),
        }
    }

    /// Run OCR over the uploaded image and store the text as the session content.
    pub async fn extract(&self, session: &mut SessionState, image: Option<&UploadedImage>) -> Outcome {
        let Some(image) = image else {
            return Outcome::warning(MSG_NO_IMAGE);
        };

        let bitmap = match image.decode() {
            Ok(b) => b,
            Err(e) => return Outcome::service_failure(e),
        };

        match self.recognizer.recognize(&bitmap).await {
            Ok(text) => {
                log::debug!("{} returned {} chars", self.recognizer.name(), text.len());
                session.set_content(text.clone());
                Outcome::Success {
                    message: MSG_TEXT_DONE.into(),
                    payload: Payload::ExtractedText(text),
                }
            }
            Err(e) => Outcome::service_failure(e),
        }
    }

    /// Read the overall description of the current content aloud.
    pub async fn speak(&self, session: &mut SessionState) -> Outcome {
        let Some(content) = session.speakable_content() else {
            return Outcome::warning(MSG_NO_CONTENT);
        };

        let fragment = match self.rule.extract(content) {
            ExtractedFragment::Found(text) => text,
            not_found @ ExtractedFragment::NotFound => {
                return Outcome::Warning {
                    message: MSG_NO_OVERALL_DESCRIPTION.into(),
                    detail: Some(not_found.into_string()),
                };
            }
        };

        session.set_overall_description(fragment.clone());

        match self.synthesizer.synthesize(&fragment).await {
            Some(audio) => {
                log::debug!("{} returned {} bytes", self.synthesizer.name(), audio.len());
                Outcome::Success {
                    message: MSG_SPEECH_DONE.into(),
                    payload: Payload::Audio(audio),
                }
            }
            None => Outcome::error(MSG_AUDIO_FAILED),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ServiceError;
    use crate::extraction::NOT_FOUND;
    use async_trait::async_trait;
    use image::DynamicImage;

    struct Fixed(&'static str);

    #[async_trait]
    impl SceneDescriber for Fixed {
        async fn describe(&self, _prompt: &str, _image: &UploadedImage) -> Result<String, ServiceError> {
            Ok(self.0.to_string())
        }
        fn name(&self) -> &str {
            "fixed"
        }
    }

    #[async_trait]
    impl TextRecognizer for Fixed {
        async fn recognize(&self, _image: &DynamicImage) -> Result<String, ServiceError> {
            Ok(self.0.to_string())
        }
        fn name(&self) -> &str {
            "fixed"
        }
    }

    #[async_trait]
    impl SpeechSynthesizer for Fixed {
        async fn synthesize(&self, text: &str) -> Option<AudioArtifact> {
            Some(AudioArtifact::mp3(text.as_bytes().to_vec()))
        }
        fn name(&self) -> &str {
            "fixed"
        }
    }

    fn coordinator(text: &'static str) -> EventCoordinator {
        let f = Arc::new(Fixed(text));
        EventCoordinator::new(f.clone(), f.clone(), f)
    }

    #[test]
    fn trigger_display_names() {
        assert_eq!(Trigger::Describe.to_string(), "describe");
        assert_eq!(Trigger::Extract.to_string(), "extract");
        assert_eq!(Trigger::Speak.to_string(), "speak");
    }

    #[test]
    fn default_prompt_asks_for_three_items() {
        let c = coordinator("");
        assert!(c.prompt().contains("2. Overall description of the image."));
    }

    #[test]
    fn blank_prompt_keeps_default() {
        let c = coordinator("").with_prompt("   ");
        assert_eq!(c.prompt(), SCENE_PROMPT);
        let c = coordinator("").with_prompt("Describe briefly.");
        assert_eq!(c.prompt(), "Describe briefly.");
    }

    #[test]
    fn outcome_serializes_with_level_tag() {
        let w = Outcome::Warning {
            message: MSG_NO_OVERALL_DESCRIPTION.into(),
            detail: Some(NOT_FOUND.into()),
        };
        let v = serde_json::to_value(&w).unwrap();
        assert_eq!(v["level"], "warning");
        assert_eq!(v["detail"], NOT_FOUND);

        let s = Outcome::Success {
            message: MSG_SCENE_DONE.into(),
            payload: Payload::SceneDescription("A cup".into()),
        };
        let v = serde_json::to_value(&s).unwrap();
        assert_eq!(v["level"], "success");
        assert_eq!(v["payload"]["kind"], "sceneDescription");
        assert_eq!(v["payload"]["value"], "A cup");
    }

    #[tokio::test]
    async fn handle_ignores_speak_without_image() {
        let c = coordinator("");
        let mut session = SessionState::new();
        session.set_content("2. **Overall description:** A dog.".into());
        let outcome = c.handle(Trigger::Speak, &mut session, None).await;
        assert!(outcome.is_warning());
        assert_eq!(outcome.message(), MSG_NO_IMAGE);
        assert!(outcome.payload().is_none());
        assert!(session.overall_description().is_none());
    }

    #[tokio::test]
    async fn describe_without_image_warns() {
        let c = coordinator("x");
        let mut session = SessionState::new();
        let outcome = c.handle(Trigger::Describe, &mut session, None).await;
        assert!(outcome.is_warning());
        assert_eq!(outcome.message(), MSG_NO_IMAGE);
        assert!(session.content().is_none());
    }

    struct OnlyFirstLine;

    impl TextExtractionRule for OnlyFirstLine {
        fn extract(&self, content: &str) -> ExtractedFragment {
            content
                .lines()
                .next()
                .filter(|l| !l.trim().is_empty())
                .map(|l| ExtractedFragment::Found(l.trim().to_string()))
                .unwrap_or(ExtractedFragment::NotFound)
        }
    }

    #[tokio::test]
    async fn custom_rule_replaces_default() {
        let c = coordinator("").with_rule(Box::new(OnlyFirstLine));
        let mut session = SessionState::new();
        session.set_content("EXIT\nPlatform 2".into());
        let outcome = c.speak(&mut session).await;
        assert!(outcome.is_success());
        assert_eq!(session.overall_description(), Some("EXIT"));
    }
}
