//! E2E test: sends a real image to Gemini and runs the full describe → speak flow.
//!
//! Requires environment variables:
//!   GEMINI_API_KEY     - API key for the Generative Language API
//!   VISIONASSIST_IMAGE - path to a JPEG or PNG to describe
//!
//! Run: cargo test --test gemini_e2e -- --ignored

use std::sync::Arc;

use visionassist_lib::adapters::gemini_vision::{GeminiVisionClient, DEFAULT_ENDPOINT, DEFAULT_MODEL};
use visionassist_lib::adapters::google_tts::{self, GoogleTts};
use visionassist_lib::adapters::tesseract::TesseractRecognizer;
use visionassist_lib::adapters::SceneDescriber;
use visionassist_lib::coordinator::{EventCoordinator, Payload, SCENE_PROMPT};
use visionassist_lib::extraction::{extract_overall_description, NOT_FOUND};
use visionassist_lib::session::SessionState;
use visionassist_lib::upload::UploadedImage;

fn get_env(key: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| panic!("Set {} env var to run this test", key))
}

fn load_image() -> UploadedImage {
    let path = get_env("VISIONASSIST_IMAGE");
    let bytes = std::fs::read(&path).expect("Failed to read test image");
    let mime = if path.to_ascii_lowercase().ends_with(".png") {
        "image/png"
    } else {
        "image/jpeg"
    };
    UploadedImage::new(path.clone(), mime, bytes).expect("not a JPEG/PNG image")
}

#[tokio::test]
#[ignore] // Only run manually with --ignored flag
async fn gemini_answers_with_numbered_list() {
    let client = GeminiVisionClient::new(DEFAULT_ENDPOINT, get_env("GEMINI_API_KEY"), DEFAULT_MODEL);
    let image = load_image();

    let text = client
        .describe(SCENE_PROMPT, &image)
        .await
        .expect("describe failed");
    println!("Response:\n{text}");

    assert!(!text.is_empty());
    let fragment = extract_overall_description(&text);
    println!("Overall description: {fragment}");
    assert_ne!(fragment, NOT_FOUND, "model output no longer matches the extraction pattern");
}

#[tokio::test]
#[ignore]
async fn describe_then_speak_produces_mp3() {
    let coordinator = EventCoordinator::new(
        Arc::new(GeminiVisionClient::new(DEFAULT_ENDPOINT, get_env("GEMINI_API_KEY"), DEFAULT_MODEL)),
        Arc::new(TesseractRecognizer::new("tesseract", "eng")),
        Arc::new(GoogleTts::new(google_tts::DEFAULT_ENDPOINT, "en")),
    );
    let image = load_image();
    let mut session = SessionState::new();

    let outcome = coordinator.describe(&mut session, Some(&image)).await;
    println!("Describe: {}", outcome.message());
    assert!(outcome.is_success());

    let outcome = coordinator.speak(&mut session).await;
    println!("Speak: {}", outcome.message());
    match outcome.payload() {
        Some(Payload::Audio(audio)) => {
            println!("Received {} bytes of audio", audio.len());
            assert!(audio.len() > 1000);
        }
        other => panic!("expected audio, got {other:?}"),
    }
}
