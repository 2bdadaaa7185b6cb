// commands.rs — Tauri commands backing the upload slot, the three action
// buttons and the settings panel.
//
// One window is one session: the `SessionState` lives in managed state and
// its async mutex is held for the whole trigger, so triggers never overlap.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use tauri::State;
use tokio::sync::Mutex as TokioMutex;

use crate::coordinator::{EventCoordinator, Outcome, Trigger};
use crate::session::SessionState;
use crate::settings::Settings;
use crate::upload::{ImagePreview, UploadedImage};

pub struct AppState {
    coordinator: RwLock<Arc<EventCoordinator>>,
    session: TokioMutex<SessionState>,
    image: Mutex<Option<Arc<UploadedImage>>>,
    settings: Mutex<Settings>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        Self {
            coordinator: RwLock::new(Arc::new(EventCoordinator::from_settings(&settings))),
            session: TokioMutex::new(SessionState::new()),
            image: Mutex::new(None),
            settings: Mutex::new(settings),
        }
    }

    fn coordinator(&self) -> Arc<EventCoordinator> {
        let guard = self.coordinator.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    fn apply_settings(&self, settings: Settings) {
        let rebuilt = Arc::new(EventCoordinator::from_settings(&settings));
        *self.coordinator.write().unwrap_or_else(PoisonError::into_inner) = rebuilt;
        *lock(&self.settings) = settings;
    }

    async fn run_trigger(&self, trigger: Trigger) -> Outcome {
        let mut session = self.session.lock().await;
        let coordinator = self.coordinator();
        let image = lock(&self.image).clone();
        coordinator
            .handle(trigger, &mut session, image.as_deref())
            .await
    }

    /// Validate an upload and store it in the image slot. A rejected upload
    /// empties the slot so triggers cannot run against the previous image.
    fn accept_upload(
        &self,
        filename: String,
        mime_type: &str,
        data: &str,
    ) -> Result<ImagePreview, String> {
        let (max_width, quality) = {
            let s = lock(&self.settings);
            (s.preview_max_width, s.preview_jpeg_quality)
        };
        let accepted = UploadedImage::from_base64(filename, mime_type, data).and_then(|image| {
            let preview = image.render_preview(max_width, quality)?;
            Ok((image, preview))
        });

        let mut slot = lock(&self.image);
        match accepted {
            Ok((image, preview)) => {
                log::info!(
                    "Image uploaded: {} ({}, {} bytes)",
                    image.filename(),
                    image.mime_type(),
                    image.bytes().len()
                );
                *slot = Some(Arc::new(image));
                Ok(preview)
            }
            Err(e) => {
                log::warn!("Upload rejected: {}", e);
                *slot = None;
                Err(e.to_string())
            }
        }
    }
}

/// Accept an uploaded image (base64 payload) and return its preview.
/// Replacing the image does not touch the session content.
#[tauri::command]
pub async fn upload_image(
    state: State<'_, AppState>,
    filename: String,
    mime_type: String,
    data: String,
) -> Result<ImagePreview, String> {
    state.accept_upload(filename, &mime_type, &data)
}

#[tauri::command]
pub async fn describe_scene(state: State<'_, AppState>) -> Result<Outcome, String> {
    Ok(state.run_trigger(Trigger::Describe).await)
}

#[tauri::command]
pub async fn extract_text(state: State<'_, AppState>) -> Result<Outcome, String> {
    Ok(state.run_trigger(Trigger::Extract).await)
}

#[tauri::command]
pub async fn text_to_speech(state: State<'_, AppState>) -> Result<Outcome, String> {
    Ok(state.run_trigger(Trigger::Speak).await)
}

/// Start a fresh session: forget the image and every stored result.
#[tauri::command]
pub async fn reset_session(state: State<'_, AppState>) -> Result<(), String> {
    state.session.lock().await.reset();
    *lock(&state.image) = None;
    log::info!("Session reset");
    Ok(())
}

#[tauri::command]
pub async fn load_settings(state: State<'_, AppState>) -> Result<Settings, String> {
    Ok(lock(&state.settings).clone())
}

/// Persist settings and rebuild the adapters with them.
#[tauri::command]
pub async fn save_settings(
    app: tauri::AppHandle,
    state: State<'_, AppState>,
    settings: Settings,
) -> Result<(), String> {
    settings.save_to_app(&app)?;
    state.apply_settings(settings);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::MSG_NO_IMAGE;
    use crate::upload::test_support::tiny_png;
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

    fn state_with_image() -> AppState {
        let state = AppState::new(Settings::default());
        let data = BASE64.encode(tiny_png());
        state
            .accept_upload("a.png".into(), "image/png", &data)
            .unwrap();
        state
    }

    #[test]
    fn upload_fills_the_slot() {
        let state = state_with_image();
        let stored = lock(&state.image).clone().unwrap();
        assert_eq!(stored.filename(), "a.png");
    }

    #[tokio::test]
    async fn rejected_upload_clears_previous_image() {
        let state = state_with_image();
        let err = state
            .accept_upload("notes.txt".into(), "text/plain", "aGVsbG8=")
            .unwrap_err();
        assert!(err.contains("text/plain"));
        assert!(lock(&state.image).is_none());

        let outcome = state.run_trigger(Trigger::Describe).await;
        assert!(outcome.is_warning());
        assert_eq!(outcome.message(), MSG_NO_IMAGE);
    }

    #[test]
    fn applied_settings_rebuild_the_coordinator() {
        let state = AppState::new(Settings::default());
        let settings = Settings {
            vision_prompt: "Describe briefly.".into(),
            ..Settings::default()
        };
        state.apply_settings(settings.clone());
        assert_eq!(state.coordinator().prompt(), "Describe briefly.");
        assert_eq!(*lock(&state.settings), settings);
    }
}
