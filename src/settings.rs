use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::adapters::{gemini_vision, google_tts, tesseract};
use crate::coordinator::SCENE_PROMPT;

pub const SETTINGS_FILE: &str = "settings.toml";

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("settings I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid settings file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("cannot serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub api_key: String,
    pub vision_endpoint: String,
    pub vision_model: String,
    pub vision_prompt: String,
    /// Path or name of the Tesseract executable.
    pub tesseract_cmd: String,
    pub ocr_language: String,
    pub tts_endpoint: String,
    pub tts_language: String,
    pub preview_max_width: u32,
    pub preview_jpeg_quality: u8,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            vision_endpoint: gemini_vision::DEFAULT_ENDPOINT.into(),
            vision_model: gemini_vision::DEFAULT_MODEL.into(),
            vision_prompt: SCENE_PROMPT.into(),
            tesseract_cmd: tesseract::DEFAULT_COMMAND.into(),
            ocr_language: tesseract::DEFAULT_LANGUAGE.into(),
            tts_endpoint: google_tts::DEFAULT_ENDPOINT.into(),
            tts_language: google_tts::DEFAULT_LANGUAGE.into(),
            preview_max_width: 1024,
            preview_jpeg_quality: 75,
        }
    }
}

impl Settings {
    /// Load settings from a TOML file. A missing file yields the defaults;
    /// keys absent from the file keep their default values.
    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&content)?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|source| SettingsError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("Settings saved to {}", path.display());
        Ok(())
    }

    /// Apply process environment overrides:
    /// `GOOGLE_API_KEY` / `GEMINI_API_KEY` for the API key (first non-empty wins)
    /// and `TESSERACT_CMD` for the OCR executable.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("GOOGLE_API_KEY").or_else(|| non_empty("GEMINI_API_KEY")) {
            log::info!("API key taken from environment");
            self.api_key = key;
        }
        if let Some(cmd) = non_empty("TESSERACT_CMD") {
            log::info!("Tesseract command taken from environment: {}", cmd);
            self.tesseract_cmd = cmd;
        }
        self
    }
}

#[cfg(feature = "desktop")]
mod desktop {
    use super::*;
    use tauri::Manager;

    fn config_path(app: &tauri::AppHandle) -> Result<PathBuf, String> {
        let dir = app.path().app_config_dir().map_err(|e| e.to_string())?;
        Ok(dir.join(SETTINGS_FILE))
    }

    impl Settings {
        /// Load settings from the app config directory, with env overrides applied.
        pub fn load_from_app(app: &tauri::AppHandle) -> Result<Self, String> {
            let path = config_path(app)?;
            Settings::load_from(&path)
                .map(Settings::with_env_overrides)
                .map_err(|e| e.to_string())
        }

        pub fn save_to_app(&self, app: &tauri::AppHandle) -> Result<(), String> {
            let path = config_path(app)?;
            self.save_to(&path).map_err(|e| e.to_string())
        }
    }
}
