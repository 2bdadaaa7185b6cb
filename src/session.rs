use serde::Serialize;

/// Per-session scratch state shared by the three triggers.
///
/// `content` is a single last-write-wins slot: every successful describe or
/// extract replaces it wholesale. `overall_description` is only recomputed by
/// the speak trigger, from whatever `content` holds at that moment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    content: Option<String>,
    overall_description: Option<String>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest raw result (scene description or OCR text).
    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    /// Content that is present and not just whitespace.
    pub fn speakable_content(&self) -> Option<&str> {
        self.content().filter(|c| !c.trim().is_empty())
    }

    pub fn overall_description(&self) -> Option<&str> {
        self.overall_description.as_deref()
    }

    pub fn set_content(&mut self, content: String) {
        self.content = Some(content);
    }

    pub fn set_overall_description(&mut self, fragment: String) {
        self.overall_description = Some(fragment);
    }

    /// Drop everything, as if a new session had started.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
