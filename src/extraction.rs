// extraction.rs — Pulls the "Overall description" item out of the scene
// description returned by the vision model, for speech synthesis.
//
// The model is prompted to answer with a three-item numbered list; item 2 is
// the overall description. Matching is tied to that exact phrasing: any other
// numbering, label wording or language falls through to the sentinel.

use regex::Regex;
use std::sync::OnceLock;

/// Rendered form of [`ExtractedFragment::NotFound`].
pub const NOT_FOUND: &str = "No overall description found.";

/// Result of running an extraction rule. Never empty: either a cleaned,
/// non-empty fragment or the not-found marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractedFragment {
    Found(String),
    NotFound,
}

impl ExtractedFragment {
    pub fn into_string(self) -> String {
        match self {
            Self::Found(text) => text,
            Self::NotFound => NOT_FOUND.to_string(),
        }
    }
}

/// Picks the part of the current content that should be spoken.
pub trait TextExtractionRule: Send + Sync {
    fn extract(&self, content: &str) -> ExtractedFragment;
}

/// Matches `2. **Overall description:** …` up to the next blank line or end of text.
#[derive(Debug, Default, Clone, Copy)]
pub struct OverallDescriptionRule;

fn overall_description_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?s)\b2\.\s*\**Overall description\**:\**(.*?)(?:\n\n|\z)")
            .expect("overall description pattern is valid")
    })
}

fn emphasis_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\*+").expect("emphasis pattern is valid"))
}

fn whitespace_run_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\s{2,}").expect("whitespace pattern is valid"))
}

/// Trim, drop every `*` run, and collapse runs of two or more whitespace
/// characters into one space. Applying it twice changes nothing.
pub fn clean_fragment(raw: &str) -> String {
    let stripped = emphasis_pattern().replace_all(raw.trim(), "");
    let collapsed = whitespace_run_pattern().replace_all(&stripped, " ");
    collapsed.trim().to_string()
}

impl TextExtractionRule for OverallDescriptionRule {
    fn extract(&self, content: &str) -> ExtractedFragment {
        let Some(captures) = overall_description_pattern().captures(content) else {
            return ExtractedFragment::NotFound;
        };
        let cleaned = captures
            .get(1)
            .map(|m| clean_fragment(m.as_str()))
            .unwrap_or_default();
        if cleaned.is_empty() {
            ExtractedFragment::NotFound
        } else {
            ExtractedFragment::Found(cleaned)
        }
    }
}

/// Convenience wrapper returning the fragment text or the [`NOT_FOUND`] sentinel.
pub fn extract_overall_description(content: &str) -> String {
    OverallDescriptionRule.extract(content).into_string()
}
