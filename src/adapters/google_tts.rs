use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use super::{AudioArtifact, ServiceError, SpeechSynthesizer};

pub const DEFAULT_ENDPOINT: &str = "https://translate.google.com/translate_tts";
pub const DEFAULT_LANGUAGE: &str = "en";

/// The endpoint rejects requests longer than this many characters.
const MAX_CHUNK_CHARS: usize = 100;

/// Google Translate text-to-speech (MP3 output).
pub struct GoogleTts {
    endpoint: String,
    language: String,
    client: Client,
}

impl GoogleTts {
    pub fn new(endpoint: impl Into<String>, language: impl Into<String>) -> Self {
        let client = Client::builder()
            .user_agent("Mozilla/5.0 (compatible; visionassist)")
            .build()
            .unwrap_or_else(|e| {
                log::warn!("Falling back to default HTTP client: {}", e);
                Client::new()
            });
        Self {
            endpoint: endpoint.into(),
            language: language.into(),
            client,
        }
    }

    fn chunk_url(&self, chunk: &str, idx: usize, total: usize) -> Result<Url, ServiceError> {
        let total = total.to_string();
        let idx = idx.to_string();
        let textlen = chunk.chars().count().to_string();
        Url::parse_with_params(
            &self.endpoint,
            &[
                ("ie", "UTF-8"),
                ("client", "tw-ob"),
                ("tl", self.language.as_str()),
                ("q", chunk),
                ("total", total.as_str()),
                ("idx", idx.as_str()),
                ("textlen", textlen.as_str()),
            ],
        )
        .map_err(|e| ServiceError::NotConfigured(format!("bad TTS endpoint URL: {e}")))
    }

    async fn fetch_chunk(&self, url: Url) -> Result<Vec<u8>, ServiceError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ServiceError::ConnectionError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::ConnectionError(format!("HTTP {}", status)));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ServiceError::ConnectionError(format!("read audio body: {e}")))?;
        if bytes.is_empty() {
            return Err(ServiceError::InvalidResponse("empty audio body".into()));
        }
        Ok(bytes.to_vec())
    }

    async fn try_synthesize(&self, text: &str) -> Result<AudioArtifact, ServiceError> {
        let chunks = split_text(text, MAX_CHUNK_CHARS);
        if chunks.is_empty() {
            return Err(ServiceError::InvalidResponse("nothing to speak".into()));
        }

        // MP3 frames are self-delimiting, so per-chunk bodies concatenate into one stream.
        let mut audio = Vec::new();
        let total = chunks.len();
        for (idx, chunk) in chunks.iter().enumerate() {
            let url = self.chunk_url(chunk, idx, total)?;
            audio.extend(self.fetch_chunk(url).await?);
        }
        Ok(AudioArtifact::mp3(audio))
    }
}

/// Split `text` into pieces of at most `max_chars` characters.
///
/// Words are packed greedily; a piece is closed early after sentence
/// punctuation once it is at least half full so pauses land on natural
/// boundaries. Words longer than `max_chars` are cut.
pub fn split_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    let flush = |current: &mut String, current_len: &mut usize, chunks: &mut Vec<String>| {
        if !current.is_empty() {
            chunks.push(std::mem::take(current));
        }
        *current_len = 0;
    };

    for word in text.split_whitespace() {
        let word_len = word.chars().count();

        if word_len > max_chars {
            flush(&mut current, &mut current_len, &mut chunks);
            let chars: Vec<char> = word.chars().collect();
            for piece in chars.chunks(max_chars) {
                chunks.push(piece.iter().collect());
            }
            continue;
        }

        let needed = if current.is_empty() { word_len } else { current_len + 1 + word_len };
        if needed > max_chars {
            flush(&mut current, &mut current_len, &mut chunks);
        }
        if !current.is_empty() {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(word);
        current_len += word_len;

        let ends_sentence = word.ends_with(['.', '!', '?', ';', ':']);
        if ends_sentence && current_len * 2 >= max_chars {
            flush(&mut current, &mut current_len, &mut chunks);
        }
    }
    flush(&mut current, &mut current_len, &mut chunks);
    chunks
}

#[async_trait]
impl SpeechSynthesizer for GoogleTts {
    async fn synthesize(&self, text: &str) -> Option<AudioArtifact> {
        match self.try_synthesize(text).await {
            Ok(audio) => {
                log::debug!("TTS produced {} bytes of MP3", audio.len());
                Some(audio)
            }
            Err(e) => {
                log::error!("Speech synthesis failed: {}", e);
                None
            }
        }
    }

    fn name(&self) -> &str {
        "google-tts"
    }
}
