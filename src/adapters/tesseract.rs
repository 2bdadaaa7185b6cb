use std::io::Cursor;
use std::process::Stdio;

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::{ServiceError, TextRecognizer};

pub const DEFAULT_COMMAND: &str = "tesseract";
pub const DEFAULT_LANGUAGE: &str = "eng";

/// OCR through the Tesseract command-line executable.
///
/// The bitmap is re-encoded as PNG and piped through `tesseract stdin stdout`,
/// so nothing touches the disk.
pub struct TesseractRecognizer {
    command: String,
    language: String,
}

impl TesseractRecognizer {
    pub fn new(command: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            language: language.into(),
        }
    }

    fn args(&self) -> Vec<String> {
        vec![
            "stdin".into(),
            "stdout".into(),
            "-l".into(),
            self.language.clone(),
        ]
    }
}

fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, ServiceError> {
    let mut buf = Cursor::new(Vec::new());
    image
        .write_to(&mut buf, ImageFormat::Png)
        .map_err(|e| ServiceError::OcrError(format!("png encode: {e}")))?;
    Ok(buf.into_inner())
}

/// Tesseract terminates each page with a form feed; drop it.
fn clean_output(stdout: &[u8]) -> String {
    String::from_utf8_lossy(stdout)
        .trim_end_matches('\u{c}')
        .to_string()
}

#[async_trait]
impl TextRecognizer for TesseractRecognizer {
    async fn recognize(&self, image: &DynamicImage) -> Result<String, ServiceError> {
        let png = encode_png(image)?;
        log::debug!("Tesseract input: {} bytes of PNG", png.len());

        let mut child = Command::new(&self.command)
            .args(self.args())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                ServiceError::NotConfigured(format!(
                    "cannot run OCR engine '{}': {e}",
                    self.command
                ))
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| ServiceError::OcrError("OCR engine stdin unavailable".into()))?;

        // Feed stdin concurrently so a large image cannot deadlock against a full stdout pipe.
        let writer = tokio::spawn(async move {
            stdin.write_all(&png).await?;
            stdin.shutdown().await
        });

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| ServiceError::OcrError(format!("waiting for OCR engine: {e}")))?;
        let write_result = writer.await;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ServiceError::OcrError(format!(
                "{} exited with {}: {}",
                self.command,
                output.status,
                stderr.trim()
            )));
        }
        match write_result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(ServiceError::OcrError(format!("writing image: {e}"))),
            Err(e) => return Err(ServiceError::OcrError(format!("writer task: {e}"))),
        }

        Ok(clean_output(&output.stdout))
    }

    fn name(&self) -> &str {
        "tesseract"
    }
}
