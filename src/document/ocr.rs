use std::io::Write;
use std::process::Stdio;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use tokio::process::Command;

use crate::error::DocError;
use crate::text::clean_ocr_text;
use crate::Config;

static PARAGRAPH_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n[ \t]*\n").unwrap());

/// Placeholder in `args` replaced with the path of the image file.
pub const INPUT_PLACEHOLDER: &str = "{input}";

/// Runs an external OCR binary over image bytes.
#[derive(Debug, Clone)]
pub struct OcrEngine {
    command: String,
    args: Vec<String>,
    timeout_secs: u64,
}

impl OcrEngine {
    pub fn new(command: impl Into<String>, args: Vec<String>, timeout_secs: u64) -> Self {
        Self {
            command: command.into(),
            args,
            timeout_secs,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.ocr_command.clone(), config.ocr_args.clone(), config.ocr_timeout_secs)
    }

    /// Raw recognizer output. An empty string means no text was found.
    pub async fn extract_text(&self, image: &[u8]) -> Result<String, DocError> {
        let mut input = tempfile::NamedTempFile::new()?;
        input.write_all(image)?;
        input.flush()?;
        let input_path = input.path().to_string_lossy().to_string();

        let args: Vec<String> = self
            .args
            .iter()
            .map(|arg| arg.replace(INPUT_PLACEHOLDER, &input_path))
            .collect();

        log::debug!("running OCR: {} {:?}", self.command, args);
        let child = Command::new(&self.command)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| DocError::ExternalService(format!("could not start '{}': {}", self.command, e)))?;

        let output = tokio::time::timeout(Duration::from_secs(self.timeout_secs), child.wait_with_output())
            .await
            .map_err(|_| DocError::ExternalServiceTimeout { seconds: self.timeout_secs })??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DocError::ExternalService(format!(
                "'{}' exited with {}: {}",
                self.command,
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    /// Recognized text with each paragraph cleaned of OCR noise.
    pub async fn recognize(&self, image: &[u8]) -> Result<String, DocError> {
        let raw = self.extract_text(image).await?;
        Ok(ocr_paragraphs(&raw))
    }
}

/// Cleans each blank-line separated paragraph and drops the empty ones.
pub fn ocr_paragraphs(raw: &str) -> String {
    PARAGRAPH_BREAK
        .split(raw)
        .map(clean_ocr_text)
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}
