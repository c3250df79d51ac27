//! Whisper capture backend.
//!
//! Records one utterance with a sox-compatible recorder, then shells out to
//! the local whisper binary for transcription.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

use super::{Capture, CaptureError};

/// Time the recorder gets beyond the utterance cap to flush and exit
const RECORDER_GRACE: Duration = Duration::from_secs(2);

/// Settings for recording and transcribing an utterance
#[derive(Debug, Clone)]
pub struct WhisperSettings {
    /// Recorder binary (sox `rec` or compatible)
    pub recorder_path: String,

    /// Whisper binary
    pub whisper_path: String,

    /// Whisper model name
    pub model: String,

    /// Trailing silence that ends an utterance
    pub silence_seconds: f32,

    /// Hard cap on one utterance
    pub max_utterance_seconds: u64,

    /// Upper bound for one transcription
    pub transcribe_timeout: Duration,
}

impl Default for WhisperSettings {
    fn default() -> Self {
        Self {
            recorder_path: "rec".to_string(),
            whisper_path: "whisper".to_string(),
            model: "base".to_string(),
            silence_seconds: 1.5,
            max_utterance_seconds: 30,
            transcribe_timeout: Duration::from_secs(120),
        }
    }
}

/// Whisper output JSON structure
#[derive(Debug, Deserialize)]
struct WhisperOutput {
    text: String,
    #[serde(default)]
    language: String,
}

/// Capture adapter: `rec` into a temp WAV, then `whisper --language <code>`
pub struct WhisperCapture {
    settings: WhisperSettings,
}

impl WhisperCapture {
    pub fn new(settings: WhisperSettings) -> Self {
        Self { settings }
    }

    /// Upper bound for one recording, including the trailing silence
    fn record_timeout(&self) -> Duration {
        Duration::from_secs(self.settings.max_utterance_seconds)
            + Duration::from_secs_f32(self.settings.silence_seconds.max(0.0))
            + RECORDER_GRACE
    }

    /// Record until the speaker falls silent
    async fn record(&self, audio_path: &Path) -> Result<(), CaptureError> {
        let silence = format!("{:.1}", self.settings.silence_seconds);
        let max = self.settings.max_utterance_seconds.to_string();

        let run = Command::new(&self.settings.recorder_path)
            .args(["-q", "-c", "1", "-r", "16000"])
            .arg(audio_path)
            .args(["silence", "1", "0.1", "1%", "1", &silence, "1%"])
            .args(["trim", "0", &max])
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let limit = self.record_timeout();
        let output = timeout(limit, run)
            .await
            .map_err(|_| {
                CaptureError::ServiceUnavailable(format!("recorder timed out after {:?}", limit))
            })?
            .map_err(|e| {
                CaptureError::ServiceUnavailable(format!(
                    "failed to run recorder '{}': {}",
                    self.settings.recorder_path, e
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CaptureError::ServiceUnavailable(format!(
                "recorder exited with code {}: {}",
                output.status.code().unwrap_or(-1),
                stderr.trim()
            )));
        }

        Ok(())
    }

    /// Transcribe a recorded utterance
    async fn transcribe(
        &self,
        audio_path: &Path,
        language_code: &str,
        output_dir: &Path,
    ) -> Result<WhisperOutput, CaptureError> {
        let run = Command::new(&self.settings.whisper_path)
            .arg(audio_path)
            .arg("--model")
            .arg(&self.settings.model)
            .arg("--output_dir")
            .arg(output_dir)
            .arg("--output_format")
            .arg("json")
            .arg("--language")
            .arg(whisper_language(language_code))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = timeout(self.settings.transcribe_timeout, run)
            .await
            .map_err(|_| {
                CaptureError::ServiceUnavailable(format!(
                    "whisper timed out after {:?}",
                    self.settings.transcribe_timeout
                ))
            })?
            .map_err(|e| CaptureError::ServiceUnavailable(format!("failed to run whisper: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CaptureError::ServiceUnavailable(format!(
                "whisper failed: {}",
                stderr.trim()
            )));
        }

        let stem = audio_path.file_stem().unwrap_or_default().to_string_lossy();
        let json_path = output_dir.join(format!("{}.json", stem));

        let json_content = tokio::fs::read_to_string(&json_path).await.map_err(|e| {
            CaptureError::ServiceUnavailable(format!("failed to read whisper output: {}", e))
        })?;

        parse_whisper_output(&json_content)
    }
}

#[async_trait]
impl Capture for WhisperCapture {
    fn name(&self) -> &str {
        "whisper"
    }

    async fn listen(&self, language_code: &str) -> Result<String, CaptureError> {
        let temp_dir = tempfile::tempdir()
            .map_err(|e| CaptureError::ServiceUnavailable(format!("failed to create temp dir: {}", e)))?;
        let audio_path = temp_dir.path().join("utterance.wav");

        self.record(&audio_path).await?;

        let whisper = self
            .transcribe(&audio_path, language_code, temp_dir.path())
            .await?;
        debug!(language = %whisper.language, "Utterance transcribed");

        recognized_text(&whisper.text)
    }

    async fn health_check(&self) -> Result<()> {
        Command::new(&self.settings.recorder_path)
            .arg("--version")
            .output()
            .await
            .with_context(|| format!("Recorder '{}' is not installed", self.settings.recorder_path))?;

        let output = Command::new(&self.settings.whisper_path)
            .arg("--help")
            .output()
            .await
            .with_context(|| format!("Whisper '{}' is not installed", self.settings.whisper_path))?;

        if !output.status.success() {
            anyhow::bail!("Whisper health check failed");
        }

        Ok(())
    }
}

fn parse_whisper_output(json: &str) -> Result<WhisperOutput, CaptureError> {
    serde_json::from_str(json)
        .map_err(|e| CaptureError::ServiceUnavailable(format!("failed to parse whisper JSON: {}", e)))
}

/// Blank transcripts mean the audio held no recognizable speech
fn recognized_text(text: &str) -> Result<String, CaptureError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(CaptureError::UnrecognizedSpeech);
    }
    Ok(text.to_string())
}

/// Map translator language codes onto the codes whisper accepts
fn whisper_language(code: &str) -> &str {
    match code {
        "iw" => "he",
        "jw" => "jv",
        _ => code.split('-').next().unwrap_or(code),
    }
}
