//! espeak-ng speech synthesis.
//!
//! Speaks synchronously by waiting for the espeak process to exit, so the
//! listener hears the whole translation before the next turn starts.

use std::process::Stdio;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::process::Command;

use super::{Synthesize, SynthesisError};
use crate::domain::VoiceEntry;

/// Speech output settings
#[derive(Debug, Clone)]
pub struct SpeechSettings {
    /// Words per minute
    pub rate: u32,

    /// 0.0 (silent) to 2.0; 1.0 is the synthesizer's normal volume
    pub volume: f32,
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            rate: 150,
            volume: 1.0,
        }
    }
}

impl SpeechSettings {
    /// espeak amplitude (0-200, 100 is normal)
    fn amplitude(&self) -> u32 {
        (self.volume.clamp(0.0, 2.0) * 100.0).round() as u32
    }
}

/// Synthesizer backed by the espeak-ng (or espeak) binary
pub struct EspeakSynthesizer {
    binary_path: String,
    settings: SpeechSettings,
}

impl EspeakSynthesizer {
    /// Create a synthesizer with the default binary
    ///
    /// Looks for espeak-ng first, falls back to espeak
    pub fn new(settings: SpeechSettings) -> Self {
        let binary_path = if std::process::Command::new("espeak-ng")
            .arg("--version")
            .output()
            .is_ok()
        {
            "espeak-ng".to_string()
        } else {
            "espeak".to_string()
        };

        Self {
            binary_path,
            settings,
        }
    }

    /// Create a synthesizer with a custom binary path
    pub fn with_binary_path(binary_path: impl Into<String>, settings: SpeechSettings) -> Self {
        Self {
            binary_path: binary_path.into(),
            settings,
        }
    }

    pub fn binary_path(&self) -> &str {
        &self.binary_path
    }
}

#[async_trait]
impl Synthesize for EspeakSynthesizer {
    fn name(&self) -> &str {
        "espeak"
    }

    async fn voices(&self) -> Result<Vec<VoiceEntry>, SynthesisError> {
        let output = Command::new(&self.binary_path)
            .arg("--voices")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                SynthesisError::Catalog(format!("failed to run {}: {}", self.binary_path, e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SynthesisError::Catalog(stderr.trim().to_string()));
        }

        Ok(parse_voice_list(&String::from_utf8_lossy(&output.stdout)))
    }

    async fn speak(&self, text: &str, voice_id: &str) -> Result<(), SynthesisError> {
        if text.trim().is_empty() {
            return Ok(());
        }

        let output = Command::new(&self.binary_path)
            .args(["-v", voice_id])
            .args(["-s", &self.settings.rate.to_string()])
            .args(["-a", &self.settings.amplitude().to_string()])
            .arg("--")
            .arg(text)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                SynthesisError::Playback(format!("failed to run {}: {}", self.binary_path, e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SynthesisError::Playback(format!(
                "{} exited with code {}: {}",
                self.binary_path,
                output.status.code().unwrap_or(-1),
                stderr.trim()
            )));
        }

        Ok(())
    }

    async fn health_check(&self) -> Result<()> {
        let output = Command::new(&self.binary_path)
            .arg("--version")
            .output()
            .await
            .with_context(|| format!("Failed to run {}", self.binary_path))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("{} health check failed: {}", self.binary_path, stderr);
        }

        Ok(())
    }
}

/// Parse `espeak --voices` output.
///
/// Columns: `Pty Language Age/Gender VoiceName File [Other Languages]`.
fn parse_voice_list(output: &str) -> Vec<VoiceEntry> {
    output
        .lines()
        .filter(|line| !line.trim_start().starts_with("Pty"))
        .filter_map(|line| {
            let columns: Vec<&str> = line.split_whitespace().collect();
            if columns.len() < 5 {
                return None;
            }

            let language = columns[1];
            let display_name = columns[3].replace('_', " ");

            let mut languages = vec![language.to_string()];
            languages.extend(
                columns[5..]
                    .iter()
                    .map(|tag| tag.trim_matches(|c| c == '(' || c == ')'))
                    .filter(|tag| !tag.is_empty() && !tag.chars().all(|c| c.is_ascii_digit()))
                    .map(str::to_string),
            );

            Some(VoiceEntry::new(language, display_name).with_languages(languages))
        })
        .collect()
}
