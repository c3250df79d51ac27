//! Configuration for babeltalk.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (BABELTALK_FIRST_LANGUAGE, BABELTALK_SECOND_LANGUAGE,
//!    WHISPER_PATH, BABELTALK_TRANSLATE_URL)
//! 2. Config file (.babeltalk/config.yaml)
//! 3. Defaults (english and tamil, espeak at 150 wpm)
//!
//! Config file discovery:
//! - Searches current directory and parents for .babeltalk/config.yaml
//! - Falls back to ~/.babeltalk/config.yaml

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::adapters::espeak::SpeechSettings;
use crate::adapters::google::DEFAULT_ENDPOINT;
use crate::adapters::whisper::WhisperSettings;
use crate::core::RetryPolicy;
use crate::domain::{lookup_language, Language};

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

const DEFAULT_FIRST_LANGUAGE: &str = "english";
const DEFAULT_SECOND_LANGUAGE: &str = "tamil";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub languages: LanguagesConfig,
    #[serde(default)]
    pub capture: Option<CaptureConfig>,
    #[serde(default)]
    pub translation: Option<TranslationConfig>,
    #[serde(default)]
    pub speech: Option<SpeechConfig>,
    #[serde(default)]
    pub retry: Option<RetryPolicy>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LanguagesConfig {
    /// Language label of the first party
    pub first: Option<String>,
    /// Language label of the second party
    pub second: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CaptureConfig {
    pub recorder: Option<String>,
    pub whisper_path: Option<String>,
    pub model: Option<String>,
    pub silence_seconds: Option<f32>,
    pub max_utterance_seconds: Option<u64>,
    pub transcribe_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranslationConfig {
    pub endpoint: Option<String>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpeechConfig {
    pub binary: Option<String>,
    pub rate: Option<u32>,
    pub volume: Option<f32>,
}

/// Translator settings after defaults are applied
#[derive(Debug, Clone)]
pub struct TranslationSettings {
    pub endpoint: String,
    pub timeout: Duration,
}

impl Default for TranslationSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Resolved configuration
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub first_language: Language,
    pub second_language: Language,
    pub capture: WhisperSettings,
    pub translation: TranslationSettings,
    pub speech: SpeechSettings,
    /// Explicit synthesizer binary; auto-detected when unset
    pub speech_binary: Option<String>,
    pub retry: RetryPolicy,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

/// Find config file by searching current directory and parents, then home
fn find_config_file() -> Option<PathBuf> {
    if let Ok(mut current) = std::env::current_dir() {
        loop {
            let config_path = current.join(".babeltalk").join("config.yaml");
            if config_path.exists() {
                return Some(config_path);
            }

            if !current.pop() {
                break;
            }
        }
    }

    let home_config = dirs::home_dir()?.join(".babeltalk").join("config.yaml");
    home_config.exists().then_some(home_config)
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Look up a configured language label
pub fn parse_language(name: &str) -> Result<Language> {
    lookup_language(name).with_context(|| format!("Unsupported language '{}'", name))
}

/// Merge a parsed config file and environment lookups over the defaults
fn resolve_config<F>(
    file: Option<ConfigFile>,
    config_file: Option<PathBuf>,
    env: F,
) -> Result<ResolvedConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let file_languages = file.as_ref().map(|f| f.languages.clone()).unwrap_or_default();

    let first_name = env("BABELTALK_FIRST_LANGUAGE")
        .or(file_languages.first)
        .unwrap_or_else(|| DEFAULT_FIRST_LANGUAGE.to_string());
    let second_name = env("BABELTALK_SECOND_LANGUAGE")
        .or(file_languages.second)
        .unwrap_or_else(|| DEFAULT_SECOND_LANGUAGE.to_string());

    // Capture settings
    let capture_file = file.as_ref().and_then(|f| f.capture.clone());
    let defaults = WhisperSettings::default();
    let capture = WhisperSettings {
        recorder_path: capture_file
            .as_ref()
            .and_then(|c| c.recorder.clone())
            .unwrap_or(defaults.recorder_path),
        whisper_path: env("WHISPER_PATH")
            .or_else(|| capture_file.as_ref().and_then(|c| c.whisper_path.clone()))
            .unwrap_or(defaults.whisper_path),
        model: capture_file
            .as_ref()
            .and_then(|c| c.model.clone())
            .unwrap_or(defaults.model),
        silence_seconds: capture_file
            .as_ref()
            .and_then(|c| c.silence_seconds)
            .unwrap_or(defaults.silence_seconds),
        max_utterance_seconds: capture_file
            .as_ref()
            .and_then(|c| c.max_utterance_seconds)
            .unwrap_or(defaults.max_utterance_seconds),
        transcribe_timeout: capture_file
            .as_ref()
            .and_then(|c| c.transcribe_timeout_seconds)
            .map(Duration::from_secs)
            .unwrap_or(defaults.transcribe_timeout),
    };

    // Translation settings
    let translation_file = file.as_ref().and_then(|f| f.translation.clone());
    let translation_defaults = TranslationSettings::default();
    let translation = TranslationSettings {
        endpoint: env("BABELTALK_TRANSLATE_URL")
            .or_else(|| translation_file.as_ref().and_then(|t| t.endpoint.clone()))
            .unwrap_or(translation_defaults.endpoint),
        timeout: translation_file
            .as_ref()
            .and_then(|t| t.timeout_seconds)
            .map(Duration::from_secs)
            .unwrap_or(translation_defaults.timeout),
    };

    // Speech settings
    let speech_file = file.as_ref().and_then(|f| f.speech.clone());
    let speech_defaults = SpeechSettings::default();
    let speech = SpeechSettings {
        rate: speech_file
            .as_ref()
            .and_then(|s| s.rate)
            .unwrap_or(speech_defaults.rate),
        volume: speech_file
            .as_ref()
            .and_then(|s| s.volume)
            .unwrap_or(speech_defaults.volume),
    };

    Ok(ResolvedConfig {
        first_language: parse_language(&first_name)?,
        second_language: parse_language(&second_name)?,
        capture,
        translation,
        speech,
        speech_binary: speech_file.and_then(|s| s.binary),
        retry: file.and_then(|f| f.retry).unwrap_or_default(),
        config_file,
    })
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let config_file = find_config_file();

    let file = match config_file {
        Some(ref path) => Some(load_config_file(path)?),
        None => None,
    };

    resolve_config(file, config_file, |key| std::env::var(key).ok())
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| format!("{:#}", e)));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}
