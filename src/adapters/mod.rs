//! Capability interfaces for capture, translation and synthesis.
//!
//! The conversation core only sees these traits; the concrete adapters shell
//! out to local tools (sox, whisper, espeak-ng) or call a translation API.

pub mod espeak;
pub mod google;
pub mod whisper;

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

use crate::domain::VoiceEntry;

pub use espeak::EspeakSynthesizer;
pub use google::GoogleTranslator;
pub use whisper::WhisperCapture;

/// Errors raised while capturing an utterance
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    /// Audio was captured but could not be mapped to text
    #[error("speech could not be recognized")]
    UnrecognizedSpeech,

    /// The recorder or the recognizer could not be reached
    #[error("recognition service unavailable: {0}")]
    ServiceUnavailable(String),
}

/// Errors raised by a translator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslateError {
    #[error("translation service unavailable: {0}")]
    ServiceUnavailable(String),
}

/// Errors raised by a speech synthesizer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SynthesisError {
    /// No installed voice matches the requested language
    #[error("Voice for {} is not installed", .0.to_uppercase())]
    VoiceUnavailable(String),

    /// Rendering or playback failed
    #[error("Speech playback failed: {0}")]
    Playback(String),

    /// The voice catalog could not be enumerated
    #[error("voice catalog unavailable: {0}")]
    Catalog(String),
}

/// Captures one utterance from the live audio input
#[async_trait]
pub trait Capture: Send + Sync {
    /// Human-readable adapter name
    fn name(&self) -> &str;

    /// Wait for one utterance and return it as text in `language_code`
    async fn listen(&self, language_code: &str) -> Result<String, CaptureError>;

    /// Check that the underlying tools are installed
    async fn health_check(&self) -> Result<()>;
}

/// Translates text between two language codes
#[async_trait]
pub trait Translate: Send + Sync {
    fn name(&self) -> &str;

    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<String, TranslateError>;

    async fn health_check(&self) -> Result<()>;
}

/// Renders text as speech and owns the voice catalog
#[async_trait]
pub trait Synthesize: Send + Sync {
    fn name(&self) -> &str;

    /// Enumerate installed voices, in the synthesizer's own order
    async fn voices(&self) -> Result<Vec<VoiceEntry>, SynthesisError>;

    /// Speak `text` with `voice_id`, returning once playback has finished
    async fn speak(&self, text: &str, voice_id: &str) -> Result<(), SynthesisError>;

    async fn health_check(&self) -> Result<()>;
}
