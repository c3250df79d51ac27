//! One conversational turn: listen, translate, log, speak.
//!
//! Every capability failure is caught here and turned into a `Retry` outcome
//! plus a `TurnFailed` event, so nothing a capability does can end the session.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::adapters::{Capture, CaptureError, Synthesize, SynthesisError, Translate, TranslateError};
use crate::domain::{Party, Transcript};

use super::log::ConversationLog;
use super::sink::EventSink;

/// A recoverable failure inside one turn.
///
/// The display string is what the user sees as an alert.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TurnError {
    #[error("Incomprehensible Audio")]
    UnrecognizedSpeech,

    #[error("Unrecognizable Audio")]
    RecognitionServiceUnavailable(String),

    #[error("Translation unavailable: {0}")]
    TranslationServiceUnavailable(String),

    #[error("{0}")]
    Synthesis(SynthesisError),
}

impl From<CaptureError> for TurnError {
    fn from(err: CaptureError) -> Self {
        match err {
            CaptureError::UnrecognizedSpeech => Self::UnrecognizedSpeech,
            CaptureError::ServiceUnavailable(detail) => Self::RecognitionServiceUnavailable(detail),
        }
    }
}

impl From<TranslateError> for TurnError {
    fn from(err: TranslateError) -> Self {
        match err {
            TranslateError::ServiceUnavailable(detail) => Self::TranslationServiceUnavailable(detail),
        }
    }
}

impl From<SynthesisError> for TurnError {
    fn from(err: SynthesisError) -> Self {
        Self::Synthesis(err)
    }
}

/// How a turn ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The translation was spoken; the other party speaks next
    Advance(Transcript),

    /// Something failed; the same party speaks again
    Retry(TurnError),

    /// A stop was observed at a checkpoint
    Cancelled,
}

/// Back-off between consecutive failed turns.
///
/// Retries are unbounded; only the wait grows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Delay after the first failure in milliseconds
    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,

    /// Maximum delay between retries in milliseconds
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,

    /// Backoff multiplier (delay *= multiplier after each retry)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

fn default_initial_delay() -> u64 {
    250
}
fn default_max_delay() -> u64 {
    5000
}
fn default_backoff_multiplier() -> f64 {
    2.0
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay(),
            max_delay_ms: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

impl RetryPolicy {
    /// Retry immediately, used by tests and scripted sessions
    pub fn immediate() -> Self {
        Self {
            initial_delay_ms: 0,
            max_delay_ms: 0,
            backoff_multiplier: 1.0,
        }
    }

    /// Calculate delay after `failures` consecutive failures (1-indexed)
    pub fn delay_for_attempt(&self, failures: u32) -> Duration {
        if failures <= 1 {
            return Duration::from_millis(self.initial_delay_ms.min(self.max_delay_ms));
        }

        let delay = self.initial_delay_ms as f64
            * self.backoff_multiplier.powi((failures - 1) as i32);

        let capped = delay.min(self.max_delay_ms as f64) as u64;
        Duration::from_millis(capped)
    }
}

/// Runs turns against one set of capabilities
#[derive(Clone)]
pub struct TurnPipeline {
    capture: Arc<dyn Capture>,
    translator: Arc<dyn Translate>,
    synthesizer: Arc<dyn Synthesize>,
    sink: Arc<dyn EventSink>,
    log: ConversationLog,
}

impl TurnPipeline {
    pub fn new(
        capture: Arc<dyn Capture>,
        translator: Arc<dyn Translate>,
        synthesizer: Arc<dyn Synthesize>,
        sink: Arc<dyn EventSink>,
        log: ConversationLog,
    ) -> Self {
        Self {
            capture,
            translator,
            synthesizer,
            sink,
            log,
        }
    }

    pub fn synthesizer(&self) -> &Arc<dyn Synthesize> {
        &self.synthesizer
    }

    pub fn sink(&self) -> &Arc<dyn EventSink> {
        &self.sink
    }

    pub fn log(&self) -> &ConversationLog {
        &self.log
    }

    /// Execute one turn for `speaker`, speaking the translation to `listener`
    #[instrument(skip_all, fields(speaker = %speaker.id, language = %speaker.language.code))]
    pub async fn run_turn(
        &self,
        speaker: &Party,
        listener: &Party,
        cancel: &CancellationToken,
    ) -> TurnOutcome {
        let turn_start = Instant::now();
        self.sink.on_turn_started(speaker.id);

        let heard = self.capture.listen(&speaker.language.code).await;

        if cancel.is_cancelled() {
            debug!("Stop requested while listening");
            return TurnOutcome::Cancelled;
        }

        let original = match heard {
            Ok(text) => text,
            Err(e) => return self.fail(speaker, e.into()),
        };

        let translated = match self
            .translator
            .translate(&original, &speaker.language.code, &listener.language.code)
            .await
        {
            Ok(text) => text,
            Err(e) => return self.fail(speaker, e.into()),
        };

        let transcript = Transcript::new(speaker.id, original, translated);
        self.log.append(transcript.clone());
        self.sink.on_transcript(&transcript);

        if cancel.is_cancelled() {
            debug!("Stop requested before speaking");
            return TurnOutcome::Cancelled;
        }

        if let Err(e) = self
            .synthesizer
            .speak(&transcript.translated, &listener.voice_id)
            .await
        {
            return self.fail(speaker, e.into());
        }

        info!(
            duration_ms = turn_start.elapsed().as_millis() as u64,
            "Turn completed"
        );
        TurnOutcome::Advance(transcript)
    }

    fn fail(&self, speaker: &Party, error: TurnError) -> TurnOutcome {
        warn!(error = ?error, "Turn failed, prompting {} party again", speaker.id);
        self.sink.on_turn_failed(speaker.id, &error.to_string());
        TurnOutcome::Retry(error)
    }
}
