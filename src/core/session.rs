//! Conversation session lifecycle.
//!
//! `ConversationSession` is the foreground handle: it resolves voices, spawns
//! the background loop and requests stops. The loop itself (`SessionLoop`) owns
//! the current speaker and is never touched from outside its task.

use std::sync::{Arc, Mutex, MutexGuard};

use thiserror::Error;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::adapters::SynthesisError;
use crate::domain::{Language, Party, PartyId, SessionState};

use super::log::ConversationLog;
use super::pipeline::{RetryPolicy, TurnOutcome, TurnPipeline};
use super::voices::resolve_voice;

/// Errors that keep a session from starting
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Voice for {} is not installed", .language.to_uppercase())]
    VoiceUnavailable { language: String },

    #[error("Voice catalog unavailable: {0}")]
    VoiceCatalog(String),
}

impl From<SynthesisError> for SessionError {
    fn from(err: SynthesisError) -> Self {
        match err {
            SynthesisError::VoiceUnavailable(language) => Self::VoiceUnavailable { language },
            SynthesisError::Catalog(detail) | SynthesisError::Playback(detail) => {
                Self::VoiceCatalog(detail)
            }
        }
    }
}

/// Result of a successful `start()` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// A new background loop was spawned
    Started { session_id: Uuid },

    /// A loop was already active; nothing changed
    AlreadyRunning { session_id: Uuid },
}

impl StartOutcome {
    pub fn session_id(&self) -> Uuid {
        match self {
            Self::Started { session_id } | Self::AlreadyRunning { session_id } => *session_id,
        }
    }
}

enum Lifecycle {
    Idle,
    Active {
        session_id: Uuid,
        cancel: CancellationToken,
    },
}

struct Shared {
    lifecycle: Mutex<Lifecycle>,
    state: watch::Sender<SessionState>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Return to Idle if `session_id` is still the active loop
    fn finish(&self, session_id: Uuid) {
        let mut lifecycle = self.lock();
        if matches!(&*lifecycle, Lifecycle::Active { session_id: id, .. } if *id == session_id) {
            *lifecycle = Lifecycle::Idle;
            self.state.send_replace(SessionState::Idle);
        }
    }
}

/// Foreground handle to a two-party conversation.
///
/// Cloning shares the same session. `start` and `stop` may be called at any
/// time and any number of times.
#[derive(Clone)]
pub struct ConversationSession {
    pipeline: TurnPipeline,
    languages: Arc<Mutex<[Language; 2]>>,
    retry_policy: RetryPolicy,
    shared: Arc<Shared>,
}

impl ConversationSession {
    /// Create an idle session for two languages
    pub fn new(pipeline: TurnPipeline, first: Language, second: Language) -> Self {
        let (state, _) = watch::channel(SessionState::Idle);

        Self {
            pipeline,
            languages: Arc::new(Mutex::new([first, second])),
            retry_policy: RetryPolicy::default(),
            shared: Arc::new(Shared {
                lifecycle: Mutex::new(Lifecycle::Idle),
                state,
            }),
        }
    }

    /// Use a custom back-off between failed turns
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Change a party's language. Takes effect on the next `start()`.
    pub fn set_language(&self, party: PartyId, language: Language) {
        let mut languages = self.languages.lock().unwrap_or_else(|e| e.into_inner());
        info!(party = %party, language = %language, "Language selected");
        languages[party.index()] = language;
    }

    /// Currently selected languages, in party order
    pub fn languages(&self) -> [Language; 2] {
        self.languages.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Resolve both voices and spawn the background loop.
    ///
    /// Fails with `VoiceUnavailable` before anything is spawned when a party's
    /// language has no installed voice. Must be called within a tokio runtime.
    ///
    /// While a stopped loop is still draining (`Stopping`) this returns
    /// `AlreadyRunning` and does not schedule a restart. Call `wait_idle()`
    /// first to start a fresh session after `stop()`.
    #[instrument(skip(self))]
    pub async fn start(&self) -> Result<StartOutcome, SessionError> {
        if let Some(session_id) = self.active_session() {
            debug!(%session_id, "Session already running");
            return Ok(StartOutcome::AlreadyRunning { session_id });
        }

        let parties = self.resolve_parties().await?;
        Ok(self.launch(parties))
    }

    /// Request the loop to stop at its next checkpoint.
    ///
    /// Never waits for the loop. Returns whether a loop was active.
    pub fn stop(&self) -> bool {
        let lifecycle = self.shared.lock();
        match &*lifecycle {
            Lifecycle::Idle => {
                debug!("Stop requested while idle");
                false
            }
            Lifecycle::Active { session_id, cancel } => {
                if !cancel.is_cancelled() {
                    info!(%session_id, "Stop requested");
                    cancel.cancel();
                    self.shared.state.send_replace(SessionState::Stopping);
                }
                true
            }
        }
    }

    pub fn state(&self) -> SessionState {
        *self.shared.state.borrow()
    }

    /// Watch lifecycle transitions
    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.shared.state.subscribe()
    }

    /// Wait until no loop is active
    pub async fn wait_idle(&self) {
        let mut rx = self.shared.state.subscribe();
        // The sender lives in `self.shared`, so this cannot observe a closed channel.
        let _ = rx.wait_for(|state| *state == SessionState::Idle).await;
    }

    /// Transcripts of this conversation, in emission order
    pub fn log(&self) -> &ConversationLog {
        self.pipeline.log()
    }

    /// Forget the conversation so far
    pub fn clear_log(&self) {
        self.pipeline.log().clear();
    }

    fn active_session(&self) -> Option<Uuid> {
        match &*self.shared.lock() {
            Lifecycle::Idle => None,
            Lifecycle::Active { session_id, .. } => Some(*session_id),
        }
    }

    async fn resolve_parties(&self) -> Result<[Party; 2], SessionError> {
        let [first, second] = self.languages();
        let catalog = self.pipeline.synthesizer().voices().await?;

        let first_voice = resolve_voice(&catalog, &first.label)?.voice_id.clone();
        let second_voice = resolve_voice(&catalog, &second.label)?.voice_id.clone();

        Ok([
            Party::new(PartyId::First, first, first_voice),
            Party::new(PartyId::Second, second, second_voice),
        ])
    }

    fn launch(&self, parties: [Party; 2]) -> StartOutcome {
        let mut lifecycle = self.shared.lock();

        // Another start() may have won while voices were being resolved.
        if let Lifecycle::Active { session_id, .. } = &*lifecycle {
            return StartOutcome::AlreadyRunning {
                session_id: *session_id,
            };
        }

        let session_id = Uuid::new_v4();
        let cancel = CancellationToken::new();

        info!(
            %session_id,
            first = %parties[0].language,
            first_voice = %parties[0].voice_id,
            second = %parties[1].language,
            second_voice = %parties[1].voice_id,
            "Starting conversation"
        );

        let session_loop = SessionLoop {
            session_id,
            parties,
            current: PartyId::First,
            pipeline: self.pipeline.clone(),
            retry_policy: self.retry_policy.clone(),
            cancel: cancel.clone(),
            shared: Arc::clone(&self.shared),
        };

        *lifecycle = Lifecycle::Active { session_id, cancel };
        self.shared.state.send_replace(SessionState::Running);
        tokio::spawn(session_loop.run());

        StartOutcome::Started { session_id }
    }
}

/// Returns the session to Idle when the loop ends, including by unwinding
struct IdleGuard {
    shared: Arc<Shared>,
    session_id: Uuid,
}

impl Drop for IdleGuard {
    fn drop(&mut self) {
        self.shared.finish(self.session_id);
    }
}

/// The background turn loop; single owner of the current speaker
struct SessionLoop {
    session_id: Uuid,
    parties: [Party; 2],
    current: PartyId,
    pipeline: TurnPipeline,
    retry_policy: RetryPolicy,
    cancel: CancellationToken,
    shared: Arc<Shared>,
}

impl SessionLoop {
    #[instrument(skip_all, fields(session_id = %self.session_id))]
    async fn run(mut self) {
        let _idle = IdleGuard {
            shared: Arc::clone(&self.shared),
            session_id: self.session_id,
        };

        let mut turns = 0u64;
        let mut failures = 0u32;

        loop {
            if self.cancel.is_cancelled() {
                debug!("Stop observed before listening");
                break;
            }

            let speaker = &self.parties[self.current.index()];
            let listener = &self.parties[self.current.other().index()];
            let outcome = self.pipeline.run_turn(speaker, listener, &self.cancel).await;

            match outcome {
                TurnOutcome::Advance(_) => {
                    turns += 1;
                    failures = 0;
                    self.current = self.current.other();
                }
                TurnOutcome::Retry(_) => {
                    failures = failures.saturating_add(1);
                    let delay = self.retry_policy.delay_for_attempt(failures);
                    if !delay.is_zero() {
                        warn!(failures, delay_ms = delay.as_millis() as u64, "Backing off before retry");
                        tokio::select! {
                            _ = tokio::time::sleep(delay) => {}
                            _ = self.cancel.cancelled() => {}
                        }
                    }
                }
                TurnOutcome::Cancelled => break,
            }
        }

        self.pipeline.sink().on_session_stopped();
        info!(turns, "Conversation stopped");
    }
}
