//! Events reported by a running conversation session.
//!
//! The session loop is the only emitter, so events arrive in strict per-turn
//! order: `TurnStarted`, then `Transcript` or `TurnFailed`, and finally a single
//! `SessionStopped` after which nothing else is emitted.

use serde::{Deserialize, Serialize};

use super::party::PartyId;
use super::transcript::Transcript;

/// Lifecycle state of a conversation session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No background loop exists
    Idle,

    /// The background loop is taking turns
    Running,

    /// A stop was requested; the loop exits at its next checkpoint
    Stopping,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::Idle
    }
}

impl SessionState {
    /// True while a background loop exists (running or draining)
    pub fn is_active(self) -> bool {
        !matches!(self, Self::Idle)
    }
}

/// An event delivered to the presentation layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A party is being prompted to speak
    TurnStarted { speaker: PartyId },

    /// An utterance was captured and translated
    Transcript(Transcript),

    /// A turn failed and will be retried
    TurnFailed {
        speaker: PartyId,
        description: String,
    },

    /// The loop has exited; the session is about to become idle
    SessionStopped,
}
