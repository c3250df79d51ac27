//! Event delivery to the presentation layer.
//!
//! All callbacks run on the session's background task. Implementations must
//! return quickly and do their own marshalling onto a UI thread if needed.

use tokio::sync::mpsc;

use crate::domain::{PartyId, SessionEvent, Transcript};

/// Receiver of session progress
pub trait EventSink: Send + Sync {
    fn on_turn_started(&self, speaker: PartyId);

    fn on_transcript(&self, transcript: &Transcript);

    fn on_turn_failed(&self, speaker: PartyId, description: &str);

    fn on_session_stopped(&self);
}

/// Forwards every callback as a [`SessionEvent`] over an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl ChannelSink {
    /// Create a sink and the receiver its events arrive on
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, event: SessionEvent) {
        // A dropped receiver means nobody is watching; the session keeps going.
        let _ = self.tx.send(event);
    }
}

impl EventSink for ChannelSink {
    fn on_turn_started(&self, speaker: PartyId) {
        self.send(SessionEvent::TurnStarted { speaker });
    }

    fn on_transcript(&self, transcript: &Transcript) {
        self.send(SessionEvent::Transcript(transcript.clone()));
    }

    fn on_turn_failed(&self, speaker: PartyId, description: &str) {
        self.send(SessionEvent::TurnFailed {
            speaker,
            description: description.to_string(),
        });
    }

    fn on_session_stopped(&self) {
        self.send(SessionEvent::SessionStopped);
    }
}
