//! Domain types for a two-party conversation.
//!
//! This module contains the core data structures:
//! - Party: who is speaking, in which language, with which voice
//! - Events: what the session reports to the presentation layer
//! - Transcript: one translated utterance and its log entry
//! - Languages: the supported language table

pub mod events;
pub mod languages;
pub mod party;
pub mod transcript;

// Re-export commonly used types
pub use events::{SessionEvent, SessionState};
pub use languages::{lookup_language, supported_languages, Language};
pub use party::{idle_prompt, Party, PartyId, VoiceEntry};
pub use transcript::{LogEntry, Transcript};
