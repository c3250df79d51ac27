//! babeltalk - Spoken two-way translation between two people
//!
//! Two people who speak different languages take turns: the current speaker
//! is recorded and transcribed, the text is translated, and the translation
//! is spoken aloud to the other person, who then speaks next.
//!
//! # Architecture
//!
//! The conversation runs as a turn loop on a background task:
//! - Each turn is listen → translate → log → speak
//! - Per-turn failures prompt the same speaker again; they never end the session
//! - Stopping is cooperative: the loop checks for a stop between blocking calls
//!
//! # Modules
//!
//! - `adapters`: Capture, Translate and Synthesize capabilities (whisper, Google, espeak)
//! - `core`: Orchestration logic (ConversationSession, TurnPipeline, ConversationLog)
//! - `domain`: Data structures (Party, Transcript, SessionEvent, languages)
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Talk between English and Tamil speakers
//! babeltalk talk --first english --second tamil
//!
//! # Which voice would be used for a language?
//! babeltalk voices --language tamil
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;

// Re-export main types at crate root for convenience
pub use adapters::{Capture, CaptureError, Synthesize, SynthesisError, Translate, TranslateError};
pub use core::{
    ChannelSink, ConversationLog, ConversationSession, EventSink, RetryPolicy, SessionError,
    StartOutcome, TurnError, TurnOutcome, TurnPipeline,
};
pub use domain::{Language, Party, PartyId, SessionEvent, SessionState, Transcript, VoiceEntry};
