//! Conversation orchestration.
//!
//! This module contains:
//! - ConversationLog: Append-only transcript log
//! - TurnPipeline: One listen/translate/speak turn
//! - ConversationSession: Start/stop lifecycle and the background turn loop
//! - EventSink: Progress callbacks for the presentation layer

pub mod log;
pub mod pipeline;
pub mod session;
pub mod sink;
pub mod voices;

// Re-export commonly used types
pub use log::ConversationLog;
pub use pipeline::{RetryPolicy, TurnError, TurnOutcome, TurnPipeline};
pub use session::{ConversationSession, SessionError, StartOutcome};
pub use sink::{ChannelSink, EventSink};
pub use voices::resolve_voice;
