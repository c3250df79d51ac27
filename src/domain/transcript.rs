//! Translated utterances and the entries of the conversation log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::party::PartyId;

/// One captured utterance together with its translation.
///
/// `original` is kept verbatim so both texts can be shown side by side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    /// Who spoke
    pub speaker: PartyId,

    /// Text as recognized in the speaker's language
    pub original: String,

    /// Text in the listener's language
    pub translated: String,
}

impl Transcript {
    pub fn new(speaker: PartyId, original: impl Into<String>, translated: impl Into<String>) -> Self {
        Self {
            speaker,
            original: original.into(),
            translated: translated.into(),
        }
    }

    /// Line shown in the conversation view: `translated [original]`
    pub fn display_line(&self) -> String {
        format!("{} [{}]", self.translated, self.original)
    }
}

/// A transcript as recorded in the conversation log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// Unique identifier for this entry
    pub id: Uuid,

    /// When the transcript was appended
    pub timestamp: DateTime<Utc>,

    pub transcript: Transcript,
}

impl LogEntry {
    /// Create a new entry with the current timestamp
    pub fn new(transcript: Transcript) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            transcript,
        }
    }
}
