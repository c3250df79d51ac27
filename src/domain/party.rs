//! Conversation participants.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::languages::Language;

/// Identity of one of the two participants.
///
/// `First` is party 0 and always opens a session; `Second` is party 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartyId {
    First,
    Second,
}

impl PartyId {
    /// Numeric identity (0 or 1)
    pub fn index(self) -> usize {
        match self {
            Self::First => 0,
            Self::Second => 1,
        }
    }

    /// The party on the other side of the conversation
    pub fn other(self) -> Self {
        match self {
            Self::First => Self::Second,
            Self::Second => Self::First,
        }
    }

    /// Prompt shown while this party is expected to speak
    pub fn prompt(self) -> String {
        format!("{} Person Say Something", self)
    }
}

impl fmt::Display for PartyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::First => write!(f, "First"),
            Self::Second => write!(f, "Second"),
        }
    }
}

/// Prompt shown while no session is running
pub fn idle_prompt(conversation_empty: bool) -> String {
    format!(
        "Click on the MIC to {} conversation",
        if conversation_empty { "start" } else { "continue" }
    )
}

/// A fully resolved participant: language plus the voice used to speak to them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    pub id: PartyId,

    /// Language this party speaks (and hears)
    pub language: Language,

    /// Synthesizer voice used when speaking to this party
    pub voice_id: String,
}

impl Party {
    pub fn new(id: PartyId, language: Language, voice_id: impl Into<String>) -> Self {
        Self {
            id,
            language,
            voice_id: voice_id.into(),
        }
    }
}

/// One entry of a synthesizer's voice catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceEntry {
    /// Identifier passed back to the synthesizer
    pub voice_id: String,

    /// Human-readable name, e.g. "Tamil" or "English (Great Britain)"
    pub display_name: String,

    /// Language tags reported by the synthesizer (may be empty)
    #[serde(default)]
    pub languages: Vec<String>,
}

impl VoiceEntry {
    pub fn new(voice_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            voice_id: voice_id.into(),
            display_name: display_name.into(),
            languages: Vec::new(),
        }
    }

    pub fn with_languages(mut self, languages: Vec<String>) -> Self {
        self.languages = languages;
        self
    }

    /// Case-insensitive substring match of `label` against the display metadata
    pub fn matches_language(&self, label: &str) -> bool {
        let needle = label.trim().to_lowercase();
        if needle.is_empty() {
            return false;
        }

        self.display_name.to_lowercase().contains(&needle)
            || self
                .languages
                .iter()
                .any(|tag| tag.to_lowercase().contains(&needle))
    }
}
