//! Append-only conversation log.
//!
//! Transcripts are kept in memory in emission order. Entries are never
//! reordered or deduplicated; the only other mutation is clearing the whole log.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::domain::{LogEntry, PartyId, Transcript};

/// Shared handle to the log of one conversation
#[derive(Debug, Clone, Default)]
pub struct ConversationLog {
    entries: Arc<RwLock<Vec<LogEntry>>>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a transcript to the log
    pub fn append(&self, transcript: Transcript) -> LogEntry {
        let entry = LogEntry::new(transcript);
        self.write().push(entry.clone());
        entry
    }

    /// Replay all entries in order
    pub fn replay(&self) -> Vec<LogEntry> {
        self.read().clone()
    }

    /// Get the last entry spoken by `speaker`
    pub fn last_from(&self, speaker: PartyId) -> Option<LogEntry> {
        self.read()
            .iter()
            .rev()
            .find(|e| e.transcript.speaker == speaker)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.write().clear();
    }

    // A poisoned lock only means a reader panicked; the Vec itself is intact.
    fn read(&self) -> RwLockReadGuard<'_, Vec<LogEntry>> {
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<LogEntry>> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }
}
