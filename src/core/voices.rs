//! Voice resolution against a synthesizer's catalog.

use crate::adapters::SynthesisError;
use crate::domain::VoiceEntry;

/// Pick the voice for a language label.
///
/// Scans the catalog in order and returns the first entry whose display
/// metadata contains `label` (case-insensitive). The same catalog and label
/// always give the same voice.
pub fn resolve_voice<'a>(
    catalog: &'a [VoiceEntry],
    label: &str,
) -> Result<&'a VoiceEntry, SynthesisError> {
    catalog
        .iter()
        .find(|voice| voice.matches_language(label))
        .ok_or_else(|| SynthesisError::VoiceUnavailable(label.to_string()))
}
