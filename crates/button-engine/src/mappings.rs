//! In-memory mapping table compiled from store records.

use std::{cmp::Reverse, collections::HashMap};

use button_store::ButtonRecord;
use mousetap::ButtonKey;
use serde::Serialize;
use tracing::{debug, warn};

/// One sequence binding.
#[derive(Debug, Clone, Serialize)]
pub struct SequenceMapping {
    /// Ordered button presses that trigger the action.
    pub sequence: Vec<ButtonKey>,
    /// Action to execute.
    pub action: String,
    /// Display name from the record.
    pub name: String,
}

/// Result of probing press history against the table.
pub(crate) struct SequenceProbe<'a> {
    /// The longest sequence the history matches exactly, if any.
    pub exact: Option<&'a SequenceMapping>,
    /// Whether the history is a proper prefix of any sequence.
    pub prefix: bool,
}

/// Immutable lookup structure for single and sequence bindings.
///
/// Singles are last-wins per button; sequences are kept sorted longest
/// first so an exact-match probe prefers the most specific binding.
#[derive(Debug, Default, Clone)]
pub struct MappingTable {
    singles: HashMap<ButtonKey, String>,
    sequences: Vec<SequenceMapping>,
}

impl MappingTable {
    /// Compile a table from store records.
    ///
    /// Records with a blank action are skipped with a warning; a record
    /// carrying both trigger kinds cannot exist (the store rejects it) but
    /// is tolerated here by preferring the single.
    pub fn from_records(records: &[ButtonRecord]) -> Self {
        let mut singles = HashMap::new();
        let mut sequences = Vec::new();
        for rec in records {
            if rec.action.trim().is_empty() {
                warn!(id = %rec.id, "skipping_record_with_blank_action");
                continue;
            }
            if let Some(key) = rec.key_type {
                singles.insert(key, rec.action.clone());
            } else if let Some(seq) = &rec.sequence {
                if seq.is_empty() {
                    warn!(id = %rec.id, "skipping_record_with_empty_sequence");
                    continue;
                }
                sequences.push(SequenceMapping {
                    sequence: seq.clone(),
                    action: rec.action.clone(),
                    name: rec.name.clone(),
                });
            }
        }
        sequences.sort_by_key(|m| Reverse(m.sequence.len()));
        debug!(
            singles = singles.len(),
            sequences = sequences.len(),
            "mapping_table_compiled"
        );
        Self { singles, sequences }
    }

    /// Action bound to a single button, if any.
    pub fn single(&self, key: ButtonKey) -> Option<&str> {
        self.singles.get(&key).map(String::as_str)
    }

    /// All single bindings.
    pub fn singles(&self) -> &HashMap<ButtonKey, String> {
        &self.singles
    }

    /// All sequence bindings, longest first.
    pub fn sequences(&self) -> &[SequenceMapping] {
        &self.sequences
    }

    /// Whether the table binds nothing at all.
    pub fn is_empty(&self) -> bool {
        self.singles.is_empty() && self.sequences.is_empty()
    }

    /// Match press history against the sequence bindings.
    ///
    /// `exact` is the first sequence the history equals outright (bindings
    /// are ordered longest first, so a longer exact match is never shadowed
    /// by a shorter one); `prefix` is set when the history is a proper
    /// prefix of some sequence, meaning more presses could still complete
    /// it.
    pub(crate) fn probe(&self, history: &[ButtonKey]) -> SequenceProbe<'_> {
        let exact = self
            .sequences
            .iter()
            .find(|m| m.sequence.as_slice() == history);
        let prefix = self
            .sequences
            .iter()
            .any(|m| m.sequence.len() > history.len() && m.sequence.starts_with(history));
        SequenceProbe { exact, prefix }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec_single(key: ButtonKey, action: &str) -> ButtonRecord {
        ButtonRecord {
            id: format!("test_{key}"),
            name: String::new(),
            action: action.into(),
            key_type: Some(key),
            sequence: None,
            icon: String::new(),
            order: 0,
            created_at: None,
            updated_at: None,
        }
    }

    fn rec_seq(seq: &[ButtonKey], action: &str) -> ButtonRecord {
        ButtonRecord {
            id: format!("test_seq_{}", seq.len()),
            name: String::new(),
            action: action.into(),
            key_type: None,
            sequence: Some(seq.to_vec()),
            icon: String::new(),
            order: 0,
            created_at: None,
            updated_at: None,
        }
    }

    use ButtonKey::{Side1, Side2};

    #[test]
    fn singles_are_last_wins() {
        let table = MappingTable::from_records(&[
            rec_single(Side1, "a"),
            rec_single(Side1, "b"),
        ]);
        assert_eq!(table.single(Side1), Some("b"));
        assert_eq!(table.single(Side2), None);
    }

    #[test]
    fn blank_actions_are_skipped() {
        let table = MappingTable::from_records(&[rec_single(Side1, "   ")]);
        assert!(table.is_empty());
    }

    #[test]
    fn probe_requires_full_equality() {
        let table = MappingTable::from_records(&[
            rec_seq(&[Side1, Side2], "short"),
            rec_seq(&[Side2, Side1, Side2], "long"),
        ]);
        let probe = table.probe(&[Side2, Side1, Side2]);
        assert_eq!(probe.exact.map(|m| m.action.as_str()), Some("long"));
        let probe = table.probe(&[Side1, Side2]);
        assert_eq!(probe.exact.map(|m| m.action.as_str()), Some("short"));
        // A history with extra leading presses matches nothing.
        let probe = table.probe(&[Side1, Side1, Side2]);
        assert!(probe.exact.is_none());
        assert!(!probe.prefix);
    }

    #[test]
    fn probe_detects_proper_prefixes() {
        let table = MappingTable::from_records(&[rec_seq(&[Side1, Side1, Side2], "x")]);
        assert!(table.probe(&[Side1]).prefix);
        assert!(table.probe(&[Side1, Side1]).prefix);
        let full = table.probe(&[Side1, Side1, Side2]);
        assert!(full.exact.is_some());
        assert!(!full.prefix);
        assert!(!table.probe(&[Side2]).prefix);
    }

    #[test]
    fn empty_sequences_are_skipped_but_singletons_bind() {
        let table = MappingTable::from_records(&[rec_seq(&[], "x")]);
        assert!(table.is_empty());
        let table = MappingTable::from_records(&[rec_seq(&[Side1], "x")]);
        assert!(table.probe(&[Side1]).exact.is_some());
    }
}
