//! Read-only views of realized automata and the sinks that write them out.
//!
//! A [AutomatonSnapshot] is taken with [crate::CompiledAutomaton::snapshot]. It only contains
//! the states that have been built so far; call [crate::CompiledAutomaton::materialize] first
//! to see the whole automaton.

use std::io::Write;

use crate::{Direction, Result};

/// An entry of the automaton: the DFA states an attempt starts in.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SnapshotEntry {
    /// The entry offset, i.e. the number of code points consumed before the match position.
    pub offset: usize,
    /// The state used when the traversal starts at the boundary of the input.
    pub anchored: usize,
    /// The state used everywhere else.
    pub unanchored: usize,
}

/// A realized transition.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SnapshotTransition {
    /// The code point ranges the transition consumes, inclusive.
    pub ranges: Vec<(u32, u32)>,
    /// A printable form of the ranges.
    pub label: String,
    /// The target state.
    pub target: usize,
}

/// A realized DFA state.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SnapshotState {
    /// The id of the state.
    pub id: usize,
    /// The NFA states the DFA state stands for, in priority order.
    pub nfa_states: Vec<usize>,
    /// A member accepts at the end of the input.
    pub anchored_final: bool,
    /// A member accepts at any position.
    pub unanchored_final: bool,
    /// The pattern that is accepted in this state.
    pub accept_pattern: Option<usize>,
    /// The outgoing transitions have been computed.
    pub expanded: bool,
    /// The outgoing transitions, empty if the state has not been expanded.
    pub transitions: Vec<SnapshotTransition>,
}

/// A read-only copy of the realized part of a compiled automaton.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AutomatonSnapshot {
    /// The traversal direction.
    pub direction: Direction,
    /// The patterns in priority order.
    pub patterns: Vec<String>,
    /// The entries by offset.
    pub entries: Vec<SnapshotEntry>,
    /// The states by id.
    pub states: Vec<SnapshotState>,
}

impl AutomatonSnapshot {
    /// True if the state is the anchored or unanchored entry of some offset.
    pub fn is_entry(&self, state: usize) -> bool {
        self.entries
            .iter()
            .any(|e| e.anchored == state || e.unanchored == state)
    }

    /// The number of realized transitions.
    pub fn transition_count(&self) -> usize {
        self.states.iter().map(|s| s.transitions.len()).sum()
    }

    /// Checks that at most one transition of every state matches any code point.
    pub fn is_deterministic(&self) -> bool {
        self.states.iter().all(|state| {
            let mut ranges: Vec<(u32, u32)> = state
                .transitions
                .iter()
                .flat_map(|t| t.ranges.iter().copied())
                .collect();
            ranges.sort_unstable();
            ranges.windows(2).all(|w| w[0].1 < w[1].0)
        })
    }
}

/// A sink that writes a snapshot in some output format.
pub trait ExportSink {
    /// Writes the snapshot to the output.
    fn export(&self, snapshot: &AutomatonSnapshot, output: &mut dyn Write) -> Result<()>;
}

/// Writes snapshots in the graphviz dot format.
#[cfg(feature = "dot_writer")]
#[derive(Debug, Clone, Default)]
pub struct DotExporter {
    label: Option<String>,
    merge_final_states: bool,
}

#[cfg(feature = "dot_writer")]
impl DotExporter {
    /// Creates an exporter that draws anchored and unanchored final states differently.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the label of the graph. The default label names the direction and the patterns.
    pub fn with_label(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }

    /// Draws anchored and unanchored final states alike. This only changes the picture, the
    /// automaton matches the same either way.
    pub fn with_merge_final_states(mut self, merge: bool) -> Self {
        self.merge_final_states = merge;
        self
    }

    /// Writes the transitions of one direction of the NFA.
    pub fn export_nfa(
        &self,
        nfa: &crate::Nfa,
        direction: Direction,
        mut output: &mut dyn Write,
    ) -> Result<()> {
        let label = self.label.clone().unwrap_or_else(|| {
            format!(
                "NFA {} {}",
                direction,
                nfa.patterns()
                    .iter()
                    .map(|p| p.pattern().escape_default().to_string())
                    .collect::<Vec<_>>()
                    .join(" | ")
            )
        });
        crate::internal::dot::nfa_render(nfa, direction, &label, &mut output);
        output.flush()?;
        Ok(())
    }
}

#[cfg(feature = "dot_writer")]
impl ExportSink for DotExporter {
    fn export(&self, snapshot: &AutomatonSnapshot, mut output: &mut dyn Write) -> Result<()> {
        let label = self.label.clone().unwrap_or_else(|| {
            format!(
                "DFA {} {}",
                snapshot.direction,
                snapshot
                    .patterns
                    .iter()
                    .map(|p| p.escape_default().to_string())
                    .collect::<Vec<_>>()
                    .join(" | ")
            )
        });
        crate::internal::dot::snapshot_render(
            snapshot,
            &label,
            self.merge_final_states,
            &mut output,
        );
        output.flush()?;
        Ok(())
    }
}

/// Writes snapshots as JSON tables.
#[cfg(feature = "serde")]
#[derive(Debug, Clone, Default)]
pub struct TableExporter {
    pretty: bool,
}

#[cfg(feature = "serde")]
impl TableExporter {
    /// Creates an exporter that writes compact JSON.
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes indented JSON.
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}

#[cfg(feature = "serde")]
impl ExportSink for TableExporter {
    fn export(&self, snapshot: &AutomatonSnapshot, mut output: &mut dyn Write) -> Result<()> {
        if self.pretty {
            serde_json::to_writer_pretty(&mut output, snapshot).map_err(std::io::Error::from)?;
        } else {
            serde_json::to_writer(&mut output, snapshot).map_err(std::io::Error::from)?;
        }
        output.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> AutomatonSnapshot {
        AutomatonSnapshot {
            direction: Direction::Forward,
            patterns: vec!["ab?".to_string()],
            entries: vec![SnapshotEntry {
                offset: 0,
                anchored: 0,
                unanchored: 0,
            }],
            states: vec![
                SnapshotState {
                    id: 0,
                    nfa_states: vec![5],
                    anchored_final: false,
                    unanchored_final: false,
                    accept_pattern: None,
                    expanded: true,
                    transitions: vec![SnapshotTransition {
                        ranges: vec![(97, 97)],
                        label: "a".to_string(),
                        target: 1,
                    }],
                },
                SnapshotState {
                    id: 1,
                    nfa_states: vec![9, 10],
                    anchored_final: false,
                    unanchored_final: true,
                    accept_pattern: Some(0),
                    expanded: false,
                    transitions: Vec::new(),
                },
            ],
        }
    }

    #[test]
    fn test_snapshot_queries() {
        let snapshot = snapshot();
        assert!(snapshot.is_entry(0));
        assert!(!snapshot.is_entry(1));
        assert_eq!(snapshot.transition_count(), 1);
        assert!(snapshot.is_deterministic());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_table_export() {
        let mut output = Vec::new();
        TableExporter::new()
            .export(&snapshot(), &mut output)
            .unwrap();
        let read: AutomatonSnapshot = serde_json::from_slice(&output).unwrap();
        assert_eq!(read, snapshot());
    }

    #[cfg(feature = "dot_writer")]
    #[test]
    fn test_dot_export() {
        let mut merged = Vec::new();
        DotExporter::new()
            .with_merge_final_states(true)
            .export(&snapshot(), &mut merged)
            .unwrap();
        let merged = String::from_utf8(merged).unwrap();
        assert!(merged.contains("digraph"));
        assert!(merged.contains("final"));

        let mut plain = Vec::new();
        DotExporter::new().export(&snapshot(), &mut plain).unwrap();
        let plain = String::from_utf8(plain).unwrap();
        assert!(!plain.contains("final"));
        assert!(plain.contains("node_0 -> node_1"));
    }
}
