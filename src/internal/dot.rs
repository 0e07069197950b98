//! The `dot` module contains the conversion of NFAs and DFA snapshots to the graphviz dot format.

use std::io::Write;

use dot_writer::{Attributes, DotWriter, RankDirection};

use crate::export::AutomatonSnapshot;

use super::{Direction, Nfa};

/// Render the transitions of one direction of the NFA to a graphviz dot format.
pub(crate) fn nfa_render<W: Write>(nfa: &Nfa, direction: Direction, label: &str, output: &mut W) {
    let mut writer = DotWriter::from(output);
    writer.set_pretty_print(true);
    let mut digraph = writer.digraph();
    digraph
        .set_label(label)
        .set_rank_direction(RankDirection::LeftRight);
    let entries: Vec<_> = (0..nfa.entry_count(direction))
        .flat_map(|offset| {
            [
                nfa.entry(direction, true, offset).target(),
                nfa.entry(direction, false, offset).target(),
            ]
        })
        .collect();
    for state in nfa.states() {
        let source_id = {
            let mut source_node = digraph.node_auto();
            source_node.set_label(&state.id().as_usize().to_string());
            if entries.contains(&state.id()) {
                source_node
                    .set_shape(dot_writer::Shape::Circle)
                    .set_color(dot_writer::Color::Blue)
                    .set_pen_width(3.0);
            }
            if state.is_final(direction) {
                let kind = if state.is_anchored_final(direction) {
                    "$"
                } else {
                    "*"
                };
                source_node
                    .set_shape(dot_writer::Shape::Circle)
                    .set_color(dot_writer::Color::Red)
                    .set_pen_width(3.0)
                    .set_label(&format!("{}\n{}", state.id(), kind));
            }
            source_node.id()
        };
        for transition in nfa.transitions_of(state.id(), direction) {
            let mut label = match transition.pattern() {
                Some(pattern) => format!("accept {}", pattern),
                None => transition.matcher().to_string().escape_default().to_string(),
            };
            for update in transition.group_updates() {
                label.push(' ');
                label.push_str(&update.to_string());
            }
            digraph
                .edge(
                    source_id.clone(),
                    &format!("node_{}", transition.target().as_usize()),
                )
                .attributes()
                .set_label(&label);
        }
    }
}

/// Render the realized states of a DFA to a graphviz dot format.
///
/// With `merge_final_states` anchored and unanchored final states are drawn alike. Otherwise
/// the label of a final state tells whether it accepts only at the end of the input (`$`),
/// anywhere (`*`) or both.
pub(crate) fn snapshot_render<W: Write>(
    snapshot: &AutomatonSnapshot,
    label: &str,
    merge_final_states: bool,
    output: &mut W,
) {
    let mut writer = DotWriter::from(output);
    writer.set_pretty_print(true);
    let mut digraph = writer.digraph();
    digraph
        .set_label(label)
        .set_rank_direction(RankDirection::LeftRight);
    for state in &snapshot.states {
        let mut source_node = digraph.node_auto();
        source_node.set_label(&state.id.to_string());
        if snapshot.is_entry(state.id) {
            source_node
                .set_shape(dot_writer::Shape::Circle)
                .set_color(dot_writer::Color::Blue)
                .set_pen_width(3.0);
        }
        if state.anchored_final || state.unanchored_final {
            let kind = match (
                merge_final_states,
                state.anchored_final,
                state.unanchored_final,
            ) {
                (true, _, _) => "final",
                (false, true, true) => "$ *",
                (false, true, false) => "$",
                (false, false, _) => "*",
            };
            let pattern = state
                .accept_pattern
                .and_then(|p| snapshot.patterns.get(p))
                .map_or(String::new(), |p| p.escape_default().to_string());
            source_node
                .set_color(dot_writer::Color::Red)
                .set_pen_width(3.0)
                .set_label(&format!("{}\n{}\n'{}'", state.id, kind, pattern));
        }
    }
    for state in &snapshot.states {
        for transition in &state.transitions {
            digraph
                .edge(
                    &format!("node_{}", state.id),
                    &format!("node_{}", transition.target),
                )
                .attributes()
                .set_label(&transition.label.escape_default().to_string());
        }
    }
}
