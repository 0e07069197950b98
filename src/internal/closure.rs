//! Epsilon elimination.
//!
//! Every code point consuming edge of the multi-pattern epsilon NFA becomes one position state of
//! the NFA model. The outgoing transitions of a position state (and of the initial states) are
//! collected by a depth first walk over the epsilon edges that visits edges in priority order.
//! In forward direction the walk follows the edges from the target node of the consumed edge, in
//! reverse direction it follows the edges backwards from the source node.
//!
//! The walk visits each pair of node and end-assertion state once, so the first path to a node
//! wins. Group boundaries on the path become the group updates of the produced transition.

use log::trace;
use rustc_hash::FxHashMap;

use crate::{AutomatonConfig, Result};

use super::{
    epsilon_nfa::{Assertion, EdgeKind},
    nfa::NfaBuilder,
    CodePointMatcher, Direction, GroupBoundary, MultiPatternNfa, Nfa, NodeID, PatternID, StateID,
};

/// One consuming edge of the epsilon NFA.
#[derive(Debug, Clone, Copy)]
struct Position {
    source: NodeID,
    edge: usize,
    target: NodeID,
}

/// A transition found by the closure walk.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    Consume {
        position: usize,
        matcher: CodePointMatcher,
        updates: Vec<GroupBoundary>,
    },
    Accept {
        pattern: PatternID,
        anchored: bool,
        updates: Vec<GroupBoundary>,
    },
}

enum Frame {
    Visit {
        node: NodeID,
        // Forward: a `$` was crossed. Reverse: a `^` was crossed.
        passed_end: bool,
        updates: Vec<GroupBoundary>,
    },
    Emit(Step),
}

struct Closure<'a> {
    mp: &'a MultiPatternNfa,
    positions: Vec<Position>,
    // (node, edge index) -> position index
    position_index: FxHashMap<(NodeID, usize), usize>,
    // node -> incoming (source node, edge index), ordered by source node and edge index
    predecessors: Vec<Vec<(NodeID, usize)>>,
}

impl<'a> Closure<'a> {
    fn new(mp: &'a MultiPatternNfa) -> Self {
        let nodes = mp.nfa().nodes();
        let mut positions = Vec::new();
        let mut position_index = FxHashMap::default();
        let mut predecessors = vec![Vec::new(); nodes.len()];
        for node in nodes {
            for (i, edge) in node.edges().iter().enumerate() {
                predecessors[edge.target.as_usize()].push((node.id(), i));
                if edge.kind.is_char() {
                    position_index.insert((node.id(), i), positions.len());
                    positions.push(Position {
                        source: node.id(),
                        edge: i,
                        target: edge.target,
                    });
                }
            }
        }
        Self {
            mp,
            positions,
            position_index,
            predecessors,
        }
    }

    fn visit(node: NodeID, passed_end: bool, updates: Vec<GroupBoundary>) -> Frame {
        Frame::Visit {
            node,
            passed_end,
            updates,
        }
    }

    fn with_update(updates: &[GroupBoundary], update: GroupBoundary) -> Vec<GroupBoundary> {
        let mut updates = updates.to_vec();
        updates.push(update);
        updates
    }

    /// The transitions in forward direction when the walk starts at `start`. `at_start` is true
    /// only for the anchored initial state where `^` holds.
    fn forward(&self, start: NodeID, at_start: bool) -> Vec<Step> {
        let nodes = self.mp.nfa().nodes();
        let mut steps = Vec::new();
        let mut visited = vec![[false; 2]; nodes.len()];
        let mut stack = vec![Self::visit(start, false, Vec::new())];
        while let Some(frame) = stack.pop() {
            let (node, passed_end, updates) = match frame {
                Frame::Emit(step) => {
                    steps.push(step);
                    continue;
                }
                Frame::Visit {
                    node,
                    passed_end,
                    updates,
                } => (node, passed_end, updates),
            };
            let seen = &mut visited[node.as_usize()][passed_end as usize];
            if *seen {
                continue;
            }
            *seen = true;
            // Pushed in reverse so the first edge is processed first
            for (i, edge) in nodes[node].edges().iter().enumerate().rev() {
                match &edge.kind {
                    EdgeKind::Char(matcher) => {
                        if !passed_end {
                            stack.push(Frame::Emit(Step::Consume {
                                position: self.position_index[&(node, i)],
                                matcher: matcher.clone(),
                                updates: updates.clone(),
                            }));
                        }
                    }
                    EdgeKind::Epsilon => {
                        stack.push(Self::visit(edge.target, passed_end, updates.clone()))
                    }
                    EdgeKind::Group(boundary) => stack.push(Self::visit(
                        edge.target,
                        passed_end,
                        Self::with_update(&updates, *boundary),
                    )),
                    EdgeKind::Assert(Assertion::StartText) => {
                        if at_start {
                            stack.push(Self::visit(edge.target, passed_end, updates.clone()))
                        }
                    }
                    EdgeKind::Assert(Assertion::EndText) => {
                        stack.push(Self::visit(edge.target, true, updates.clone()))
                    }
                    EdgeKind::Accept(pattern) => stack.push(Frame::Emit(Step::Accept {
                        pattern: *pattern,
                        anchored: passed_end,
                        updates: updates.clone(),
                    })),
                }
            }
        }
        steps
    }

    /// The transitions in reverse direction when the walk starts at `start` and follows the
    /// edges backwards. `at_end` is true only for the anchored initial state where `$` holds.
    fn reverse(&self, start: NodeID, at_end: bool) -> Vec<Step> {
        let nodes = self.mp.nfa().nodes();
        let root = self.mp.root();
        let mut steps = Vec::new();
        let mut visited = vec![[false; 2]; nodes.len()];
        let mut stack = vec![Self::visit(start, false, Vec::new())];
        while let Some(frame) = stack.pop() {
            let (node, passed_start, updates) = match frame {
                Frame::Emit(step) => {
                    steps.push(step);
                    continue;
                }
                Frame::Visit {
                    node,
                    passed_end,
                    updates,
                } => (node, passed_end, updates),
            };
            let seen = &mut visited[node.as_usize()][passed_start as usize];
            if *seen {
                continue;
            }
            *seen = true;
            for (source, i) in self.predecessors[node.as_usize()].iter().rev() {
                let (source, i) = (*source, *i);
                if source == root {
                    // The start of a pattern is reached, the match is complete
                    stack.push(Frame::Emit(Step::Accept {
                        pattern: self.mp.pattern_of_root_edge(i),
                        anchored: passed_start,
                        updates: updates.clone(),
                    }));
                    continue;
                }
                match &nodes[source].edges()[i].kind {
                    EdgeKind::Char(matcher) => {
                        if !passed_start {
                            stack.push(Frame::Emit(Step::Consume {
                                position: self.position_index[&(source, i)],
                                matcher: matcher.clone(),
                                updates: updates.clone(),
                            }));
                        }
                    }
                    EdgeKind::Epsilon | EdgeKind::Accept(_) => {
                        stack.push(Self::visit(source, passed_start, updates.clone()))
                    }
                    EdgeKind::Group(boundary) => stack.push(Self::visit(
                        source,
                        passed_start,
                        Self::with_update(&updates, *boundary),
                    )),
                    EdgeKind::Assert(Assertion::StartText) => {
                        stack.push(Self::visit(source, true, updates.clone()))
                    }
                    EdgeKind::Assert(Assertion::EndText) => {
                        if at_end {
                            stack.push(Self::visit(source, passed_start, updates.clone()))
                        }
                    }
                }
            }
        }
        steps
    }
}

fn add_steps(
    builder: &mut NfaBuilder,
    source: StateID,
    direction: Direction,
    steps: Vec<Step>,
    position_states: &[StateID],
    max_transitions: usize,
) -> Result<()> {
    if builder.transition_count() + steps.len() > max_transitions {
        return Err(crate::errors::too_large!("NFA transitions", max_transitions));
    }
    for step in steps {
        match step {
            Step::Consume {
                position,
                matcher,
                updates,
            } => {
                builder.add_transition(
                    source,
                    position_states[position],
                    direction,
                    matcher,
                    updates,
                );
            }
            Step::Accept {
                pattern,
                anchored,
                updates,
            } => {
                builder.add_accepting_transition(source, direction, anchored, updates, pattern);
            }
        }
    }
    Ok(())
}

/// Removes the epsilon edges of the multi-pattern NFA and builds the NFA model with one entry
/// offset per direction.
pub(crate) fn build_nfa(mp: &MultiPatternNfa, config: &AutomatonConfig) -> Result<Nfa> {
    let max_states = config.max_nfa_states;
    let max_transitions = config.max_nfa_transitions;
    let closure = Closure::new(mp);
    let mut builder = NfaBuilder::new(mp.patterns().to_vec(), mp.group_count());

    let forward_anchored = builder.add_state();
    let forward_unanchored = builder.add_state();
    let reverse_anchored = builder.add_state();
    let reverse_unanchored = builder.add_state();
    if builder.state_count() + closure.positions.len() > max_states {
        return Err(crate::errors::too_large!("NFA states", max_states));
    }
    let position_states: Vec<StateID> = closure
        .positions
        .iter()
        .map(|_| builder.add_state())
        .collect();

    let forward = Direction::Forward;
    add_steps(
        &mut builder,
        forward_anchored,
        forward,
        closure.forward(mp.root(), true),
        &position_states,
        max_transitions,
    )?;
    add_steps(
        &mut builder,
        forward_unanchored,
        forward,
        closure.forward(mp.root(), false),
        &position_states,
        max_transitions,
    )?;
    for (i, position) in closure.positions.iter().enumerate() {
        add_steps(
            &mut builder,
            position_states[i],
            forward,
            closure.forward(position.target, false),
            &position_states,
            max_transitions,
        )?;
    }

    let reverse = Direction::Reverse;
    add_steps(
        &mut builder,
        reverse_anchored,
        reverse,
        closure.reverse(mp.end(), true),
        &position_states,
        max_transitions,
    )?;
    add_steps(
        &mut builder,
        reverse_unanchored,
        reverse,
        closure.reverse(mp.end(), false),
        &position_states,
        max_transitions,
    )?;
    for (i, position) in closure.positions.iter().enumerate() {
        add_steps(
            &mut builder,
            position_states[i],
            reverse,
            closure.reverse(position.source, false),
            &position_states,
            max_transitions,
        )?;
    }

    builder.add_entry(forward, forward_anchored, forward_unanchored);
    builder.add_entry(reverse, reverse_anchored, reverse_unanchored);
    let nfa = builder.finish(max_states)?;
    trace!(
        "NFA with {} states and {} transitions ({} positions)",
        nfa.states().len(),
        nfa.transitions().len(),
        closure.positions.len()
    );
    debug_assert!(closure
        .positions
        .iter()
        .all(|p| mp.nfa().nodes()[p.source].edges()[p.edge].kind.is_char()));
    Ok(nfa)
}
