//! This module contains the NFA model the DFA is derived from.
//!
//! The NFA is free of epsilon transitions. Every state is either one of the fixed states (the
//! dummy initial state and the four final sinks), an initial state or a *position state* that
//! stands for one code point consuming step of a pattern. The transitions are stored once in an
//! arena and referenced from two independent adjacency tables, one per traversal direction.
//! Each adjacency list is ordered by priority, i.e. the first transition is the preferred
//! continuation of a thread.
//!
//! The NFA is immutable after construction and is shared between compiled automata with an
//! `Arc`.

use crate::{
    errors::{invalid_argument, too_large},
    AutomatonConfig, Pattern, Result, RxError, RxErrorKind,
};

use super::{
    closure, ids::StateIDBase, ids::TransitionIDBase, CodePointMatcher, MultiPatternNfa,
    PatternID, StateID, TransitionID,
};

/// The direction in which an automaton traverses its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Direction {
    /// Left to right. Used to find the end of a match and its capture groups.
    Forward,
    /// Right to left. Used to find the start of a match from its end.
    Reverse,
}

impl Direction {
    /// Both directions.
    pub const ALL: [Direction; 2] = [Direction::Forward, Direction::Reverse];

    /// The index of the direction into per-direction tables.
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Direction::Forward => 0,
            Direction::Reverse => 1,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Forward => write!(f, "forward"),
            Direction::Reverse => write!(f, "reverse"),
        }
    }
}

/// A mark that records the current input position as start or end of a capture group.
/// Groups are numbered from 1 in the order of their opening parenthesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GroupBoundary {
    /// The group starts at the current position.
    Start(u32),
    /// The group ends at the current position.
    End(u32),
}

impl GroupBoundary {
    /// The index of the capture group.
    pub fn group(&self) -> u32 {
        match self {
            GroupBoundary::Start(g) | GroupBoundary::End(g) => *g,
        }
    }

    /// The index of the capture slot. Group `g` uses the slots `2 * (g - 1)` and
    /// `2 * (g - 1) + 1`.
    #[inline]
    pub(crate) fn slot(&self) -> usize {
        match self {
            GroupBoundary::Start(g) => 2 * (*g as usize - 1),
            GroupBoundary::End(g) => 2 * (*g as usize - 1) + 1,
        }
    }
}

impl std::fmt::Display for GroupBoundary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GroupBoundary::Start(g) => write!(f, "({}", g),
            GroupBoundary::End(g) => write!(f, "){}", g),
        }
    }
}

/// A state of the NFA.
#[derive(Debug, Clone, Default)]
pub struct NfaState {
    id: StateID,
    // Sorted pattern indices whose accepting transition is reachable in forward direction
    possible_results: Vec<PatternID>,
    anchored_final: [bool; 2],
    unanchored_final: [bool; 2],
}

impl NfaState {
    fn new(id: StateID) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    /// The id of the state.
    pub fn id(&self) -> StateID {
        self.id
    }

    /// The indices of the patterns that can still complete from this state in forward
    /// direction, sorted ascending. An empty slice means the state is dead.
    pub fn possible_results(&self) -> &[PatternID] {
        &self.possible_results
    }

    /// True for the final sink that only accepts at the end of the input in the given direction.
    pub fn is_anchored_final(&self, direction: Direction) -> bool {
        self.anchored_final[direction.index()]
    }

    /// True for the final sink that accepts at any position in the given direction.
    pub fn is_unanchored_final(&self, direction: Direction) -> bool {
        self.unanchored_final[direction.index()]
    }

    /// True for both kinds of final sinks in the given direction.
    pub fn is_final(&self, direction: Direction) -> bool {
        self.is_anchored_final(direction) || self.is_unanchored_final(direction)
    }
}

/// A transition of the NFA.
///
/// A transition into a final sink is an *accepting transition*. It has an empty matcher,
/// consumes nothing and carries the index of the pattern that completes.
#[derive(Debug, Clone)]
pub struct NfaTransition {
    id: TransitionID,
    source: StateID,
    target: StateID,
    direction: Direction,
    matcher: CodePointMatcher,
    group_updates: Box<[GroupBoundary]>,
    priority: u32,
    pattern: Option<PatternID>,
}

impl NfaTransition {
    /// The id of the transition.
    pub fn id(&self) -> TransitionID {
        self.id
    }

    /// The source state.
    pub fn source(&self) -> StateID {
        self.source
    }

    /// The target state.
    pub fn target(&self) -> StateID {
        self.target
    }

    /// The traversal direction the transition belongs to.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// The code points the transition consumes.
    pub fn matcher(&self) -> &CodePointMatcher {
        &self.matcher
    }

    /// The group boundaries recorded when the transition fires. They are applied at the
    /// position before the consumed code point.
    pub fn group_updates(&self) -> &[GroupBoundary] {
        &self.group_updates
    }

    /// The position of the transition in the list of its source state. Lower is preferred.
    pub fn priority(&self) -> u32 {
        self.priority
    }

    /// The pattern that completes with this transition, if it is accepting.
    pub fn pattern(&self) -> Option<PatternID> {
        self.pattern
    }

    /// True if the transition leads into a final sink.
    #[inline]
    pub fn is_accepting(&self) -> bool {
        self.pattern.is_some()
    }
}

/// The nondeterministic automaton for an ordered list of patterns.
///
/// The NFA is built once and is immutable afterwards. It can be shared between any number of
/// compiled automata and matching runs.
#[derive(Debug, Clone)]
pub struct Nfa {
    patterns: Vec<Pattern>,
    states: Vec<NfaState>,
    transitions: Vec<NfaTransition>,
    // Per direction: the outgoing transitions of every state in priority order
    adjacency: [Vec<Vec<TransitionID>>; 2],
    // Per direction: entry transitions indexed by entry offset
    anchored_entry: [Vec<TransitionID>; 2],
    unanchored_entry: [Vec<TransitionID>; 2],
    group_count: usize,
}

impl Nfa {
    /// The state used as target of entries that have no initial state. It has no transitions.
    pub const DUMMY_INITIAL: StateID = StateID::new(0);

    /// Parses the patterns and builds the NFA. The index of a pattern in the slice is its
    /// priority and the pattern index reported by matches.
    pub fn try_from_patterns(patterns: &[Pattern], config: &AutomatonConfig) -> Result<Self> {
        let multi_pattern_nfa =
            MultiPatternNfa::try_from_patterns(patterns, config.max_nfa_states)?;
        closure::build_nfa(&multi_pattern_nfa, config)
    }

    /// The final sink of the given direction.
    #[inline]
    pub fn final_state(direction: Direction, anchored: bool) -> StateID {
        StateID::new(1 + 2 * direction.index() as StateIDBase + if anchored { 0 } else { 1 })
    }

    /// The patterns the NFA was built from.
    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    /// The number of patterns.
    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    /// The highest capture group index over all patterns.
    pub fn group_count(&self) -> usize {
        self.group_count
    }

    /// All states, indexed by their id.
    pub fn states(&self) -> &[NfaState] {
        &self.states
    }

    /// All transitions of both directions, indexed by their id. Entry transitions included.
    pub fn transitions(&self) -> &[NfaTransition] {
        &self.transitions
    }

    /// The state with the given id.
    #[inline]
    pub fn state(&self, id: StateID) -> &NfaState {
        &self.states[id]
    }

    /// The transition with the given id.
    #[inline]
    pub fn transition(&self, id: TransitionID) -> &NfaTransition {
        &self.transitions[id]
    }

    /// The outgoing transitions of a state in the given direction, in priority order.
    pub fn transitions_of(
        &self,
        state: StateID,
        direction: Direction,
    ) -> impl Iterator<Item = &NfaTransition> {
        self.adjacency[direction.index()][state]
            .iter()
            .map(|t| &self.transitions[*t])
    }

    /// The number of entry offsets in the given direction.
    pub fn entry_count(&self, direction: Direction) -> usize {
        self.anchored_entry[direction.index()].len()
    }

    /// The entry transition for the given direction, boundary mode and entry offset.
    /// The offset is clamped to the highest available offset.
    pub fn entry(&self, direction: Direction, anchored: bool, offset: usize) -> &NfaTransition {
        let entries = if anchored {
            &self.anchored_entry[direction.index()]
        } else {
            &self.unanchored_entry[direction.index()]
        };
        let offset = offset.min(entries.len() - 1);
        &self.transitions[entries[offset]]
    }

    /// Checks that `offset` is a valid position in an input of length `len`.
    pub(crate) fn check_offset(offset: usize, len: usize) -> Result<()> {
        if offset > len {
            Err(invalid_argument!(
                "offset {} is beyond the input length {}",
                offset,
                len
            ))
        } else {
            Ok(())
        }
    }
}

/// Low-level construction of an [Nfa].
///
/// The builder starts with the fixed states. States and transitions are appended; a
/// transition's priority is its position in the list of its source state.
#[derive(Debug)]
pub(crate) struct NfaBuilder {
    nfa: Nfa,
}

impl NfaBuilder {
    pub(crate) fn new(patterns: Vec<Pattern>, group_count: usize) -> Self {
        let mut nfa = Nfa {
            patterns,
            states: Vec::new(),
            transitions: Vec::new(),
            adjacency: [Vec::new(), Vec::new()],
            anchored_entry: [Vec::new(), Vec::new()],
            unanchored_entry: [Vec::new(), Vec::new()],
            group_count,
        };
        // The dummy initial state followed by the final sinks
        for i in 0..5 {
            let mut state = NfaState::new(StateID::new(i));
            if i > 0 {
                let direction = Direction::ALL[(i as usize - 1) / 2];
                if (i - 1) % 2 == 0 {
                    state.anchored_final[direction.index()] = true;
                } else {
                    state.unanchored_final[direction.index()] = true;
                }
            }
            nfa.states.push(state);
        }
        for adjacency in nfa.adjacency.iter_mut() {
            adjacency.resize(5, Vec::new());
        }
        debug_assert!(nfa.states[Nfa::final_state(Direction::Reverse, false)]
            .is_unanchored_final(Direction::Reverse));
        Self { nfa }
    }

    pub(crate) fn add_state(&mut self) -> StateID {
        let id = StateID::new(self.nfa.states.len() as StateIDBase);
        self.nfa.states.push(NfaState::new(id));
        for adjacency in self.nfa.adjacency.iter_mut() {
            adjacency.push(Vec::new());
        }
        id
    }

    pub(crate) fn state_count(&self) -> usize {
        self.nfa.states.len()
    }

    pub(crate) fn transition_count(&self) -> usize {
        self.nfa.transitions.len()
    }

    fn push_transition(
        &mut self,
        source: StateID,
        target: StateID,
        direction: Direction,
        matcher: CodePointMatcher,
        group_updates: Vec<GroupBoundary>,
        pattern: Option<PatternID>,
        priority: u32,
    ) -> TransitionID {
        let id = TransitionID::new(self.nfa.transitions.len() as TransitionIDBase);
        self.nfa.transitions.push(NfaTransition {
            id,
            source,
            target,
            direction,
            matcher,
            group_updates: group_updates.into_boxed_slice(),
            priority,
            pattern,
        });
        id
    }

    /// Appends a consuming transition to the list of the source state.
    pub(crate) fn add_transition(
        &mut self,
        source: StateID,
        target: StateID,
        direction: Direction,
        matcher: CodePointMatcher,
        group_updates: Vec<GroupBoundary>,
    ) -> TransitionID {
        let priority = self.nfa.adjacency[direction.index()][source].len() as u32;
        let id = self.push_transition(
            source,
            target,
            direction,
            matcher,
            group_updates,
            None,
            priority,
        );
        self.nfa.adjacency[direction.index()][source].push(id);
        id
    }

    /// Appends an accepting transition into the final sink of the direction.
    pub(crate) fn add_accepting_transition(
        &mut self,
        source: StateID,
        direction: Direction,
        anchored: bool,
        group_updates: Vec<GroupBoundary>,
        pattern: PatternID,
    ) -> TransitionID {
        let priority = self.nfa.adjacency[direction.index()][source].len() as u32;
        let id = self.push_transition(
            source,
            Nfa::final_state(direction, anchored),
            direction,
            CodePointMatcher::Empty,
            group_updates,
            Some(pattern),
            priority,
        );
        self.nfa.adjacency[direction.index()][source].push(id);
        id
    }

    /// Appends the entries for the next entry offset of the direction.
    pub(crate) fn add_entry(
        &mut self,
        direction: Direction,
        anchored_target: StateID,
        unanchored_target: StateID,
    ) {
        let offset = self.nfa.anchored_entry[direction.index()].len() as u32;
        let anchored = self.push_transition(
            Nfa::DUMMY_INITIAL,
            anchored_target,
            direction,
            CodePointMatcher::Empty,
            Vec::new(),
            None,
            offset,
        );
        let unanchored = self.push_transition(
            Nfa::DUMMY_INITIAL,
            unanchored_target,
            direction,
            CodePointMatcher::Empty,
            Vec::new(),
            None,
            offset,
        );
        self.nfa.anchored_entry[direction.index()].push(anchored);
        self.nfa.unanchored_entry[direction.index()].push(unanchored);
    }

    fn malformed(message: String) -> RxError {
        RxError::new(RxErrorKind::MalformedAutomaton(message))
    }

    /// Validates the automaton and computes the possible results of every state.
    pub(crate) fn finish(mut self, max_states: usize) -> Result<Nfa> {
        if self.nfa.states.len() > max_states {
            return Err(too_large!("NFA states", max_states));
        }
        for direction in Direction::ALL {
            let d = direction.index();
            if self.nfa.anchored_entry[d].is_empty()
                || self.nfa.anchored_entry[d].len() != self.nfa.unanchored_entry[d].len()
            {
                return Err(Self::malformed(format!(
                    "entry arrays of the {} direction are empty or differ in length",
                    direction
                )));
            }
        }
        for transition in &self.nfa.transitions {
            if transition.source == Nfa::DUMMY_INITIAL {
                continue;
            }
            let target_is_final = self.nfa.states[transition.target].is_final(transition.direction);
            if transition.is_accepting() != target_is_final {
                return Err(Self::malformed(format!(
                    "transition {} into state {} is inconsistent with its final flags",
                    transition.id, transition.target
                )));
            }
            if transition
                .group_updates
                .iter()
                .any(|g| g.group() == 0 || g.group() as usize > self.nfa.group_count)
            {
                return Err(Self::malformed(format!(
                    "transition {} updates an unknown group",
                    transition.id
                )));
            }
        }
        self.compute_possible_results();
        Ok(self.nfa)
    }

    // Propagates the pattern indices of accepting transitions backwards along the forward
    // transitions until a fixpoint is reached.
    fn compute_possible_results(&mut self) {
        let forward = Direction::Forward.index();
        let mut results: Vec<Vec<PatternID>> = vec![Vec::new(); self.nfa.states.len()];
        for transition in &self.nfa.transitions {
            if transition.direction == Direction::Forward {
                if let Some(pattern) = transition.pattern {
                    results[transition.source].push(pattern);
                }
            }
        }
        for result in results.iter_mut() {
            result.sort_unstable();
            result.dedup();
        }
        let mut changed = true;
        while changed {
            changed = false;
            for (source, list) in self.nfa.adjacency[forward].iter().enumerate() {
                for t in list {
                    let target = self.nfa.transitions[*t].target;
                    if target.as_usize() == source || results[target].is_empty() {
                        continue;
                    }
                    let before = results[source].len();
                    let additional = results[target].clone();
                    results[source].extend(additional);
                    results[source].sort_unstable();
                    results[source].dedup();
                    changed |= results[source].len() != before;
                }
            }
        }
        for (state, result) in self.nfa.states.iter_mut().zip(results) {
            state.possible_results = result;
        }
    }
}

impl std::fmt::Display for Nfa {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, pattern) in self.patterns.iter().enumerate() {
            writeln!(f, "Pattern {}: {}", i, pattern)?;
        }
        for direction in Direction::ALL {
            writeln!(f, "{}:", direction)?;
            for offset in 0..self.entry_count(direction) {
                writeln!(
                    f,
                    "  entry {}: anchored -> {}, unanchored -> {}",
                    offset,
                    self.entry(direction, true, offset).target(),
                    self.entry(direction, false, offset).target()
                )?;
            }
            for state in &self.states {
                for t in self.transitions_of(state.id, direction) {
                    write!(f, "  {} -{}-> {}", t.source, t.matcher, t.target)?;
                    for update in t.group_updates.iter() {
                        write!(f, " {}", update)?;
                    }
                    if let Some(pattern) = t.pattern {
                        write!(f, " accept {}", pattern)?;
                    }
                    writeln!(f)?;
                }
            }
        }
        Ok(())
    }
}
