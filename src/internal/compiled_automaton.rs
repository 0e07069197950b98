use std::{collections::VecDeque, sync::Arc};

use log::debug;
use rustc_hash::FxHashSet;

use crate::{
    errors::invalid_argument,
    export::{AutomatonSnapshot, SnapshotEntry, SnapshotState, SnapshotTransition},
    AutomatonConfig, MatchResult, Result,
};

use super::{
    dfa_builder::entry_state_set,
    dfa_cache::DfaCache,
    executor::{forward_search, reverse_search},
    DfaStateID, Direction, Nfa, TransitionID,
};

/// A lazily built DFA for one traversal direction of an [Nfa].
///
/// The DFA states are created on demand while matching and are kept for the lifetime of the
/// automaton. The automaton can be shared between threads; concurrent searches share the
/// states that have been built so far.
///
/// Offsets passed to and returned from the search functions count code points.
#[derive(Debug)]
pub struct CompiledAutomaton {
    cache: DfaCache,
    // (anchored, unanchored) entry state per entry offset
    entries: Vec<(DfaStateID, DfaStateID)>,
}

impl CompiledAutomaton {
    /// Creates the automaton and builds its entry states. The remaining states are built on
    /// demand unless the configuration asks for eager materialization.
    pub fn compile(nfa: Arc<Nfa>, direction: Direction, config: &AutomatonConfig) -> Result<Self> {
        let cache = DfaCache::new(
            nfa.clone(),
            direction,
            config.max_dfa_states,
            config.max_dfa_transitions,
        );
        let mut entries = Vec::with_capacity(nfa.entry_count(direction));
        for offset in 0..nfa.entry_count(direction) {
            let anchored = cache.get_or_insert(entry_state_set(&nfa, direction, true, offset))?;
            let unanchored =
                cache.get_or_insert(entry_state_set(&nfa, direction, false, offset))?;
            entries.push((anchored, unanchored));
        }
        let automaton = Self { cache, entries };
        if config.eager {
            automaton.materialize()?;
        }
        Ok(automaton)
    }

    /// The traversal direction.
    pub fn direction(&self) -> Direction {
        self.cache.direction()
    }

    /// The NFA the automaton is derived from.
    pub fn nfa(&self) -> &Arc<Nfa> {
        self.cache.nfa()
    }

    /// Builds every state reachable from the entries and returns the number of reachable
    /// states.
    pub fn materialize(&self) -> Result<usize> {
        let mut seen = FxHashSet::default();
        let mut queue: VecDeque<DfaStateID> = self
            .entries
            .iter()
            .flat_map(|(anchored, unanchored)| [*anchored, *unanchored])
            .collect();
        while let Some(id) = queue.pop_front() {
            if !seen.insert(id) {
                continue;
            }
            let node = self.cache.state(id);
            let successors = self.cache.successors(&node)?;
            queue.extend(
                successors
                    .edges()
                    .iter()
                    .map(|e| e.target)
                    .filter(|t| !seen.contains(t)),
            );
        }
        debug!(
            "Materialized {} DFA states in {} direction",
            seen.len(),
            self.direction()
        );
        Ok(seen.len())
    }

    /// Searches a match in the input, starting at `start`.
    ///
    /// An anchored search makes a single attempt at `start`. An unanchored search tries every
    /// position from `start` up to the length of the input and returns the first match.
    /// Within an attempt the match is leftmost-first: the preferred alternative wins, greedy
    /// repetitions take as much as possible and lazy ones as little as possible.
    ///
    /// # Errors
    /// `InvalidArgument` if `start` is beyond the input or the automaton is not a forward
    /// automaton. `AutomatonTooLarge` if a budget is exceeded while states are built.
    pub fn search(
        &self,
        input: &[u32],
        start: usize,
        anchored: bool,
    ) -> Result<Option<MatchResult>> {
        Nfa::check_offset(start, input.len())?;
        if self.direction() != Direction::Forward {
            return Err(invalid_argument!("search needs a forward automaton"));
        }
        forward_search(&self.cache, &self.entries, input, start, anchored)
    }

    /// Walks from `end` to the left and returns the earliest position at which a match that
    /// ends at `end` starts.
    ///
    /// # Errors
    /// `InvalidArgument` if `end` is beyond the input or the automaton is not a reverse
    /// automaton. `AutomatonTooLarge` if a budget is exceeded while states are built.
    pub fn search_start(&self, input: &[u32], end: usize) -> Result<Option<usize>> {
        Nfa::check_offset(end, input.len())?;
        if self.direction() != Direction::Reverse {
            return Err(invalid_argument!("search_start needs a reverse automaton"));
        }
        reverse_search(&self.cache, &self.entries, input, end)
    }

    /// The number of DFA states built so far.
    pub fn state_count(&self) -> usize {
        self.cache.state_count()
    }

    /// The number of DFA transitions built so far.
    pub fn transition_count(&self) -> usize {
        self.cache.transition_count()
    }

    /// The number of successor computations performed so far. Every state is expanded at most
    /// once, so this never exceeds [Self::state_count].
    pub fn expansion_count(&self) -> usize {
        self.cache.expansion_count()
    }

    /// A read-only copy of the states and transitions built so far.
    pub fn snapshot(&self) -> AutomatonSnapshot {
        let nfa = self.nfa();
        let pattern_of = |transition: TransitionID| nfa.transition(transition).pattern();
        AutomatonSnapshot {
            direction: self.direction(),
            patterns: nfa
                .patterns()
                .iter()
                .map(|p| p.pattern().to_string())
                .collect(),
            entries: self
                .entries
                .iter()
                .enumerate()
                .map(|(offset, (anchored, unanchored))| SnapshotEntry {
                    offset,
                    anchored: anchored.as_usize(),
                    unanchored: unanchored.as_usize(),
                })
                .collect(),
            states: self
                .cache
                .states()
                .iter()
                .map(|node| {
                    let finals = node.finals();
                    SnapshotState {
                        id: node.id().as_usize(),
                        nfa_states: node.state_set().iter().map(|s| s.as_usize()).collect(),
                        anchored_final: finals.anchored_final,
                        unanchored_final: finals.unanchored_final,
                        accept_pattern: finals
                            .accept
                            .or(finals.accept_at_end)
                            .and_then(|a| pattern_of(a.transition))
                            .map(|p| p.as_usize()),
                        expanded: node.realized_successors().is_some(),
                        transitions: node
                            .realized_successors()
                            .map(|successors| {
                                successors
                                    .edges()
                                    .iter()
                                    .map(|e| SnapshotTransition {
                                        ranges: e.matcher.ranges(),
                                        label: e.matcher.to_string(),
                                        target: e.target.as_usize(),
                                    })
                                    .collect()
                            })
                            .unwrap_or_default(),
                    }
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        internal::{nfa::NfaBuilder, CodePointMatcher, PatternID},
        Pattern, RxErrorKind, Span,
    };

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn cps(s: &str) -> Vec<u32> {
        s.chars().map(|c| c as u32).collect()
    }

    fn automaton(patterns: &[&str], direction: Direction) -> CompiledAutomaton {
        let patterns: Vec<Pattern> = patterns.iter().map(|p| Pattern::new(*p)).collect();
        let config = AutomatonConfig::default();
        let nfa = Nfa::try_from_patterns(&patterns, &config).unwrap();
        CompiledAutomaton::compile(Arc::new(nfa), direction, &config).unwrap()
    }

    #[test]
    fn test_leftmost_first_alternation() {
        init();
        let dfa = automaton(&["a|ab"], Direction::Forward);
        let m = dfa.search(&cps("ab"), 0, true).unwrap().unwrap();
        assert_eq!(m.span(), Span::new(0, 1));
        let dfa = automaton(&["ab|a"], Direction::Forward);
        let m = dfa.search(&cps("ab"), 0, true).unwrap().unwrap();
        assert_eq!(m.span(), Span::new(0, 2));
    }

    #[test]
    fn test_group_boundaries() {
        init();
        let dfa = automaton(&["(a)(b)"], Direction::Forward);
        let m = dfa.search(&cps("ab"), 0, true).unwrap().unwrap();
        assert_eq!(m.group(1), Some(Span::new(0, 1)));
        assert_eq!(m.group(2), Some(Span::new(1, 2)));
    }

    #[test]
    fn test_unanchored_search() {
        init();
        let dfa = automaton(&["b"], Direction::Forward);
        let input = cps("aab");
        assert_eq!(
            dfa.search(&input, 0, false).unwrap().unwrap().span(),
            Span::new(2, 3)
        );
        assert_eq!(dfa.search(&input, 0, true).unwrap(), None);
        assert_eq!(dfa.search(&input, 3, false).unwrap(), None);
    }

    #[test]
    fn test_anchors() {
        init();
        let dfa = automaton(&["^a", "b$"], Direction::Forward);
        assert_eq!(
            dfa.search(&cps("ab"), 0, false).unwrap().unwrap().pattern(),
            0
        );
        let m = dfa.search(&cps("ab"), 1, false).unwrap().unwrap();
        assert_eq!((m.span(), m.pattern()), (Span::new(1, 2), 1));
        assert_eq!(dfa.search(&cps("ba"), 0, false).unwrap(), None);
    }

    #[test]
    fn test_reverse_search() {
        init();
        let forward = automaton(&["a+b"], Direction::Forward);
        let reverse = automaton(&["a+b"], Direction::Reverse);
        let input = cps("xaaab");
        let m = forward.search(&input, 0, false).unwrap().unwrap();
        assert_eq!(reverse.search_start(&input, m.end()).unwrap(), Some(m.start()));

        let reverse = automaton(&["^ab"], Direction::Reverse);
        assert_eq!(reverse.search_start(&cps("ab"), 2).unwrap(), Some(0));
        assert_eq!(reverse.search_start(&cps("cab"), 3).unwrap(), None);

        let reverse = automaton(&["a$"], Direction::Reverse);
        assert_eq!(reverse.search_start(&cps("ba"), 2).unwrap(), Some(1));
        assert_eq!(reverse.search_start(&cps("ab"), 1).unwrap(), None);
    }

    #[test]
    fn test_invalid_arguments() {
        let forward = automaton(&["a"], Direction::Forward);
        let err = forward.search(&cps("a"), 2, false).unwrap_err();
        assert!(matches!(err.kind(), RxErrorKind::InvalidArgument(_)));
        let err = forward.search_start(&cps("a"), 1).unwrap_err();
        assert!(matches!(err.kind(), RxErrorKind::InvalidArgument(_)));
        let reverse = automaton(&["a"], Direction::Reverse);
        assert!(reverse.search(&cps("a"), 0, false).is_err());
        assert!(reverse.search_start(&cps("a"), 5).is_err());
    }

    #[test]
    fn test_entry_offsets() {
        init();
        // 'b' only when preceded by 'a', the 'a' is consumed as context of entry offset 1
        let mut builder = NfaBuilder::new(vec![Pattern::new("(?<=a)b")], 0);
        let context = builder.add_state();
        let after_a = builder.add_state();
        let after_b = builder.add_state();
        builder.add_transition(
            context,
            after_a,
            Direction::Forward,
            CodePointMatcher::from_char('a'),
            Vec::new(),
        );
        builder.add_transition(
            after_a,
            after_b,
            Direction::Forward,
            CodePointMatcher::from_char('b'),
            Vec::new(),
        );
        builder.add_accepting_transition(
            after_b,
            Direction::Forward,
            false,
            Vec::new(),
            PatternID::new(0),
        );
        builder.add_entry(Direction::Forward, Nfa::DUMMY_INITIAL, Nfa::DUMMY_INITIAL);
        builder.add_entry(Direction::Forward, context, context);
        builder.add_entry(Direction::Reverse, Nfa::DUMMY_INITIAL, Nfa::DUMMY_INITIAL);
        let nfa = Arc::new(builder.finish(100).unwrap());
        assert_eq!(nfa.entry_count(Direction::Forward), 2);

        let dfa =
            CompiledAutomaton::compile(nfa, Direction::Forward, &AutomatonConfig::default())
                .unwrap();
        assert_eq!(
            dfa.search(&cps("ab"), 0, false).unwrap().unwrap().span(),
            Span::new(1, 2)
        );
        assert_eq!(
            dfa.search(&cps("aab"), 0, false).unwrap().unwrap().span(),
            Span::new(2, 3)
        );
        assert_eq!(dfa.search(&cps("cb"), 0, false).unwrap(), None);
        assert_eq!(dfa.search(&cps("b"), 0, false).unwrap(), None);
    }

    #[test]
    fn test_bailout() {
        init();
        let config = AutomatonConfig::default().with_max_dfa_states(50);
        let nfa =
            Nfa::try_from_patterns(&[Pattern::new("[ab]*a[ab]{12}")], &config).unwrap();
        let dfa = CompiledAutomaton::compile(Arc::new(nfa), Direction::Forward, &config).unwrap();
        // Binary numbers with 13 digits, every window of 13 code points is a new state
        let input: Vec<u32> = (0..100u32)
            .flat_map(|n| (0..13).rev().map(move |bit| if n >> bit & 1 == 1 { 'a' } else { 'b' }))
            .map(|c| c as u32)
            .collect();
        let err = dfa.search(&input, 0, false).unwrap_err();
        assert!(err.is_too_large());
        assert!(dfa.state_count() <= 50);
        assert!(dfa.materialize().unwrap_err().is_too_large());
    }

    #[test]
    fn test_eager_materialization_and_determinism() {
        init();
        let config = AutomatonConfig::default().with_eager(true);
        let nfa = Nfa::try_from_patterns(
            &[Pattern::new(r"[a-z]+\d*"), Pattern::new(r"\d+(\.\d+)?")],
            &config,
        )
        .unwrap();
        let dfa = CompiledAutomaton::compile(Arc::new(nfa), Direction::Forward, &config).unwrap();
        let snapshot = dfa.snapshot();
        assert!(snapshot.states.iter().all(|s| s.expanded));
        assert_eq!(dfa.expansion_count(), dfa.state_count());
        for state in &snapshot.states {
            let mut ranges: Vec<(u32, u32)> = state
                .transitions
                .iter()
                .flat_map(|t| t.ranges.iter().copied())
                .collect();
            ranges.sort_unstable();
            assert!(ranges.windows(2).all(|w| w[0].1 < w[1].0), "state {}", state.id);
        }
        // Searching does not create new states any more
        let count = dfa.state_count();
        dfa.search(&cps("abc123 4.5"), 0, false).unwrap();
        assert_eq!(dfa.state_count(), count);
    }
}
