use crate::{MatchResult, Span};

use super::{dfa_builder::Accept, dfa_cache::DfaEdge, DfaStateID, Nfa, PatternID, TransitionID};

type Slots = Box<[Option<usize>]>;

/// The state of a single match attempt of the DFA.
///
/// Every member of the current DFA state stands for one NFA thread and owns its own capture
/// slots. When a DFA transition fires, the slots of each target member are copied from the
/// member its origin names and the group updates of the origin's NFA transition are applied.
/// Without capture groups no slots are tracked at all.
#[derive(Debug, Clone)]
pub(crate) struct MatchingState {
    // The current state of the DFA during matching
    current_state: DfaStateID,
    slot_count: usize,
    // Capture slots per member of the current DFA state
    slots: Vec<Slots>,
    // End position, pattern and slots of the last accepted match
    last_match: Option<(usize, PatternID, Slots)>,
}

impl MatchingState {
    pub(crate) fn new(start_state: DfaStateID, group_count: usize) -> Self {
        let slot_count = 2 * group_count;
        Self {
            current_state: start_state,
            slot_count,
            slots: vec![vec![None; slot_count].into_boxed_slice()],
            last_match: None,
        }
    }

    #[inline]
    pub(crate) fn current_state(&self) -> DfaStateID {
        self.current_state
    }

    #[inline]
    fn tracks_groups(&self) -> bool {
        self.slot_count > 0
    }

    fn apply(slots: &mut Slots, nfa: &Nfa, transition: TransitionID, position: usize) {
        for update in nfa.transition(transition).group_updates() {
            slots[update.slot()] = Some(position);
        }
    }

    /// Records an accepting transition at the position. A later accept replaces an earlier one.
    pub(crate) fn accept(&mut self, accept: &Accept, position: usize, nfa: &Nfa) {
        let pattern = nfa
            .transition(accept.transition)
            .pattern()
            .unwrap_or_default();
        let slots = if self.tracks_groups() {
            let mut slots = self.slots[accept.member as usize].clone();
            Self::apply(&mut slots, nfa, accept.transition, position);
            slots
        } else {
            Slots::default()
        };
        self.last_match = Some((position, pattern, slots));
    }

    /// Moves along the DFA transition. `position` is the position before the consumed code
    /// point.
    pub(crate) fn advance(&mut self, edge: &DfaEdge, position: usize, nfa: &Nfa) {
        if self.tracks_groups() {
            let slots = edge
                .origins
                .iter()
                .map(|origin| {
                    let mut slots = self.slots[origin.member as usize].clone();
                    Self::apply(&mut slots, nfa, origin.transition, position);
                    slots
                })
                .collect();
            self.slots = slots;
        }
        self.current_state = edge.target;
    }

    /// The position of the last accepted match.
    #[inline]
    pub(crate) fn last_match_position(&self) -> Option<usize> {
        self.last_match.as_ref().map(|(position, _, _)| *position)
    }

    /// Converts the last accepted match of an attempt that started at `start`.
    pub(crate) fn into_match_result(self, start: usize) -> Option<MatchResult> {
        let group_count = self.slot_count / 2;
        self.last_match.map(|(end, pattern, slots)| {
            MatchResult::new(
                Span::new(start, end),
                pattern.as_usize(),
                groups_from_slots(&slots, group_count),
            )
        })
    }
}

/// Converts capture slots into group spans. A group only participates when both of its
/// boundaries were recorded in order.
pub(crate) fn groups_from_slots(slots: &[Option<usize>], group_count: usize) -> Vec<Option<Span>> {
    (0..group_count)
        .map(|g| {
            match (
                slots.get(2 * g).copied().flatten(),
                slots.get(2 * g + 1).copied().flatten(),
            ) {
                (Some(s), Some(e)) if s <= e => Some(Span::new(s, e)),
                _ => None,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::internal::{dfa_builder::Origin, CodePointMatcher};
    use crate::{AutomatonConfig, Direction, Pattern};

    fn nfa(pattern: &str) -> Nfa {
        Nfa::try_from_patterns(&[Pattern::new(pattern)], &AutomatonConfig::default()).unwrap()
    }

    #[test]
    fn test_no_match_without_accept() {
        let state = MatchingState::new(DfaStateID::new(0), 1);
        assert_eq!(state.last_match_position(), None);
        assert_eq!(state.into_match_result(0), None);
    }

    #[test]
    fn test_slots_follow_origins() {
        let nfa = nfa("(a)");
        let start = nfa.entry(Direction::Forward, false, 0).target();
        let consume = nfa
            .transitions_of(start, Direction::Forward)
            .next()
            .unwrap();
        let accept = nfa
            .transitions_of(consume.target(), Direction::Forward)
            .next()
            .unwrap();
        assert!(accept.is_accepting());

        let mut state = MatchingState::new(DfaStateID::new(0), nfa.group_count());
        let edge = DfaEdge {
            matcher: CodePointMatcher::from_char('a'),
            target: DfaStateID::new(1),
            origins: vec![Origin {
                member: 0,
                transition: consume.id(),
            }]
            .into_boxed_slice(),
        };
        state.advance(&edge, 3, &nfa);
        assert_eq!(state.current_state(), DfaStateID::new(1));
        state.accept(
            &Accept {
                member: 0,
                transition: accept.id(),
            },
            4,
            &nfa,
        );
        let m = state.into_match_result(3).unwrap();
        assert_eq!(m.span(), Span::new(3, 4));
        assert_eq!(m.group(1), Some(Span::new(3, 4)));
        assert_eq!(m.pattern(), 0);
    }
}
