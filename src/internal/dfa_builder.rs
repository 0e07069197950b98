//! Subset construction.
//!
//! A DFA state is identified by an ordered list of NFA states, its *state set*. The order is
//! the priority of the threads the members stand for, so it is part of the identity of the
//! state. The functions in this module compute the acceptance of a state set and its outgoing
//! transitions. They are pure; the DFA cache decides when they are called.
//!
//! In forward direction matches are leftmost-first: the first member that reaches the
//! unanchored final sink cuts all members and transitions after it. In reverse direction no cut
//! is applied, because the reverse walk looks for the earliest compatible start.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use super::{CodePointMatcher, Direction, Nfa, StateID, TransitionID};

/// The canonical key of a DFA state: NFA states in priority order without duplicates.
pub(crate) type StateSet = Arc<[StateID]>;

/// The NFA transition that produced a member of a target state, and the index of the source
/// member it was taken from. The capture slots of the target member are copied from that
/// source member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct Origin {
    pub(crate) member: u32,
    pub(crate) transition: TransitionID,
}

/// An accepting transition of a member of a DFA state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Accept {
    pub(crate) member: u32,
    pub(crate) transition: TransitionID,
}

/// Acceptance of a DFA state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Finals {
    /// The preferred acceptance before the end of the input. Only unanchored finals count here.
    pub(crate) accept: Option<Accept>,
    /// The preferred acceptance at the end of the input, where anchored finals count as well.
    pub(crate) accept_at_end: Option<Accept>,
    pub(crate) anchored_final: bool,
    pub(crate) unanchored_final: bool,
}

/// An outgoing transition of a DFA state before the target is interned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DfaTransitionBuilder {
    pub(crate) matcher: CodePointMatcher,
    pub(crate) target: StateSet,
    /// One origin per member of the target, in the same order.
    pub(crate) origins: Box<[Origin]>,
}

#[derive(Debug)]
struct Contribution {
    matcher: CodePointMatcher,
    target: StateID,
    origin: Origin,
}

/// The state set of the entry for the given direction, boundary mode and offset.
pub(crate) fn entry_state_set(
    nfa: &Nfa,
    direction: Direction,
    anchored: bool,
    offset: usize,
) -> StateSet {
    Arc::from(vec![nfa.entry(direction, anchored, offset).target()])
}

fn is_unanchored_accept(nfa: &Nfa, direction: Direction, transition: TransitionID) -> bool {
    let transition = nfa.transition(transition);
    transition.is_accepting() && nfa.state(transition.target()).is_unanchored_final(direction)
}

// Walks the members and their transitions in priority order up to the cut.
fn walk(nfa: &Nfa, direction: Direction, state_set: &[StateID]) -> (Finals, Vec<Contribution>) {
    let leftmost_first = direction == Direction::Forward;
    let mut finals = Finals::default();
    let mut contributions = Vec::new();
    'members: for (member, state) in state_set.iter().enumerate() {
        let member = member as u32;
        for transition in nfa.transitions_of(*state, direction) {
            if transition.is_accepting() {
                let accept = Accept {
                    member,
                    transition: transition.id(),
                };
                if finals.accept_at_end.is_none() {
                    finals.accept_at_end = Some(accept);
                }
                if is_unanchored_accept(nfa, direction, transition.id()) {
                    finals.unanchored_final = true;
                    if finals.accept.is_none() {
                        finals.accept = Some(accept);
                    }
                    if leftmost_first {
                        break 'members;
                    }
                } else {
                    finals.anchored_final = true;
                }
            } else {
                // Threads that can never complete are not worth tracking
                if leftmost_first && nfa.state(transition.target()).possible_results().is_empty()
                {
                    continue;
                }
                contributions.push(Contribution {
                    matcher: transition.matcher().clone(),
                    target: transition.target(),
                    origin: Origin {
                        member,
                        transition: transition.id(),
                    },
                });
            }
        }
    }
    (finals, contributions)
}

/// Computes the acceptance of a state set.
pub(crate) fn compute_finals(nfa: &Nfa, direction: Direction, state_set: &[StateID]) -> Finals {
    walk(nfa, direction, state_set).0
}

/// Computes the outgoing transitions of a state set. The matchers of the returned transitions
/// are pairwise disjoint, transitions are ordered by their smallest code point.
pub(crate) fn compute_transitions(
    nfa: &Nfa,
    direction: Direction,
    state_set: &[StateID],
) -> Vec<DfaTransitionBuilder> {
    let (_, contributions) = walk(nfa, direction, state_set);

    // Earlier contributions win the overlapping part of later ones with the same target.
    let mut claimed: FxHashMap<StateID, CodePointMatcher> = FxHashMap::default();
    let mut effective = Vec::with_capacity(contributions.len());
    for contribution in contributions {
        let matcher = match claimed.get(&contribution.target) {
            Some(claimed) => contribution.matcher.subtract(claimed),
            None => contribution.matcher,
        };
        if matcher.is_empty() {
            continue;
        }
        claimed
            .entry(contribution.target)
            .and_modify(|c| *c = c.union(&matcher))
            .or_insert_with(|| matcher.clone());
        effective.push(Contribution {
            matcher,
            ..contribution
        });
    }

    // Elementary intervals: every range start and every range end + 1 is a boundary.
    let mut boundaries: Vec<u32> = effective
        .iter()
        .flat_map(|c| c.matcher.ranges())
        .flat_map(|(lo, hi)| [lo, hi + 1])
        .collect();
    boundaries.sort_unstable();
    boundaries.dedup();

    let mut ends_thread: FxHashMap<StateID, bool> = FxHashMap::default();
    let mut ends_thread = |state: StateID| -> bool {
        *ends_thread.entry(state).or_insert_with(|| {
            direction == Direction::Forward
                && nfa
                    .transitions_of(state, direction)
                    .any(|t| is_unanchored_accept(nfa, direction, t.id()))
        })
    };

    let mut groups: Vec<(Vec<StateID>, Vec<Origin>, Vec<(u32, u32)>)> = Vec::new();
    let mut group_index: FxHashMap<(Vec<StateID>, Vec<Origin>), usize> = FxHashMap::default();
    for window in boundaries.windows(2) {
        let (lo, hi) = (window[0], window[1] - 1);
        let mut targets = Vec::new();
        let mut origins = Vec::new();
        for contribution in effective.iter().filter(|c| c.matcher.matches(lo)) {
            if targets.contains(&contribution.target) {
                continue;
            }
            targets.push(contribution.target);
            origins.push(contribution.origin);
            if ends_thread(contribution.target) {
                break;
            }
        }
        if targets.is_empty() {
            continue;
        }
        let key = (targets, origins);
        match group_index.get(&key) {
            Some(i) => groups[*i].2.push((lo, hi)),
            None => {
                group_index.insert(key.clone(), groups.len());
                groups.push((key.0, key.1, vec![(lo, hi)]));
            }
        }
    }

    groups
        .into_iter()
        .map(|(targets, origins, ranges)| DfaTransitionBuilder {
            matcher: CodePointMatcher::from_ranges(ranges),
            target: Arc::from(targets),
            origins: origins.into_boxed_slice(),
        })
        .collect()
}
