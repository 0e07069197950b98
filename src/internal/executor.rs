//! The matching loops of the DFA.
//!
//! An attempt at position `p` uses the entry offset `k = min(p, offsets - 1)` and starts the
//! traversal `k` code points before `p`. The anchored entry is used when the traversal starts
//! at the boundary of the input in traversal direction, the unanchored entry everywhere else.
//! The executor makes no priority decisions; it follows the single DFA transition that accepts
//! the next code point and keeps the last accepted match.

use log::trace;

use crate::{MatchResult, Result};

use super::{dfa_cache::DfaCache, matching_state::MatchingState, DfaStateID};

/// The DFA entry states per offset, as (anchored, unanchored) pairs.
pub(crate) type Entries = [(DfaStateID, DfaStateID)];

/// One forward attempt at position `start`.
pub(crate) fn forward_attempt(
    cache: &DfaCache,
    entries: &Entries,
    input: &[u32],
    start: usize,
) -> Result<Option<MatchResult>> {
    let nfa = cache.nfa();
    let offset = start.min(entries.len() - 1);
    let begin = start - offset;
    let entry = if begin == 0 {
        entries[offset].0
    } else {
        entries[offset].1
    };
    let mut matching_state = MatchingState::new(entry, nfa.group_count());
    let mut i = begin;
    loop {
        let node = cache.state(matching_state.current_state());
        if i >= start {
            let accept = if i == input.len() {
                node.finals().accept_at_end
            } else {
                node.finals().accept
            };
            if let Some(accept) = accept {
                matching_state.accept(&accept, i, nfa);
            }
        }
        if i == input.len() {
            break;
        }
        let successors = cache.successors(&node)?;
        match successors.find(input[i]) {
            Some(edge) => matching_state.advance(edge, i, nfa),
            None => break,
        }
        i += 1;
    }
    let result = matching_state.into_match_result(start);
    if let Some(result) = &result {
        trace!("Match at {}: {}", start, result);
    }
    Ok(result)
}

/// Forward search. Anchored searches make a single attempt at `start`, unanchored searches try
/// every position from `start` to the end of the input and return the first match.
pub(crate) fn forward_search(
    cache: &DfaCache,
    entries: &Entries,
    input: &[u32],
    start: usize,
    anchored: bool,
) -> Result<Option<MatchResult>> {
    if anchored {
        return forward_attempt(cache, entries, input, start);
    }
    for position in start..=input.len() {
        if let Some(result) = forward_attempt(cache, entries, input, position)? {
            return Ok(Some(result));
        }
    }
    Ok(None)
}

/// Reverse walk from `end` to the left. Returns the earliest position at which a match that
/// ends at `end` can start.
pub(crate) fn reverse_search(
    cache: &DfaCache,
    entries: &Entries,
    input: &[u32],
    end: usize,
) -> Result<Option<usize>> {
    let nfa = cache.nfa();
    let offset = (input.len() - end).min(entries.len() - 1);
    let begin = end + offset;
    let entry = if begin == input.len() {
        entries[offset].0
    } else {
        entries[offset].1
    };
    // Captures are not tracked in reverse direction
    let mut matching_state = MatchingState::new(entry, 0);
    let mut i = begin;
    loop {
        let node = cache.state(matching_state.current_state());
        if i <= end {
            let accept = if i == 0 {
                node.finals().accept_at_end
            } else {
                node.finals().accept
            };
            if let Some(accept) = accept {
                matching_state.accept(&accept, i, nfa);
            }
        }
        if i == 0 {
            break;
        }
        let successors = cache.successors(&node)?;
        match successors.find(input[i - 1]) {
            Some(edge) => matching_state.advance(edge, i, nfa),
            None => break,
        }
        i -= 1;
    }
    Ok(matching_state.last_match_position())
}
