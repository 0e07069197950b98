//! Module with the lazy DFA state cache.
//!
//! The cache interns DFA states by their state set and computes the successors of a state on
//! first use. It is shared by all threads that match with the same compiled automaton.
//!
//! # Implementation
//! The states live in an arena `RwLock<Vec<Arc<DfaStateNode>>>`, their index is the stable
//! `DfaStateID`. A `RwLock<FxHashMap<StateSet, DfaStateID>>` maps state sets to ids. Inserting
//! re-checks the map under the write lock, so two threads that race on the same state set get
//! the same id. The successors of a state are stored in a `OnceLock` and computed under a
//! per-state mutex, so they are computed at most once. The targets of an expansion are inserted
//! together: when they exceed the state budget, neither the targets nor the successors are
//! stored.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex, OnceLock, PoisonError, RwLock,
};

use log::{debug, trace};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::{errors::too_large, Result};

use super::{
    dfa_builder::{self, Finals, Origin, StateSet},
    ids::DfaStateIDBase,
    CodePointMatcher, DfaStateID, Direction, Nfa,
};

/// An outgoing transition of a realized DFA state.
#[derive(Debug, Clone)]
pub(crate) struct DfaEdge {
    pub(crate) matcher: CodePointMatcher,
    pub(crate) target: DfaStateID,
    pub(crate) origins: Box<[Origin]>,
}

/// The outgoing transitions of a DFA state with a lookup table for the executor.
#[derive(Debug, Default)]
pub(crate) struct Successors {
    edges: Vec<DfaEdge>,
    // (lo, hi, edge index), sorted by lo, ranges are disjoint
    table: Vec<(u32, u32, u32)>,
}

impl Successors {
    fn new(edges: Vec<DfaEdge>) -> Self {
        let mut table: Vec<(u32, u32, u32)> = edges
            .iter()
            .enumerate()
            .flat_map(|(i, e)| {
                e.matcher
                    .ranges()
                    .into_iter()
                    .map(move |(lo, hi)| (lo, hi, i as u32))
            })
            .collect();
        table.sort_unstable();
        debug_assert!(table.windows(2).all(|w| w[0].1 < w[1].0));
        Self { edges, table }
    }

    /// The transition whose matcher contains the code point.
    #[inline]
    pub(crate) fn find(&self, c: u32) -> Option<&DfaEdge> {
        let i = self.table.partition_point(|(lo, _, _)| *lo <= c);
        if i == 0 {
            return None;
        }
        let (_, hi, edge) = self.table[i - 1];
        if c <= hi {
            Some(&self.edges[edge as usize])
        } else {
            None
        }
    }

    pub(crate) fn edges(&self) -> &[DfaEdge] {
        &self.edges
    }
}

/// A DFA state.
#[derive(Debug)]
pub(crate) struct DfaStateNode {
    id: DfaStateID,
    state_set: StateSet,
    finals: Finals,
    successors: OnceLock<Arc<Successors>>,
    building: Mutex<()>,
}

impl DfaStateNode {
    fn new(id: DfaStateID, state_set: StateSet, finals: Finals) -> Self {
        Self {
            id,
            state_set,
            finals,
            successors: OnceLock::new(),
            building: Mutex::new(()),
        }
    }

    pub(crate) fn id(&self) -> DfaStateID {
        self.id
    }

    pub(crate) fn state_set(&self) -> &StateSet {
        &self.state_set
    }

    pub(crate) fn finals(&self) -> &Finals {
        &self.finals
    }

    /// The successors if they have been computed already.
    pub(crate) fn realized_successors(&self) -> Option<&Arc<Successors>> {
        self.successors.get()
    }
}

#[derive(Debug)]
pub(crate) struct DfaCache {
    nfa: Arc<Nfa>,
    direction: Direction,
    states: RwLock<Vec<Arc<DfaStateNode>>>,
    index: RwLock<FxHashMap<StateSet, DfaStateID>>,
    max_states: usize,
    max_transitions: usize,
    transition_count: AtomicUsize,
    expansions: AtomicUsize,
}

impl DfaCache {
    pub(crate) fn new(
        nfa: Arc<Nfa>,
        direction: Direction,
        max_states: usize,
        max_transitions: usize,
    ) -> Self {
        Self {
            nfa,
            direction,
            states: RwLock::new(Vec::new()),
            index: RwLock::new(FxHashMap::default()),
            max_states,
            max_transitions,
            transition_count: AtomicUsize::new(0),
            expansions: AtomicUsize::new(0),
        }
    }

    pub(crate) fn nfa(&self) -> &Arc<Nfa> {
        &self.nfa
    }

    pub(crate) fn direction(&self) -> Direction {
        self.direction
    }

    /// Returns the id of the state with the given state set and creates the state if it does
    /// not exist yet.
    pub(crate) fn get_or_insert(&self, state_set: StateSet) -> Result<DfaStateID> {
        Ok(self.get_or_insert_all(vec![state_set])?[0])
    }

    /// Returns the ids of the states with the given state sets and creates the missing ones.
    /// Either all missing states are created or, if they do not fit into the budget, none.
    pub(crate) fn get_or_insert_all(&self, state_sets: Vec<StateSet>) -> Result<Vec<DfaStateID>> {
        {
            let index = self.index.read().unwrap_or_else(PoisonError::into_inner);
            let known: Option<Vec<DfaStateID>> =
                state_sets.iter().map(|s| index.get(s).copied()).collect();
            if let Some(ids) = known {
                return Ok(ids);
            }
        }
        let mut index = self.index.write().unwrap_or_else(PoisonError::into_inner);
        let mut states = self.states.write().unwrap_or_else(PoisonError::into_inner);
        // Other threads may have inserted some of the states in the meantime
        let missing = state_sets
            .iter()
            .filter(|s| !index.contains_key(*s))
            .collect::<FxHashSet<_>>()
            .len();
        if states.len() + missing > self.max_states {
            debug!(
                "DFA state limit {} reached in {} direction",
                self.max_states, self.direction
            );
            return Err(too_large!("DFA states", self.max_states));
        }
        let mut ids = Vec::with_capacity(state_sets.len());
        for state_set in state_sets {
            let id = match index.get(&state_set) {
                Some(id) => *id,
                None => {
                    let id = DfaStateID::new(states.len() as DfaStateIDBase);
                    let finals = dfa_builder::compute_finals(&self.nfa, self.direction, &state_set);
                    trace!("New DFA state {} for {:?}", id, state_set);
                    states.push(Arc::new(DfaStateNode::new(id, state_set.clone(), finals)));
                    index.insert(state_set, id);
                    id
                }
            };
            ids.push(id);
        }
        Ok(ids)
    }

    /// The state with the given id. Ids are only handed out for inserted states.
    #[inline]
    pub(crate) fn state(&self, id: DfaStateID) -> Arc<DfaStateNode> {
        self.states.read().unwrap_or_else(PoisonError::into_inner)[id].clone()
    }

    /// The successors of the state, computed on first use.
    /// When a budget is exceeded the state stays unexpanded and the error is returned.
    pub(crate) fn successors(&self, node: &DfaStateNode) -> Result<Arc<Successors>> {
        if let Some(successors) = node.successors.get() {
            return Ok(successors.clone());
        }
        let _guard = node.building.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(successors) = node.successors.get() {
            return Ok(successors.clone());
        }

        let builders = dfa_builder::compute_transitions(&self.nfa, self.direction, &node.state_set);
        let count = builders.len();
        let total = self.transition_count.fetch_add(count, Ordering::SeqCst) + count;
        if total > self.max_transitions {
            self.transition_count.fetch_sub(count, Ordering::SeqCst);
            debug!(
                "DFA transition limit {} reached in {} direction",
                self.max_transitions, self.direction
            );
            return Err(too_large!("DFA transitions", self.max_transitions));
        }
        let (targets, builders): (Vec<_>, Vec<_>) = builders
            .into_iter()
            .map(|b| (b.target, (b.matcher, b.origins)))
            .unzip();
        let targets = match self.get_or_insert_all(targets) {
            Ok(targets) => targets,
            Err(e) => {
                self.transition_count.fetch_sub(count, Ordering::SeqCst);
                return Err(e);
            }
        };
        let edges: Vec<DfaEdge> = builders
            .into_iter()
            .zip(targets)
            .map(|((matcher, origins), target)| DfaEdge {
                matcher,
                target,
                origins,
            })
            .collect();
        let successors = Arc::new(Successors::new(edges));
        let _ = node.successors.set(successors.clone());
        self.expansions.fetch_add(1, Ordering::SeqCst);
        Ok(successors)
    }

    /// The number of created states.
    pub(crate) fn state_count(&self) -> usize {
        self.states.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// The number of successor computations performed so far.
    pub(crate) fn expansion_count(&self) -> usize {
        self.expansions.load(Ordering::SeqCst)
    }

    /// The number of created transitions.
    pub(crate) fn transition_count(&self) -> usize {
        self.transition_count.load(Ordering::SeqCst)
    }

    /// A copy of the state list, used for exports.
    pub(crate) fn states(&self) -> Vec<Arc<DfaStateNode>> {
        self.states
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AutomatonConfig, Pattern};

    fn cache(patterns: &[&str], max_states: usize) -> DfaCache {
        let patterns: Vec<Pattern> = patterns.iter().map(|p| Pattern::new(*p)).collect();
        let nfa = Nfa::try_from_patterns(&patterns, &AutomatonConfig::default()).unwrap();
        DfaCache::new(Arc::new(nfa), Direction::Forward, max_states, 10_000)
    }

    #[test]
    fn test_same_key_same_id() {
        let cache = cache(&["a+b"], 100);
        let key = dfa_builder::entry_state_set(cache.nfa(), Direction::Forward, false, 0);
        let id1 = cache.get_or_insert(key.clone()).unwrap();
        let id2 = cache.get_or_insert(key).unwrap();
        assert_eq!(id1, id2);
        assert_eq!(cache.state_count(), 1);
    }

    #[test]
    fn test_concurrent_insert_and_expand() {
        let cache = Arc::new(cache(&["[a-z]+[0-9]", "x*y"], 100));
        let key = dfa_builder::entry_state_set(cache.nfa(), Direction::Forward, false, 0);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                let key = key.clone();
                std::thread::spawn(move || {
                    let id = cache.get_or_insert(key).unwrap();
                    let node = cache.state(id);
                    let successors = cache.successors(&node).unwrap();
                    (id, successors.edges().len())
                })
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(results.iter().all(|r| *r == results[0]));
        assert_eq!(cache.expansion_count(), 1);
    }

    #[test]
    fn test_successors_are_computed_once() {
        let cache = cache(&["ab"], 100);
        let key = dfa_builder::entry_state_set(cache.nfa(), Direction::Forward, false, 0);
        let node = cache.state(cache.get_or_insert(key).unwrap());
        let s1 = cache.successors(&node).unwrap();
        let s2 = cache.successors(&node).unwrap();
        assert!(Arc::ptr_eq(&s1, &s2));
        assert_eq!(cache.expansion_count(), 1);
        assert!(s1.find('a' as u32).is_some());
        assert!(s1.find('b' as u32).is_none());
    }

    #[test]
    fn test_state_budget() {
        let cache = cache(&["abcdef"], 3);
        let mut id = cache
            .get_or_insert(dfa_builder::entry_state_set(
                cache.nfa(),
                Direction::Forward,
                false,
                0,
            ))
            .unwrap();
        let mut error = None;
        for c in "abcdef".chars() {
            let node = cache.state(id);
            match cache.successors(&node) {
                Ok(successors) => id = successors.find(c as u32).unwrap().target,
                Err(e) => {
                    error = Some(e);
                    break;
                }
            }
        }
        assert!(error.unwrap().is_too_large());
        assert_eq!(cache.state_count(), 3);
        // The failed state stays unexpanded
        assert!(cache.state(id).realized_successors().is_none());
    }

    #[test]
    fn test_failed_expansion_inserts_no_targets() {
        let cache = cache(&["ax", "by", "cz"], 2);
        let key = dfa_builder::entry_state_set(cache.nfa(), Direction::Forward, true, 0);
        let node = cache.state(cache.get_or_insert(key).unwrap());
        // Three new targets do not fit, so none of them is created
        assert!(cache.successors(&node).unwrap_err().is_too_large());
        assert_eq!(cache.state_count(), 1);
        assert_eq!(cache.transition_count(), 0);
        assert!(node.realized_successors().is_none());
    }
}
