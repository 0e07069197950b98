use std::sync::Arc;

use log::trace;

use crate::{MatchResult, Result, Span};

use super::{matching_state::groups_from_slots, Direction, Nfa, NfaTransition, StateID};

type Slots = Box<[Option<usize>]>;

#[derive(Debug, Clone)]
struct Thread {
    state: StateID,
    slots: Slots,
}

// The outcome of looking at all threads at one position.
#[derive(Debug, Default)]
struct Step<'a> {
    accept: Option<(usize, &'a NfaTransition)>,
    accept_at_end: Option<(usize, &'a NfaTransition)>,
    // Consuming transitions in priority order with the index of the thread they belong to
    candidates: Vec<(usize, &'a NfaTransition)>,
}

/// Executes an [Nfa] directly by simulating its threads in priority order.
///
/// The simulator never builds DFA states, so it has no budget to exceed. It is slower than a
/// [crate::CompiledAutomaton] but reports the same matches, which makes it the fallback after a
/// DFA bailout and a reference for tests.
///
/// Offsets count code points.
#[derive(Debug, Clone)]
pub struct NfaSimulator {
    nfa: Arc<Nfa>,
}

impl NfaSimulator {
    /// Creates a simulator for the NFA.
    pub fn new(nfa: Arc<Nfa>) -> Self {
        Self { nfa }
    }

    /// The simulated NFA.
    pub fn nfa(&self) -> &Arc<Nfa> {
        &self.nfa
    }

    /// Searches a match in the input, starting at `start`. See [crate::CompiledAutomaton::search].
    pub fn search(
        &self,
        input: &[u32],
        start: usize,
        anchored: bool,
    ) -> Result<Option<MatchResult>> {
        Nfa::check_offset(start, input.len())?;
        if anchored {
            return Ok(self.forward_attempt(input, start));
        }
        Ok((start..=input.len()).find_map(|position| self.forward_attempt(input, position)))
    }

    /// The earliest start of a match that ends at `end`.
    /// See [crate::CompiledAutomaton::search_start].
    pub fn search_start(&self, input: &[u32], end: usize) -> Result<Option<usize>> {
        Nfa::check_offset(end, input.len())?;
        Ok(self.reverse_attempt(input, end))
    }

    fn step<'a>(nfa: &'a Nfa, direction: Direction, threads: &[Thread]) -> Step<'a> {
        let leftmost_first = direction == Direction::Forward;
        let mut step = Step::default();
        'threads: for (t, thread) in threads.iter().enumerate() {
            for transition in nfa.transitions_of(thread.state, direction) {
                if transition.is_accepting() {
                    if step.accept_at_end.is_none() {
                        step.accept_at_end = Some((t, transition));
                    }
                    if nfa.state(transition.target()).is_unanchored_final(direction) {
                        if step.accept.is_none() {
                            step.accept = Some((t, transition));
                        }
                        if leftmost_first {
                            break 'threads;
                        }
                    }
                } else if !leftmost_first
                    || !nfa.state(transition.target()).possible_results().is_empty()
                {
                    step.candidates.push((t, transition));
                }
            }
        }
        step
    }

    // A thread in this state accepts before it consumes anything else, so lower priority
    // threads can never win.
    fn ends_thread(nfa: &Nfa, direction: Direction, state: StateID) -> bool {
        direction == Direction::Forward
            && nfa.transitions_of(state, direction).any(|t| {
                t.is_accepting() && nfa.state(t.target()).is_unanchored_final(direction)
            })
    }

    // Reverse threads carry no slots
    fn apply(slots: &mut Slots, transition: &NfaTransition, position: usize) {
        for update in transition.group_updates() {
            if let Some(slot) = slots.get_mut(update.slot()) {
                *slot = Some(position);
            }
        }
    }

    // Advances all candidates over the code point. The first thread that reaches a state wins.
    fn advance(
        nfa: &Nfa,
        direction: Direction,
        threads: &[Thread],
        candidates: &[(usize, &NfaTransition)],
        c: u32,
        position: usize,
    ) -> Vec<Thread> {
        let mut next: Vec<Thread> = Vec::new();
        for (t, transition) in candidates {
            if !transition.matcher().matches(c)
                || next.iter().any(|n| n.state == transition.target())
            {
                continue;
            }
            let mut slots = threads[*t].slots.clone();
            Self::apply(&mut slots, transition, position);
            next.push(Thread {
                state: transition.target(),
                slots,
            });
            if Self::ends_thread(nfa, direction, transition.target()) {
                break;
            }
        }
        next
    }

    fn forward_attempt(&self, input: &[u32], start: usize) -> Option<MatchResult> {
        let nfa = &*self.nfa;
        let direction = Direction::Forward;
        let offset = start.min(nfa.entry_count(direction) - 1);
        let begin = start - offset;
        let entry = nfa.entry(direction, begin == 0, offset);
        let slot_count = 2 * nfa.group_count();
        let mut threads = vec![Thread {
            state: entry.target(),
            slots: vec![None; slot_count].into_boxed_slice(),
        }];
        let mut last_match = None;
        let mut i = begin;
        loop {
            let step = Self::step(nfa, direction, &threads);
            if i >= start {
                let accept = if i == input.len() {
                    step.accept_at_end
                } else {
                    step.accept
                };
                if let Some((t, transition)) = accept {
                    let mut slots = threads[t].slots.clone();
                    Self::apply(&mut slots, transition, i);
                    last_match = Some((i, transition.pattern().unwrap_or_default(), slots));
                }
            }
            if i == input.len() {
                break;
            }
            threads = Self::advance(nfa, direction, &threads, &step.candidates, input[i], i);
            if threads.is_empty() {
                break;
            }
            i += 1;
        }
        last_match.map(|(end, pattern, slots)| {
            trace!("Simulated match of pattern {} at {}..{}", pattern, start, end);
            MatchResult::new(
                Span::new(start, end),
                pattern.as_usize(),
                groups_from_slots(&slots, nfa.group_count()),
            )
        })
    }

    fn reverse_attempt(&self, input: &[u32], end: usize) -> Option<usize> {
        let nfa = &*self.nfa;
        let direction = Direction::Reverse;
        let offset = (input.len() - end).min(nfa.entry_count(direction) - 1);
        let begin = end + offset;
        let entry = nfa.entry(direction, begin == input.len(), offset);
        let mut threads = vec![Thread {
            state: entry.target(),
            slots: Slots::default(),
        }];
        let mut start = None;
        let mut i = begin;
        loop {
            let step = Self::step(nfa, direction, &threads);
            if i <= end {
                let accept = if i == 0 {
                    step.accept_at_end
                } else {
                    step.accept
                };
                if accept.is_some() {
                    start = Some(i);
                }
            }
            if i == 0 {
                break;
            }
            threads = Self::advance(nfa, direction, &threads, &step.candidates, input[i - 1], i);
            if threads.is_empty() {
                break;
            }
            i -= 1;
        }
        start
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AutomatonConfig, CompiledAutomaton, Pattern};

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn cps(s: &str) -> Vec<u32> {
        s.chars().map(|c| c as u32).collect()
    }

    fn nfa(patterns: &[&str]) -> Arc<Nfa> {
        let patterns: Vec<Pattern> = patterns.iter().map(|p| Pattern::new(*p)).collect();
        Arc::new(Nfa::try_from_patterns(&patterns, &AutomatonConfig::default()).unwrap())
    }

    #[test]
    fn test_simulated_matches() {
        init();
        let simulator = NfaSimulator::new(nfa(&["a|ab"]));
        let m = simulator.search(&cps("ab"), 0, true).unwrap().unwrap();
        assert_eq!(m.span(), Span::new(0, 1));

        let simulator = NfaSimulator::new(nfa(&["(a)(b)"]));
        let m = simulator.search(&cps("xab"), 0, false).unwrap().unwrap();
        assert_eq!(m.span(), Span::new(1, 3));
        assert_eq!(m.group(1), Some(Span::new(1, 2)));
        assert_eq!(m.group(2), Some(Span::new(2, 3)));

        let simulator = NfaSimulator::new(nfa(&["a+?"]));
        let m = simulator.search(&cps("aaa"), 0, false).unwrap().unwrap();
        assert_eq!(m.span(), Span::new(0, 1));
    }

    #[test]
    fn test_simulated_reverse_search() {
        init();
        let simulator = NfaSimulator::new(nfa(&["a+b"]));
        assert_eq!(simulator.search_start(&cps("xaaab"), 5).unwrap(), Some(1));
        assert_eq!(simulator.search_start(&cps("xaaab"), 4).unwrap(), None);
        assert!(simulator.search_start(&cps("ab"), 3).is_err());
    }

    #[test]
    fn test_agrees_with_dfa() {
        init();
        let patterns = [
            r"(a|ab)(c|bcd)(d*)",
            r"(\w+)@(\w+)\.com",
            r"^\d+$",
            r"(x?)*y",
            r"[a-c]+?b",
        ];
        let inputs = ["abcd", "abcdd", "me@home.com", "123", "12a", "xxy", "y", "aabcb", ""];
        let config = AutomatonConfig::default();
        for pattern in patterns {
            let nfa = nfa(&[pattern]);
            let simulator = NfaSimulator::new(nfa.clone());
            let forward =
                CompiledAutomaton::compile(nfa.clone(), Direction::Forward, &config).unwrap();
            let reverse = CompiledAutomaton::compile(nfa, Direction::Reverse, &config).unwrap();
            for input in inputs {
                let input = cps(input);
                for anchored in [true, false] {
                    assert_eq!(
                        simulator.search(&input, 0, anchored).unwrap(),
                        forward.search(&input, 0, anchored).unwrap(),
                        "pattern {} on {:?}",
                        pattern,
                        input
                    );
                }
                for end in 0..=input.len() {
                    assert_eq!(
                        simulator.search_start(&input, end).unwrap(),
                        reverse.search_start(&input, end).unwrap(),
                        "pattern {} on {:?} ending at {}",
                        pattern,
                        input,
                        end
                    );
                }
            }
        }
    }
}
