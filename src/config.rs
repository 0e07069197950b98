/// Limits and switches for the construction of the automata.
///
/// The limits bound the memory used for a single set of patterns. When a limit is exceeded
/// the construction stops with [crate::RxErrorKind::AutomatonTooLarge]. The [crate::Regex]
/// facade then falls back to the slower NFA simulation.
///
/// With the `serde` feature the configuration can be loaded from JSON, e.g.
/// `{"max_nfa_states": 1000, "max_nfa_transitions": 20000, "max_dfa_states": 200, "eager": false}`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AutomatonConfig {
    /// The maximum number of NFA states, counted for the epsilon NFA as well as for the
    /// epsilon free NFA.
    pub max_nfa_states: usize,
    /// The maximum number of transitions of the epsilon free NFA. Removing the epsilon edges
    /// can produce a number of transitions quadratic in the number of states.
    pub max_nfa_transitions: usize,
    /// The maximum number of DFA states a compiled automaton may create.
    pub max_dfa_states: usize,
    /// The maximum number of DFA transitions a compiled automaton may create.
    pub max_dfa_transitions: usize,
    /// Build every reachable DFA state when the automaton is compiled instead of on demand.
    pub eager: bool,
}

impl AutomatonConfig {
    /// Default value of `max_nfa_states`.
    pub const DEFAULT_MAX_NFA_STATES: usize = 65_536;
    /// Default value of `max_nfa_transitions`.
    pub const DEFAULT_MAX_NFA_TRANSITIONS: usize = 1_000_000;
    /// Default value of `max_dfa_states`.
    pub const DEFAULT_MAX_DFA_STATES: usize = 10_000;
    /// Default value of `max_dfa_transitions`.
    pub const DEFAULT_MAX_DFA_TRANSITIONS: usize = 1_000_000;

    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum number of NFA states.
    pub fn with_max_nfa_states(mut self, max_nfa_states: usize) -> Self {
        self.max_nfa_states = max_nfa_states;
        self
    }

    /// Sets the maximum number of NFA transitions.
    pub fn with_max_nfa_transitions(mut self, max_nfa_transitions: usize) -> Self {
        self.max_nfa_transitions = max_nfa_transitions;
        self
    }

    /// Sets the maximum number of DFA states.
    pub fn with_max_dfa_states(mut self, max_dfa_states: usize) -> Self {
        self.max_dfa_states = max_dfa_states;
        self
    }

    /// Sets the maximum number of DFA transitions.
    pub fn with_max_dfa_transitions(mut self, max_dfa_transitions: usize) -> Self {
        self.max_dfa_transitions = max_dfa_transitions;
        self
    }

    /// Enables or disables eager materialization of the DFA.
    pub fn with_eager(mut self, eager: bool) -> Self {
        self.eager = eager;
        self
    }
}

impl Default for AutomatonConfig {
    fn default() -> Self {
        Self {
            max_nfa_states: Self::DEFAULT_MAX_NFA_STATES,
            max_nfa_transitions: Self::DEFAULT_MAX_NFA_TRANSITIONS,
            max_dfa_states: Self::DEFAULT_MAX_DFA_STATES,
            max_dfa_transitions: Self::DEFAULT_MAX_DFA_TRANSITIONS,
            eager: false,
        }
    }
}
