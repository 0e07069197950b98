/// Module with the epsilon elimination that turns the combined epsilon NFA into the NFA model.
mod closure;

/// Module that provides code point matchers.
pub(crate) mod code_point_matcher;
pub use code_point_matcher::{CodePointMatcher, MAX_CODE_POINT};

/// Module with the lazily built DFA of one traversal direction.
pub(crate) mod compiled_automaton;
pub use compiled_automaton::CompiledAutomaton;

/// Module with the subset construction.
pub(crate) mod dfa_builder;

/// Module with the DFA state cache.
pub(crate) mod dfa_cache;

/// Module with conversion to graphviz dot format
#[cfg(feature = "dot_writer")]
pub(crate) mod dot;

/// Module with the Thompson construction of a single pattern.
pub(crate) mod epsilon_nfa;

/// Module with the matching loops of the DFA.
pub(crate) mod executor;

/// Module for several ID types.
mod ids;
pub(crate) use ids::NodeID;
pub use ids::{
    DfaStateID, DfaStateIDBase, PatternID, PatternIDBase, StateID, StateIDBase, TransitionID,
    TransitionIDBase,
};

/// Module that provides functions and types related to matching states.
pub(crate) mod matching_state;

/// Module that combines the patterns into one epsilon NFA.
pub(crate) mod multi_pattern_nfa;
pub(crate) use multi_pattern_nfa::MultiPatternNfa;

/// The nfa module contains the NFA model.
mod nfa;
pub use nfa::{Direction, GroupBoundary, Nfa, NfaState, NfaTransition};

/// Module with the thread simulation of the NFA.
pub(crate) mod nfa_simulator;
pub use nfa_simulator::NfaSimulator;

/// The parser module contains the regex syntax parser.
mod parser;
pub(crate) use parser::parse_regex_syntax;
