#![forbid(missing_docs)]
//! # `rxdfa`
//! The `rxdfa` crate is a regular expression automaton engine. It compiles an ordered list of
//! patterns into an epsilon free NFA and derives a DFA from it lazily, one state at a time,
//! while the input is matched. The DFA tracks capture groups, can be traversed in forward and
//! reverse direction and is shared between threads.
//! To parse the given regular expressions, the crate uses the `regex-syntax` crate.
//!
//! Matches are leftmost-first, like in the `regex` crate: the match that starts first wins, and
//! among matches at the same start the preferred alternative and the earlier pattern win.
//!
//! # Example
//! ```rust
//! use rxdfa::RegexBuilder;
//!
//! static PATTERNS: &[&str] = &[
//!     r"0|[1-9][0-9]*",      // Number
//!     r"[a-zA-Z_]\w*",       // Identifier
//!     r"=",                  // Assignment
//!     r";",                  // Semicolon
//! ];
//!
//! const INPUT: &str = "a = 10;";
//!
//! fn main() {
//!     let regex = RegexBuilder::new()
//!         .add_patterns(PATTERNS)
//!         .build()
//!         .expect("RegexBuilder error");
//!     for ma in regex.find_iter(INPUT) {
//!         println!("{}: '{}'", ma, &INPUT[ma.span().range()]);
//!     }
//! }
//! ```
//! The output of the example is:
//! ```text
//! pattern 1 at 0..1: 'a'
//! pattern 2 at 2..3: '='
//! pattern 0 at 4..6: '10'
//! pattern 3 at 6..7: ';'
//! ```
//!
//! # Automata
//! The building blocks are public as well. An [Nfa] is compiled into a [CompiledAutomaton] per
//! traversal [Direction]. These work on code point slices and code point offsets:
//! ```rust
//! use std::sync::Arc;
//! use rxdfa::{AutomatonConfig, CompiledAutomaton, Direction, Nfa, Pattern};
//!
//! let config = AutomatonConfig::default();
//! let nfa = Arc::new(Nfa::try_from_patterns(&[Pattern::new("a+b")], &config).unwrap());
//! let dfa = CompiledAutomaton::compile(nfa, Direction::Forward, &config).unwrap();
//! let input: Vec<u32> = "xaab".chars().map(|c| c as u32).collect();
//! let m = dfa.search(&input, 0, false).unwrap().unwrap();
//! assert_eq!(m.span().range(), 1..4);
//! ```
//!
//! The number of DFA states and transitions is limited by the [AutomatonConfig]. When a limit
//! is exceeded the automaton reports [RxErrorKind::AutomatonTooLarge] and the [Regex] facade
//! continues with an [NfaSimulator].
//!
//! # Crate features
//! - `dot_writer`: Export of automata in the graphviz dot format. Enabled by default.
//! - `serde`: Serialization of the configuration, matches and automaton snapshots, and export
//!   of snapshots as JSON. Enabled by default.

/// Module with the automaton configuration
mod config;
pub use config::AutomatonConfig;

/// Module with error definitions
mod errors;
pub use errors::{Result, RxError, RxErrorKind};

/// Module with read-only views of automata and the export sinks
pub mod export;

/// Module that provides a FindMatches type
mod find_matches;
pub use find_matches::FindMatches;

/// The module with internal implementation details.
mod internal;
pub use internal::{
    CodePointMatcher, CompiledAutomaton, DfaStateID, DfaStateIDBase, Direction, GroupBoundary,
    Nfa, NfaSimulator, NfaState, NfaTransition, PatternID, PatternIDBase, StateID, StateIDBase,
    TransitionID, TransitionIDBase, MAX_CODE_POINT,
};

/// Module that provides a MatchResult type
mod match_result;
pub use match_result::MatchResult;

/// Module that provides a Pattern type
mod pattern;
pub use pattern::Pattern;

/// The module with the regex facade.
mod regex;
pub use crate::regex::Regex;

/// The module with the regex builder.
mod regex_builder;
pub use regex_builder::RegexBuilder;

/// Module that provides a Span type
mod span;
pub use span::Span;
