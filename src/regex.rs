use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use log::debug;

use crate::{
    errors::invalid_argument,
    export::AutomatonSnapshot,
    internal::{CompiledAutomaton, NfaSimulator},
    AutomatonConfig, Direction, FindMatches, MatchResult, Nfa, Pattern, Result, Span,
};

/// A haystack converted to code points, with the byte offset of every code point.
#[derive(Debug)]
pub(crate) struct Haystack<'h> {
    text: &'h str,
    code_points: Vec<u32>,
    // One entry per code point plus the length of the text
    byte_offsets: Vec<usize>,
}

impl<'h> Haystack<'h> {
    pub(crate) fn new(text: &'h str) -> Self {
        let mut code_points = Vec::with_capacity(text.len());
        let mut byte_offsets = Vec::with_capacity(text.len() + 1);
        for (i, c) in text.char_indices() {
            code_points.push(c as u32);
            byte_offsets.push(i);
        }
        byte_offsets.push(text.len());
        Self {
            text,
            code_points,
            byte_offsets,
        }
    }

    #[inline]
    pub(crate) fn code_points(&self) -> &[u32] {
        &self.code_points
    }

    /// The code point index of a byte offset.
    pub(crate) fn index_of(&self, byte_offset: usize) -> Result<usize> {
        if byte_offset > self.text.len() {
            return Err(invalid_argument!(
                "offset {} is beyond the haystack length {}",
                byte_offset,
                self.text.len()
            ));
        }
        if !self.text.is_char_boundary(byte_offset) {
            return Err(invalid_argument!(
                "offset {} is not on a char boundary",
                byte_offset
            ));
        }
        Ok(self.byte_offsets.partition_point(|o| *o < byte_offset))
    }

    /// The byte offset of a code point index.
    #[inline]
    pub(crate) fn byte_offset(&self, index: usize) -> usize {
        self.byte_offsets[index]
    }

    pub(crate) fn to_bytes(&self, result: MatchResult) -> MatchResult {
        result.map_offsets(|i| self.byte_offset(i))
    }
}

// One traversal direction. Starts with the DFA and switches to the simulator for good once the
// DFA exceeds its budget.
#[derive(Debug)]
struct Engine {
    dfa: Option<CompiledAutomaton>,
    simulator: NfaSimulator,
    bailed_out: AtomicBool,
}

impl Engine {
    fn new(nfa: Arc<Nfa>, direction: Direction, config: &AutomatonConfig) -> Result<Self> {
        let dfa = match CompiledAutomaton::compile(nfa.clone(), direction, config) {
            Ok(dfa) => Some(dfa),
            Err(e) if e.is_too_large() => {
                debug!("No {} DFA, falling back to NFA simulation: {}", direction, e);
                None
            }
            Err(e) => return Err(e),
        };
        Ok(Self {
            dfa,
            simulator: NfaSimulator::new(nfa),
            bailed_out: AtomicBool::new(false),
        })
    }

    fn dfa(&self) -> Option<&CompiledAutomaton> {
        self.dfa
            .as_ref()
            .filter(|_| !self.bailed_out.load(Ordering::Acquire))
    }

    fn bail_out(&self, direction: Direction, error: &crate::RxError) {
        if !self.bailed_out.swap(true, Ordering::AcqRel) {
            debug!(
                "{} DFA bailed out, falling back to NFA simulation: {}",
                direction, error
            );
        }
    }

    fn search(&self, input: &[u32], start: usize, anchored: bool) -> Result<Option<MatchResult>> {
        if let Some(dfa) = self.dfa() {
            match dfa.search(input, start, anchored) {
                Err(e) if e.is_too_large() => self.bail_out(Direction::Forward, &e),
                result => return result,
            }
        }
        self.simulator.search(input, start, anchored)
    }

    fn search_start(&self, input: &[u32], end: usize) -> Result<Option<usize>> {
        if let Some(dfa) = self.dfa() {
            match dfa.search_start(input, end) {
                Err(e) if e.is_too_large() => self.bail_out(Direction::Reverse, &e),
                result => return result,
            }
        }
        self.simulator.search_start(input, end)
    }
}

#[derive(Debug)]
struct RegexImpl {
    nfa: Arc<Nfa>,
    forward: Engine,
    reverse: Engine,
}

/// A compiled set of patterns that searches `&str` haystacks.
///
/// All offsets are byte offsets into the haystack. Matches are leftmost-first: the match that
/// starts first wins, and among the matches starting at the same position the pattern and the
/// alternatives that come first are preferred, like in the `regex` crate.
///
/// A regex is cheap to clone and can be shared between threads. The lazily built DFA states
/// are shared as well.
///
/// # Example
/// ```rust
/// use rxdfa::RegexBuilder;
///
/// let regex = RegexBuilder::new()
///     .add_pattern(r"(\w+)@(\w+)\.com")
///     .build()
///     .unwrap();
/// let captures = regex.captures("mail to me@home.com").unwrap().unwrap();
/// assert_eq!(captures.span().range(), 8..19);
/// assert_eq!(captures.group(2).unwrap().range(), 11..15);
/// ```
#[derive(Debug, Clone)]
pub struct Regex {
    inner: Arc<RegexImpl>,
}

impl Regex {
    pub(crate) fn new(patterns: Vec<Pattern>, config: &AutomatonConfig) -> Result<Self> {
        let nfa = Arc::new(Nfa::try_from_patterns(&patterns, config)?);
        let forward = Engine::new(nfa.clone(), Direction::Forward, config)?;
        let reverse = Engine::new(nfa.clone(), Direction::Reverse, config)?;
        Ok(Self {
            inner: Arc::new(RegexImpl {
                nfa,
                forward,
                reverse,
            }),
        })
    }

    /// The patterns in priority order.
    pub fn patterns(&self) -> &[Pattern] {
        self.inner.nfa.patterns()
    }

    /// The number of patterns.
    pub fn pattern_count(&self) -> usize {
        self.inner.nfa.pattern_count()
    }

    /// The NFA shared by both traversal directions.
    pub fn nfa(&self) -> &Arc<Nfa> {
        &self.inner.nfa
    }

    /// True while searches in the given direction still run on the DFA, false after a bailout.
    pub fn uses_dfa(&self, direction: Direction) -> bool {
        self.engine(direction).dfa().is_some()
    }

    /// A snapshot of the DFA states built so far, `None` after a bailout.
    pub fn snapshot(&self, direction: Direction) -> Option<AutomatonSnapshot> {
        self.engine(direction).dfa().map(CompiledAutomaton::snapshot)
    }

    fn engine(&self, direction: Direction) -> &Engine {
        match direction {
            Direction::Forward => &self.inner.forward,
            Direction::Reverse => &self.inner.reverse,
        }
    }

    /// Forward search over code points.
    pub(crate) fn search(
        &self,
        input: &[u32],
        start: usize,
        anchored: bool,
    ) -> Result<Option<MatchResult>> {
        self.inner.forward.search(input, start, anchored)
    }

    /// True if any pattern matches anywhere in the haystack.
    pub fn is_match(&self, haystack: &str) -> Result<bool> {
        Ok(self.find(haystack)?.is_some())
    }

    /// The span of the first match.
    pub fn find(&self, haystack: &str) -> Result<Option<Span>> {
        self.find_at(haystack, 0)
    }

    /// The span of the first match at or after `start`. The text before `start` is context,
    /// e.g. `^` does not match at `start > 0`.
    pub fn find_at(&self, haystack: &str, start: usize) -> Result<Option<Span>> {
        Ok(self.captures_at(haystack, start)?.map(|m| m.span()))
    }

    /// The first match with the matching pattern and its capture groups.
    pub fn captures(&self, haystack: &str) -> Result<Option<MatchResult>> {
        self.captures_at(haystack, 0)
    }

    /// The first match at or after `start` with the matching pattern and its capture groups.
    pub fn captures_at(&self, haystack: &str, start: usize) -> Result<Option<MatchResult>> {
        let haystack = Haystack::new(haystack);
        let start = haystack.index_of(start)?;
        Ok(self
            .search(haystack.code_points(), start, false)?
            .map(|m| haystack.to_bytes(m)))
    }

    /// The earliest start of a match that ends at `end`. Uses the reverse automaton.
    pub fn find_start(&self, haystack: &str, end: usize) -> Result<Option<usize>> {
        let haystack = Haystack::new(haystack);
        let end = haystack.index_of(end)?;
        Ok(self
            .inner
            .reverse
            .search_start(haystack.code_points(), end)?
            .map(|i| haystack.byte_offset(i)))
    }

    /// An iterator over all non-overlapping matches of the haystack.
    pub fn find_iter<'r, 'h>(&'r self, haystack: &'h str) -> FindMatches<'r, 'h> {
        FindMatches::new(self, Haystack::new(haystack))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RegexBuilder, RxErrorKind};

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn test_haystack_offsets() {
        let haystack = Haystack::new("aé€b");
        assert_eq!(haystack.code_points().len(), 4);
        assert_eq!(haystack.index_of(0).unwrap(), 0);
        assert_eq!(haystack.index_of(1).unwrap(), 1);
        assert_eq!(haystack.index_of(3).unwrap(), 2);
        assert_eq!(haystack.index_of(6).unwrap(), 3);
        assert_eq!(haystack.index_of(7).unwrap(), 4);
        assert!(matches!(
            haystack.index_of(2).unwrap_err().kind(),
            RxErrorKind::InvalidArgument(_)
        ));
        assert!(haystack.index_of(8).is_err());
        assert_eq!(haystack.byte_offset(4), 7);
    }

    #[test]
    fn test_byte_offsets() {
        init();
        let regex = RegexBuilder::new().add_pattern("(€+)b").build().unwrap();
        let m = regex.captures("aé€€b").unwrap().unwrap();
        assert_eq!(m.span(), Span::new(3, 10));
        assert_eq!(m.group(1), Some(Span::new(3, 9)));
        assert_eq!(regex.find_start("aé€€b", 10).unwrap(), Some(3));
        assert!(regex.find_at("aé€€b", 4).is_err());
    }

    #[test]
    fn test_find_at_keeps_context() {
        init();
        let regex = RegexBuilder::new().add_pattern("^a").build().unwrap();
        assert_eq!(regex.find("aa").unwrap(), Some(Span::new(0, 1)));
        assert_eq!(regex.find_at("aa", 1).unwrap(), None);
    }

    #[test]
    fn test_fallback_after_bailout() {
        init();
        let config = AutomatonConfig::default()
            .with_max_dfa_states(20)
            .with_max_dfa_transitions(1_000);
        let regex = RegexBuilder::new()
            .add_pattern("[ab]*a[ab]{8}")
            .config(config)
            .build()
            .unwrap();
        assert!(regex.uses_dfa(Direction::Forward));
        let haystack: String = (0..64u32)
            .flat_map(|n| (0..9).rev().map(move |bit| if n >> bit & 1 == 1 { 'a' } else { 'b' }))
            .collect();
        let expected = ::regex::Regex::new("[ab]*a[ab]{8}")
            .unwrap()
            .find(&haystack)
            .map(|m| Span::from(m.range()));
        assert_eq!(regex.find(&haystack).unwrap(), expected);
        assert!(!regex.uses_dfa(Direction::Forward));
        assert!(regex.snapshot(Direction::Forward).is_none());
        // Still correct on the simulator
        assert_eq!(regex.find("bbabbbbbbbb").unwrap(), Some(Span::new(0, 11)));
    }

    #[test]
    fn test_regex_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Regex>();
    }
}
