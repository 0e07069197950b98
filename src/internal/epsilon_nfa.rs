//! This module contains the epsilon NFA that is built from the HIR of a single pattern by
//! Thompson's construction.
//! The edges of every node are kept in priority order: the first edge is the preferred
//! continuation of a thread. The epsilon NFA is never executed directly; the closure module
//! removes the epsilon edges and produces the NFA model that the DFA is built from.

use regex_syntax::hir::{Class, Hir, HirKind, Look};

use crate::{errors::too_large, errors::unsupported, Result};

use super::{ids::NodeIDBase, CodePointMatcher, GroupBoundary, NodeID, PatternID};

/// A zero-width assertion on an epsilon edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Assertion {
    /// `^` or `\A`
    StartText,
    /// `$` or `\z`
    EndText,
}

/// The kind of an edge in the epsilon NFA.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum EdgeKind {
    /// Consumes one code point matched by the matcher.
    Char(CodePointMatcher),
    /// Plain epsilon edge.
    Epsilon,
    /// Epsilon edge that records a group boundary at the current position.
    Group(GroupBoundary),
    /// Epsilon edge that is only passable where the assertion holds.
    Assert(Assertion),
    /// Epsilon edge from the end of a pattern to the common end node.
    Accept(PatternID),
}

impl EdgeKind {
    #[inline]
    pub(crate) fn is_char(&self) -> bool {
        matches!(self, EdgeKind::Char(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Edge {
    pub(crate) kind: EdgeKind,
    pub(crate) target: NodeID,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Node {
    id: NodeID,
    edges: Vec<Edge>,
}

impl Node {
    fn new(id: NodeID) -> Self {
        Self {
            id,
            edges: Vec::new(),
        }
    }

    pub(crate) fn id(&self) -> NodeID {
        self.id
    }

    /// The outgoing edges in priority order.
    pub(crate) fn edges(&self) -> &[Edge] {
        &self.edges
    }

    fn offset(&mut self, offset: usize) {
        self.id = NodeID::new(self.id.id() + offset as NodeIDBase);
        for edge in self.edges.iter_mut() {
            edge.target = NodeID::new(edge.target.id() + offset as NodeIDBase);
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct EpsilonNfa {
    nodes: Vec<Node>,
    start: NodeID,
    end: NodeID,
    // The highest capture index used in the pattern
    group_count: usize,
}

impl Default for EpsilonNfa {
    fn default() -> Self {
        Self::new()
    }
}

impl EpsilonNfa {
    /// An NFA with a single node that matches the empty string.
    pub(crate) fn new() -> Self {
        Self {
            nodes: vec![Node::default()],
            start: NodeID::default(),
            end: NodeID::default(),
            group_count: 0,
        }
    }

    /// Builds the epsilon NFA for the given HIR. The number of nodes is checked against the
    /// given limit while the automaton grows.
    pub(crate) fn try_from_hir(hir: &Hir, max_states: usize) -> Result<Self> {
        let mut nfa = EpsilonNfa::new();
        match hir.kind() {
            HirKind::Empty => {}
            HirKind::Literal(literal) => {
                let text = std::str::from_utf8(&literal.0)
                    .map_err(|_| unsupported!("Literal that is not valid UTF-8"))?;
                for c in text.chars() {
                    nfa.concat(EpsilonNfa::single(CodePointMatcher::from_char(c)));
                }
            }
            HirKind::Class(Class::Unicode(class)) => {
                nfa = EpsilonNfa::single(CodePointMatcher::from_ranges(
                    class
                        .ranges()
                        .iter()
                        .map(|r| (r.start() as u32, r.end() as u32)),
                ));
            }
            HirKind::Class(Class::Bytes(class)) => {
                if class.ranges().iter().any(|r| r.end() > 0x7F) {
                    return Err(unsupported!("Byte class with non-ASCII bytes"));
                }
                nfa = EpsilonNfa::single(CodePointMatcher::from_ranges(
                    class
                        .ranges()
                        .iter()
                        .map(|r| (r.start() as u32, r.end() as u32)),
                ));
            }
            HirKind::Look(look) => match look {
                Look::Start => nfa = EpsilonNfa::assertion(Assertion::StartText),
                Look::End => nfa = EpsilonNfa::assertion(Assertion::EndText),
                _ => return Err(unsupported!(format!("Assertion {:?}", look))),
            },
            HirKind::Repetition(repetition) => {
                let sub = EpsilonNfa::try_from_hir(&repetition.sub, max_states)?;
                nfa = sub.repeat(
                    repetition.min,
                    repetition.max,
                    repetition.greedy,
                    max_states,
                )?;
            }
            HirKind::Capture(capture) => {
                nfa = EpsilonNfa::try_from_hir(&capture.sub, max_states)?;
                nfa.group(capture.index);
            }
            HirKind::Concat(hirs) => {
                for hir in hirs {
                    nfa.concat(EpsilonNfa::try_from_hir(hir, max_states)?);
                    nfa.check_size(max_states)?;
                }
            }
            HirKind::Alternation(hirs) => {
                let mut hirs = hirs.iter();
                if let Some(first) = hirs.next() {
                    nfa = EpsilonNfa::try_from_hir(first, max_states)?;
                }
                for hir in hirs {
                    nfa.alternation(EpsilonNfa::try_from_hir(hir, max_states)?);
                    nfa.check_size(max_states)?;
                }
            }
        }
        nfa.check_size(max_states)?;
        Ok(nfa)
    }

    /// An NFA with one edge that consumes a code point matched by the matcher.
    pub(crate) fn single(matcher: CodePointMatcher) -> Self {
        let mut nfa = EpsilonNfa::new();
        let end = nfa.new_node();
        // A class that matches nothing leaves the end node unreachable.
        if !matcher.is_empty() {
            nfa.add_edge(nfa.start, EdgeKind::Char(matcher), end);
        }
        nfa.end = end;
        nfa
    }

    pub(crate) fn assertion(assertion: Assertion) -> Self {
        let mut nfa = EpsilonNfa::new();
        let end = nfa.new_node();
        nfa.add_edge(nfa.start, EdgeKind::Assert(assertion), end);
        nfa.end = end;
        nfa
    }

    // Returns true if the NFA is a single node without edges.
    pub(crate) fn is_empty(&self) -> bool {
        self.nodes.len() == 1 && self.nodes[0].edges.is_empty()
    }

    pub(crate) fn start(&self) -> NodeID {
        self.start
    }

    pub(crate) fn end(&self) -> NodeID {
        self.end
    }

    pub(crate) fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub(crate) fn group_count(&self) -> usize {
        self.group_count
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn check_size(&self, max_states: usize) -> Result<()> {
        if self.nodes.len() > max_states {
            Err(too_large!("NFA states", max_states))
        } else {
            Ok(())
        }
    }

    pub(crate) fn new_node(&mut self) -> NodeID {
        let id = NodeID::new(self.nodes.len() as NodeIDBase);
        self.nodes.push(Node::new(id));
        id
    }

    /// Appends an edge to the node. The edge has lower priority than all edges added before.
    pub(crate) fn add_edge(&mut self, from: NodeID, kind: EdgeKind, target: NodeID) {
        self.nodes[from].edges.push(Edge { kind, target });
    }

    pub(crate) fn set_start(&mut self, start: NodeID) {
        self.start = start;
    }

    pub(crate) fn set_end(&mut self, end: NodeID) {
        self.end = end;
    }

    /// Apply an offset to every node number.
    pub(crate) fn shift_ids(&mut self, offset: usize) -> (NodeID, NodeID) {
        for node in self.nodes.iter_mut() {
            node.offset(offset);
        }
        self.start = NodeID::new(self.start.id() + offset as NodeIDBase);
        self.end = NodeID::new(self.end.id() + offset as NodeIDBase);
        (self.start, self.end)
    }

    /// Move the nodes of the given NFA to the current NFA. The ids of the given NFA must already
    /// be shifted behind the current nodes.
    pub(crate) fn append(&mut self, mut nfa: EpsilonNfa) {
        self.nodes.append(&mut nfa.nodes);
        self.group_count = self.group_count.max(nfa.group_count);
        debug_assert!(self
            .nodes
            .iter()
            .enumerate()
            .all(|(i, n)| n.id().as_usize() == i));
    }

    /// Concatenates the current NFA with another NFA.
    pub(crate) fn concat(&mut self, mut nfa: EpsilonNfa) {
        if self.is_empty() {
            let group_count = self.group_count.max(nfa.group_count);
            *self = nfa;
            self.group_count = group_count;
            return;
        }
        let (nfa_start, nfa_end) = nfa.shift_ids(self.nodes.len());
        self.append(nfa);
        self.add_edge(self.end, EdgeKind::Epsilon, nfa_start);
        self.end = nfa_end;
    }

    /// Alternation of the current NFA and the given one. The current NFA has higher priority.
    pub(crate) fn alternation(&mut self, mut nfa: EpsilonNfa) {
        let (nfa_start, nfa_end) = nfa.shift_ids(self.nodes.len());
        self.append(nfa);

        let start = self.new_node();
        self.add_edge(start, EdgeKind::Epsilon, self.start);
        self.add_edge(start, EdgeKind::Epsilon, nfa_start);

        let end = self.new_node();
        self.add_edge(self.end, EdgeKind::Epsilon, end);
        self.add_edge(nfa_end, EdgeKind::Epsilon, end);

        self.start = start;
        self.end = end;
    }

    // Adds the two edges of a decision point in the order given by the greediness.
    fn add_choice(&mut self, from: NodeID, take: NodeID, skip: NodeID, greedy: bool) {
        if greedy {
            self.add_edge(from, EdgeKind::Epsilon, take);
            self.add_edge(from, EdgeKind::Epsilon, skip);
        } else {
            self.add_edge(from, EdgeKind::Epsilon, skip);
            self.add_edge(from, EdgeKind::Epsilon, take);
        }
    }

    pub(crate) fn zero_or_one(&mut self, greedy: bool) {
        let start = self.new_node();
        self.add_choice(start, self.start, self.end, greedy);
        self.start = start;
    }

    pub(crate) fn one_or_more(&mut self, greedy: bool) {
        let start = self.new_node();
        self.add_edge(start, EdgeKind::Epsilon, self.start);
        let end = self.new_node();
        self.add_choice(self.end, self.start, end, greedy);
        self.start = start;
        self.end = end;
    }

    pub(crate) fn zero_or_more(&mut self, greedy: bool) {
        let start = self.new_node();
        let end = self.new_node();
        self.add_choice(start, self.start, end, greedy);
        self.add_choice(self.end, self.start, end, greedy);
        self.start = start;
        self.end = end;
    }

    /// Wraps the NFA into the boundary edges of the capture group with the given index.
    pub(crate) fn group(&mut self, index: u32) {
        let start = self.new_node();
        let end = self.new_node();
        self.add_edge(start, EdgeKind::Group(GroupBoundary::Start(index)), self.start);
        self.add_edge(self.end, EdgeKind::Group(GroupBoundary::End(index)), end);
        self.start = start;
        self.end = end;
        self.group_count = self.group_count.max(index as usize);
    }

    /// Counted repetition `{min,max}`. The sub automaton is copied for every mandatory and every
    /// optional iteration, an unbounded tail becomes a loop.
    pub(crate) fn repeat(
        self,
        min: u32,
        max: Option<u32>,
        greedy: bool,
        max_states: usize,
    ) -> Result<Self> {
        let mut nfa = EpsilonNfa::new();
        match max {
            None if min > 0 => {
                for _ in 1..min {
                    nfa.concat(self.clone());
                    nfa.check_size(max_states)?;
                }
                let mut plus = self;
                plus.one_or_more(greedy);
                nfa.concat(plus);
            }
            None => {
                let mut star = self;
                star.zero_or_more(greedy);
                nfa.concat(star);
            }
            Some(max) => {
                for _ in 0..min {
                    nfa.concat(self.clone());
                    nfa.check_size(max_states)?;
                }
                let mut optional = self;
                optional.zero_or_one(greedy);
                for _ in min..max {
                    nfa.concat(optional.clone());
                    nfa.check_size(max_states)?;
                }
            }
        }
        nfa.check_size(max_states)?;
        Ok(nfa)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::internal::parse_regex_syntax;

    struct TestData {
        input: &'static str,
        expected_nodes: usize,
        expected_start: usize,
        expected_end: usize,
    }

    const TEST_DATA: &[TestData] = &[
        TestData {
            input: "a",
            expected_nodes: 2,
            expected_start: 0,
            expected_end: 1,
        },
        TestData {
            input: "ab",
            expected_nodes: 4,
            expected_start: 0,
            expected_end: 3,
        },
        TestData {
            input: "a*",
            expected_nodes: 4,
            expected_start: 2,
            expected_end: 3,
        },
        TestData {
            input: "a+",
            expected_nodes: 4,
            expected_start: 2,
            expected_end: 3,
        },
        TestData {
            input: "a?",
            expected_nodes: 3,
            expected_start: 2,
            expected_end: 1,
        },
        TestData {
            input: "(a)",
            expected_nodes: 4,
            expected_start: 2,
            expected_end: 3,
        },
        TestData {
            input: "a{3}",
            expected_nodes: 6,
            expected_start: 0,
            expected_end: 5,
        },
    ];

    #[test]
    fn test_try_from_hir() {
        for data in TEST_DATA {
            let hir = parse_regex_syntax(data.input).unwrap();
            let nfa = EpsilonNfa::try_from_hir(&hir, 1000).unwrap();
            assert_eq!(nfa.len(), data.expected_nodes, "input: {}", data.input);
            assert_eq!(
                nfa.start().as_usize(),
                data.expected_start,
                "input: {}",
                data.input
            );
            assert_eq!(
                nfa.end().as_usize(),
                data.expected_end,
                "input: {}",
                data.input
            );
        }
    }

    #[test]
    fn test_greedy_and_lazy_edge_order() {
        let mut greedy = EpsilonNfa::single(CodePointMatcher::from_char('a'));
        greedy.zero_or_more(true);
        let first = &greedy.nodes()[greedy.start()].edges()[0];
        assert_ne!(first.target, greedy.end(), "greedy prefers the loop body");

        let mut lazy = EpsilonNfa::single(CodePointMatcher::from_char('a'));
        lazy.zero_or_more(false);
        let first = &lazy.nodes()[lazy.start()].edges()[0];
        assert_eq!(first.target, lazy.end(), "lazy prefers the exit");
    }

    #[test]
    fn test_alternation_keeps_order() {
        let mut nfa = EpsilonNfa::single(CodePointMatcher::from_char('a'));
        nfa.alternation(EpsilonNfa::single(CodePointMatcher::from_char('b')));
        let edges = nfa.nodes()[nfa.start()].edges();
        assert_eq!(edges.len(), 2);
        assert_eq!(edges[0].target.as_usize(), 0);
        assert_eq!(edges[1].target.as_usize(), 2);
    }

    #[test]
    fn test_groups_are_counted() {
        let hir = parse_regex_syntax("(a)(?:b)(c(d))").unwrap();
        let nfa = EpsilonNfa::try_from_hir(&hir, 1000).unwrap();
        assert_eq!(nfa.group_count(), 3);
    }

    #[test]
    fn test_unsupported_assertion() {
        let hir = parse_regex_syntax(r"\bword").unwrap();
        let err = EpsilonNfa::try_from_hir(&hir, 1000).unwrap_err();
        assert!(matches!(
            err.kind(),
            crate::RxErrorKind::UnsupportedFeature(_)
        ));
    }

    #[test]
    fn test_size_limit() {
        let hir = parse_regex_syntax("a{100}").unwrap();
        let err = EpsilonNfa::try_from_hir(&hir, 50).unwrap_err();
        assert!(err.is_too_large());
    }
}
