//! This module contains the implementation of the multi-pattern epsilon NFA.
//! All patterns are combined into one epsilon NFA. Node 0 is the common start node, its epsilon
//! edges lead to the start nodes of the patterns in priority order. The end node of every
//! pattern gets an accept edge, which carries the pattern index, to the common end node.

use log::trace;

use crate::{Pattern, Result};

use super::{
    parse_regex_syntax,
    epsilon_nfa::{EdgeKind, EpsilonNfa},
    ids::PatternIDBase,
    NodeID, PatternID,
};

#[derive(Debug, Clone)]
pub(crate) struct MultiPatternNfa {
    patterns: Vec<Pattern>,
    nfa: EpsilonNfa,
}

impl MultiPatternNfa {
    pub(crate) fn try_from_patterns(patterns: &[Pattern], max_states: usize) -> Result<Self> {
        let mut nfa = EpsilonNfa::new();
        let root = nfa.start();
        let mut ends = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            let hir = parse_regex_syntax(pattern.pattern())?;
            let mut pattern_nfa = EpsilonNfa::try_from_hir(&hir, max_states)?;
            let (start, end) = pattern_nfa.shift_ids(nfa.len());
            nfa.append(pattern_nfa);
            nfa.add_edge(root, EdgeKind::Epsilon, start);
            ends.push(end);
            nfa.check_size(max_states)?;
        }
        let end = nfa.new_node();
        for (i, pattern_end) in ends.into_iter().enumerate() {
            nfa.add_edge(
                pattern_end,
                EdgeKind::Accept(PatternID::new(i as PatternIDBase)),
                end,
            );
        }
        nfa.set_start(root);
        nfa.set_end(end);
        nfa.check_size(max_states)?;
        trace!(
            "Multi-pattern epsilon NFA with {} patterns has {} nodes",
            patterns.len(),
            nfa.len()
        );
        Ok(Self {
            patterns: patterns.to_vec(),
            nfa,
        })
    }

    pub(crate) fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    pub(crate) fn nfa(&self) -> &EpsilonNfa {
        &self.nfa
    }

    /// The common start node.
    pub(crate) fn root(&self) -> NodeID {
        self.nfa.start()
    }

    /// The common end node that is the target of all accept edges.
    pub(crate) fn end(&self) -> NodeID {
        self.nfa.end()
    }

    pub(crate) fn group_count(&self) -> usize {
        self.nfa.group_count()
    }

    /// The pattern whose start node is the target of the given edge of the root node.
    pub(crate) fn pattern_of_root_edge(&self, edge_index: usize) -> PatternID {
        PatternID::new(edge_index as PatternIDBase)
    }
}
