use crate::Span;

/// A match of a compiled automaton.
///
/// The offsets are code point offsets when the match comes from
/// [crate::CompiledAutomaton::search] and byte offsets when it comes from the [crate::Regex]
/// facade.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MatchResult {
    span: Span,
    pattern: usize,
    // Capture groups 1..=n
    groups: Vec<Option<Span>>,
}

impl MatchResult {
    /// Creates a new match result.
    pub fn new(span: Span, pattern: usize, groups: Vec<Option<Span>>) -> Self {
        Self {
            span,
            pattern,
            groups,
        }
    }

    /// The span of the whole match.
    #[inline]
    pub fn span(&self) -> Span {
        self.span
    }

    /// The start offset of the match.
    #[inline]
    pub fn start(&self) -> usize {
        self.span.start
    }

    /// The end offset of the match.
    #[inline]
    pub fn end(&self) -> usize {
        self.span.end
    }

    /// The index of the pattern that matched.
    #[inline]
    pub fn pattern(&self) -> usize {
        self.pattern
    }

    /// The span of the capture group with the given index. Group 0 is the whole match.
    /// Returns `None` for groups that did not participate in the match.
    pub fn group(&self, index: usize) -> Option<Span> {
        if index == 0 {
            Some(self.span)
        } else {
            self.groups.get(index - 1).copied().flatten()
        }
    }

    /// The capture groups `1..=n`.
    pub fn groups(&self) -> &[Option<Span>] {
        &self.groups
    }

    /// Maps all offsets through the given function.
    pub(crate) fn map_offsets<F>(self, f: F) -> Self
    where
        F: Fn(usize) -> usize,
    {
        Self {
            span: self.span.map(&f),
            pattern: self.pattern,
            groups: self
                .groups
                .into_iter()
                .map(|g| g.map(|s| s.map(&f)))
                .collect(),
        }
    }
}

impl std::fmt::Display for MatchResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "pattern {} at {}", self.pattern, self.span)?;
        for (i, group) in self.groups.iter().enumerate() {
            match group {
                Some(span) => write!(f, ", group {}: {}", i + 1, span)?,
                None => write!(f, ", group {}: -", i + 1)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_zero_is_span() {
        let m = MatchResult::new(Span::new(2, 5), 1, vec![Some(Span::new(3, 4)), None]);
        assert_eq!(m.group(0), Some(Span::new(2, 5)));
        assert_eq!(m.group(1), Some(Span::new(3, 4)));
        assert_eq!(m.group(2), None);
        assert_eq!(m.group(3), None);
        assert_eq!(
            m.to_string(),
            "pattern 1 at 2..5, group 1: 3..4, group 2: -"
        );
    }

    #[test]
    fn test_map_offsets() {
        let m = MatchResult::new(Span::new(1, 2), 0, vec![Some(Span::new(1, 2))]);
        let m = m.map_offsets(|o| o * 2);
        assert_eq!(m.span(), Span::new(2, 4));
        assert_eq!(m.group(1), Some(Span::new(2, 4)));
    }
}
