//! Module with the pattern type.

/// A pattern that is compiled into the automaton.
///
/// The pattern is a regular expression in the syntax of the `regex-syntax` crate. When several
/// patterns are compiled together, their position in the pattern list is their priority: lower
/// indices win when two patterns match at the same start position.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Pattern {
    pattern: String,
}

impl Pattern {
    /// Create a new pattern.
    pub fn new<S: Into<String>>(pattern: S) -> Self {
        Self {
            pattern: pattern.into(),
        }
    }

    /// Get the pattern.
    #[inline]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

impl From<&str> for Pattern {
    fn from(pattern: &str) -> Self {
        Pattern::new(pattern)
    }
}

impl std::fmt::Display for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.pattern.escape_default())
    }
}
