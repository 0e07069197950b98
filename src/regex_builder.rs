use crate::{AutomatonConfig, Pattern, Regex, Result};

/// A builder for creating a [Regex].
#[derive(Debug, Clone, Default)]
pub struct RegexBuilder {
    patterns: Vec<Pattern>,
    config: AutomatonConfig,
}

impl RegexBuilder {
    /// Creates a new regex builder.
    pub fn new() -> Self {
        Self {
            patterns: Vec::new(),
            config: AutomatonConfig::default(),
        }
    }

    /// Adds a pattern. Patterns added earlier have higher priority.
    pub fn add_pattern<P: Into<Pattern>>(mut self, pattern: P) -> Self {
        self.patterns.push(pattern.into());
        self
    }

    /// Adds multiple patterns.
    pub fn add_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.patterns
            .extend(patterns.into_iter().map(|p| Pattern::new(p.as_ref())));
        self
    }

    /// Sets the limits and switches for the construction of the automata.
    pub fn config(mut self, config: AutomatonConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds the regex.
    ///
    /// # Errors
    /// Syntax errors and unsupported features of the patterns, and `AutomatonTooLarge` if the
    /// NFA exceeds its budget. DFA budgets never fail the build, the regex falls back to NFA
    /// simulation instead.
    pub fn build(self) -> Result<Regex> {
        Regex::new(self.patterns, &self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn test_regex_builder() {
        init();
        let regex = RegexBuilder::new()
            .add_pattern(r"\d+")
            .add_patterns([r"[a-z]+", r"\s+"])
            .build()
            .unwrap();
        assert_eq!(regex.pattern_count(), 3);
        assert_eq!(regex.patterns()[1].pattern(), "[a-z]+");
    }

    #[test]
    fn test_syntax_error() {
        init();
        let err = RegexBuilder::new().add_pattern("a(b").build().unwrap_err();
        assert!(matches!(
            err.kind(),
            crate::RxErrorKind::RegexSyntaxError(_, _)
        ));
    }

    #[test]
    fn test_nfa_budget() {
        init();
        let err = RegexBuilder::new()
            .add_pattern("a{1000}")
            .config(AutomatonConfig::default().with_max_nfa_states(100))
            .build()
            .unwrap_err();
        assert!(err.is_too_large());
    }

    #[test]
    fn test_nfa_transition_budget() {
        init();
        let err = RegexBuilder::new()
            .add_pattern("(?:a?){2000}")
            .config(AutomatonConfig::default().with_max_nfa_transitions(10_000))
            .build()
            .unwrap_err();
        assert!(err.is_too_large());
        // The default budget stops it as well
        let err = RegexBuilder::new()
            .add_pattern("(?:a?){2000}")
            .build()
            .unwrap_err();
        assert!(err.is_too_large());
    }
}
