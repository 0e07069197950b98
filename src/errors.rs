use thiserror::Error;

/// The result type for the `rxdfa` crate.
pub type Result<T> = std::result::Result<T, RxError>;

/// The error type for the `rxdfa` crate.
#[derive(Error, Debug)]
pub struct RxError {
    /// The source of the error.
    pub source: Box<RxErrorKind>,
}

impl RxError {
    /// Create a new `RxError`.
    pub fn new(kind: RxErrorKind) -> Self {
        RxError {
            source: Box::new(kind),
        }
    }

    /// Returns the kind of the error.
    pub fn kind(&self) -> &RxErrorKind {
        &self.source
    }

    /// Returns true if the error signals that an automaton exceeded its configured budget.
    /// Callers are expected to fall back to a non-DFA execution strategy in this case.
    pub fn is_too_large(&self) -> bool {
        matches!(*self.source, RxErrorKind::AutomatonTooLarge { .. })
    }
}

impl std::fmt::Display for RxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.source)
    }
}

/// The error kind type.
#[derive(Error, Debug)]
pub enum RxErrorKind {
    /// An error occurred during the parsing of the regex syntax.
    #[error("'{1}' {0}")]
    RegexSyntaxError(regex_syntax::Error, String),

    /// A std::io error occurred.
    #[error(transparent)]
    IoError(#[from] std::io::Error),

    /// Used regex features that are not supported.
    #[error("Unsupported regex feature: {0}")]
    UnsupportedFeature(String),

    /// The NFA or the DFA grew beyond the configured budget.
    #[error("Automaton too large: more than {limit} {what}")]
    AutomatonTooLarge {
        /// The kind of element that exceeded the limit, e.g. "DFA states".
        what: &'static str,
        /// The configured limit.
        limit: usize,
    },

    /// An argument passed to a matching function is out of range.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// An automaton was assembled in a way that violates its invariants.
    #[error("Malformed automaton: {0}")]
    MalformedAutomaton(String),
}

impl From<regex_syntax::Error> for RxError {
    fn from(error: regex_syntax::Error) -> Self {
        RxError::new(RxErrorKind::RegexSyntaxError(error, "!".to_string()))
    }
}

impl From<std::io::Error> for RxError {
    fn from(error: std::io::Error) -> Self {
        RxError::new(RxErrorKind::IoError(error))
    }
}

macro_rules! unsupported {
    ($feature:expr) => {
        $crate::RxError::new($crate::RxErrorKind::UnsupportedFeature(
            $feature.to_string(),
        ))
    };
}
pub(crate) use unsupported;

macro_rules! too_large {
    ($what:expr, $limit:expr) => {
        $crate::RxError::new($crate::RxErrorKind::AutomatonTooLarge {
            what: $what,
            limit: $limit,
        })
    };
}
pub(crate) use too_large;

macro_rules! invalid_argument {
    ($($arg:tt)*) => {
        $crate::RxError::new($crate::RxErrorKind::InvalidArgument(format!($($arg)*)))
    };
}
pub(crate) use invalid_argument;
