//! This module contains the parser for the regex syntax.
//! We use the `regex_syntax` crate to parse the pattern into its high-level intermediate
//! representation (HIR). Case folding and the resolution of Unicode and Perl classes into
//! code point ranges are already done there.

use crate::{Result, RxError, RxErrorKind};
use log::trace;
use std::time::Instant;

/// Parse the regex syntax into an high-level intermediate representation (HIR).
/// # Errors
/// An error is returned if the regex syntax is invalid. The error carries the pattern.
pub(crate) fn parse_regex_syntax(input: &str) -> Result<regex_syntax::hir::Hir> {
    let now = Instant::now();
    match regex_syntax::parse(input) {
        Ok(hir) => {
            trace!(
                "Parsing '{}' took {} microseconds.",
                input.escape_default(),
                now.elapsed().as_micros()
            );
            Ok(hir)
        }
        Err(e) => Err(RxError::new(RxErrorKind::RegexSyntaxError(
            e,
            input.escape_default().to_string(),
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex_syntax::hir::HirKind;

    #[test]
    fn test_parse_regex_syntax_valid() {
        let hir = parse_regex_syntax(r"\d").unwrap();
        assert!(matches!(hir.into_kind(), HirKind::Class(_)));
    }

    #[test]
    fn test_parse_regex_syntax_invalid() {
        let err = parse_regex_syntax(r"^\d{4}-\d{2}-\d{2}$[").unwrap_err();
        match err.kind() {
            RxErrorKind::RegexSyntaxError(_, pattern) => assert!(pattern.ends_with('[')),
            other => panic!("Unexpected error kind {:?}", other),
        }
    }

    #[test]
    fn test_parse_regex_syntax_empty() {
        let hir = parse_regex_syntax("").unwrap();
        assert!(matches!(hir.into_kind(), HirKind::Empty));
    }

    #[test]
    fn test_look_around_is_rejected_by_parser() {
        assert!(parse_regex_syntax(r"a(?=b)").is_err());
    }
}
