use log::error;

use crate::{regex::Haystack, MatchResult, Regex, Result, RxError};

/// An iterator over all non-overlapping matches.
///
/// The iterator yields a [`MatchResult`] with byte offsets until no more matches could be
/// found. An empty match that ends where the previous match ended is skipped, so the iteration
/// always makes progress.
///
/// A failing search ends the iteration. The error is kept and can be retrieved with
/// [`FindMatches::error`]. Use [`FindMatches::try_next_match`] to get it right away.
///
/// * `'r` represents the lifetime of the regex.
/// * `'h` represents the lifetime of the haystack being searched.
///
/// This iterator can be created with the [`crate::Regex::find_iter`] method.
#[derive(Debug)]
pub struct FindMatches<'r, 'h> {
    regex: &'r Regex,
    haystack: Haystack<'h>,
    // Code point index where the next search starts
    position: usize,
    last_end: Option<usize>,
    done: bool,
    error: Option<RxError>,
}

impl<'r, 'h> FindMatches<'r, 'h> {
    /// Creates a new `FindMatches` iterator.
    pub(crate) fn new(regex: &'r Regex, haystack: Haystack<'h>) -> Self {
        Self {
            regex,
            haystack,
            position: 0,
            last_end: None,
            done: false,
            error: None,
        }
    }

    /// Retrieve the byte offset where the next search starts.
    #[inline]
    pub fn offset(&self) -> usize {
        self.haystack
            .byte_offset(self.position.min(self.haystack.code_points().len()))
    }

    /// The error that ended the iteration, if any.
    pub fn error(&self) -> Option<&RxError> {
        self.error.as_ref()
    }

    /// Returns the next match in the haystack.
    ///
    /// If no match is found or a search failed, `None` is returned.
    pub fn next_match(&mut self) -> Option<MatchResult> {
        match self.try_next_match() {
            Ok(result) => result,
            Err(e) => {
                error!("Search at {} failed: {}", self.position, e);
                self.done = true;
                self.error = Some(e);
                None
            }
        }
    }

    /// Returns the next match in the haystack, or the error of the failed search.
    pub fn try_next_match(&mut self) -> Result<Option<MatchResult>> {
        let len = self.haystack.code_points().len();
        while !self.done {
            let Some(result) =
                self.regex
                    .search(self.haystack.code_points(), self.position, false)?
            else {
                self.done = true;
                break;
            };
            if result.span().is_empty() && Some(result.end()) == self.last_end {
                if result.end() >= len {
                    self.done = true;
                    break;
                }
                self.position = result.end() + 1;
                continue;
            }
            self.position = result.end();
            self.last_end = Some(result.end());
            return Ok(Some(self.haystack.to_bytes(result)));
        }
        Ok(None)
    }
}

impl Iterator for FindMatches<'_, '_> {
    type Item = MatchResult;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_match()
    }
}

#[cfg(test)]
mod tests {
    use crate::{RegexBuilder, RxErrorKind, Span};

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn test_find_iter() {
        init();
        let regex = RegexBuilder::new()
            .add_patterns([r"\d+", r"[a-z]+"])
            .build()
            .unwrap();
        let matches: Vec<(usize, Span)> = regex
            .find_iter("ab 12 c3")
            .map(|m| (m.pattern(), m.span()))
            .collect();
        assert_eq!(
            matches,
            vec![
                (1, Span::new(0, 2)),
                (0, Span::new(3, 5)),
                (1, Span::new(6, 7)),
                (0, Span::new(7, 8))
            ]
        );
    }

    #[test]
    fn test_empty_matches() {
        init();
        let regex = RegexBuilder::new().add_pattern("a*").build().unwrap();
        let spans: Vec<Span> = regex.find_iter("baaé").map(|m| m.span()).collect();
        assert_eq!(
            spans,
            vec![Span::new(0, 0), Span::new(1, 3), Span::new(5, 5)]
        );
    }

    #[test]
    fn test_offset() {
        init();
        let regex = RegexBuilder::new().add_pattern("é").build().unwrap();
        let mut find_iter = regex.find_iter("éaé");
        assert_eq!(find_iter.offset(), 0);
        assert_eq!(find_iter.next().unwrap().span(), Span::new(0, 2));
        assert_eq!(find_iter.offset(), 2);
        assert_eq!(find_iter.next().unwrap().span(), Span::new(3, 5));
        assert_eq!(find_iter.next(), None);
    }

    #[test]
    fn test_failed_search_ends_iteration() {
        init();
        let regex = RegexBuilder::new().add_pattern("a").build().unwrap();
        let mut find_iter = regex.find_iter("aa");
        assert_eq!(find_iter.next().unwrap().span(), Span::new(0, 1));
        // A start beyond the haystack makes the next search fail
        find_iter.position = 5;
        assert_eq!(find_iter.next(), None);
        assert!(matches!(
            find_iter.error().unwrap().kind(),
            RxErrorKind::InvalidArgument(_)
        ));
        assert_eq!(find_iter.next(), None);
        assert!(find_iter.try_next_match().unwrap().is_none());
    }

    #[test]
    fn test_try_next_match() {
        init();
        let regex = RegexBuilder::new().add_pattern("a*").build().unwrap();
        let mut find_iter = regex.find_iter("");
        assert_eq!(
            find_iter.try_next_match().unwrap().unwrap().span(),
            Span::new(0, 0)
        );
        assert!(find_iter.try_next_match().unwrap().is_none());
        assert!(find_iter.error().is_none());
    }
}
