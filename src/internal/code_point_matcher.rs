//! Predicates over a single code point.
//!
//! A [CodePointMatcher] is a set of code points kept in canonical form. The variant is chosen
//! from the normalized range list, so structural equality is set equality and a matcher can be
//! used directly as part of hash keys.
//! The matchers form a Boolean algebra: intersection, difference, union and complement of two
//! matchers are again matchers. The DFA builder relies on this to partition the overlapping
//! input conditions of NFA transitions into disjoint ranges.

/// The highest valid Unicode code point.
pub const MAX_CODE_POINT: u32 = 0x10FFFF;

/// A closed set of code points.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CodePointMatcher {
    /// Matches nothing.
    #[default]
    Empty,
    /// Matches exactly one code point.
    Single(u32),
    /// Matches all code points in the inclusive range.
    Range(u32, u32),
    /// Matches any code point of two or more disjoint, non-adjacent ranges.
    /// Each range is packed into one word as `lo << 32 | hi`, the words are sorted ascending.
    BitSet(Box<[u64]>),
    /// Matches every code point.
    Any,
}

#[inline]
fn pack(lo: u32, hi: u32) -> u64 {
    ((lo as u64) << 32) | hi as u64
}

#[inline]
fn unpack(word: u64) -> (u32, u32) {
    ((word >> 32) as u32, word as u32)
}

impl CodePointMatcher {
    /// Creates a matcher from arbitrary, possibly overlapping inclusive ranges.
    /// Ranges with `lo > hi` are ignored and bounds are clamped to [MAX_CODE_POINT].
    pub fn from_ranges<I>(ranges: I) -> Self
    where
        I: IntoIterator<Item = (u32, u32)>,
    {
        let mut ranges: Vec<(u32, u32)> = ranges
            .into_iter()
            .filter(|(lo, hi)| lo <= hi && *lo <= MAX_CODE_POINT)
            .map(|(lo, hi)| (lo, hi.min(MAX_CODE_POINT)))
            .collect();
        ranges.sort_unstable();
        let mut merged: Vec<(u32, u32)> = Vec::with_capacity(ranges.len());
        for (lo, hi) in ranges {
            match merged.last_mut() {
                Some(last) if lo <= last.1.saturating_add(1) => last.1 = last.1.max(hi),
                _ => merged.push((lo, hi)),
            }
        }
        Self::from_normalized(merged)
    }

    /// Chooses the canonical variant for a sorted, merged range list.
    fn from_normalized(ranges: Vec<(u32, u32)>) -> Self {
        match ranges.as_slice() {
            [] => CodePointMatcher::Empty,
            [(0, MAX_CODE_POINT)] => CodePointMatcher::Any,
            [(lo, hi)] if lo == hi => CodePointMatcher::Single(*lo),
            [(lo, hi)] => CodePointMatcher::Range(*lo, *hi),
            _ => CodePointMatcher::BitSet(ranges.iter().map(|(lo, hi)| pack(*lo, *hi)).collect()),
        }
    }

    /// Creates a matcher for a single character.
    #[inline]
    pub fn from_char(c: char) -> Self {
        CodePointMatcher::Single(c as u32)
    }

    /// Returns the normalized ranges of the matcher.
    pub fn ranges(&self) -> Vec<(u32, u32)> {
        match self {
            CodePointMatcher::Empty => Vec::new(),
            CodePointMatcher::Single(c) => vec![(*c, *c)],
            CodePointMatcher::Range(lo, hi) => vec![(*lo, *hi)],
            CodePointMatcher::BitSet(words) => words.iter().map(|w| unpack(*w)).collect(),
            CodePointMatcher::Any => vec![(0, MAX_CODE_POINT)],
        }
    }

    /// Returns true if the code point is a member of the set.
    #[inline]
    pub fn matches(&self, c: u32) -> bool {
        match self {
            CodePointMatcher::Empty => false,
            CodePointMatcher::Single(s) => *s == c,
            CodePointMatcher::Range(lo, hi) => *lo <= c && c <= *hi,
            CodePointMatcher::BitSet(words) => {
                // Index of the first range whose start is greater than c.
                let i = words.partition_point(|w| unpack(*w).0 <= c);
                i > 0 && c <= unpack(words[i - 1]).1
            }
            CodePointMatcher::Any => c <= MAX_CODE_POINT,
        }
    }

    /// Returns true if the matcher matches nothing.
    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, CodePointMatcher::Empty)
    }

    /// Returns the number of code points matched.
    pub fn count(&self) -> u64 {
        self.ranges()
            .iter()
            .map(|(lo, hi)| (*hi - *lo) as u64 + 1)
            .sum()
    }

    /// The set of code points matched by both matchers.
    pub fn intersect(&self, other: &CodePointMatcher) -> CodePointMatcher {
        match (self, other) {
            (CodePointMatcher::Empty, _) | (_, CodePointMatcher::Empty) => CodePointMatcher::Empty,
            (CodePointMatcher::Any, m) | (m, CodePointMatcher::Any) => m.clone(),
            (CodePointMatcher::Single(c), m) | (m, CodePointMatcher::Single(c)) => {
                if m.matches(*c) {
                    CodePointMatcher::Single(*c)
                } else {
                    CodePointMatcher::Empty
                }
            }
            (CodePointMatcher::Range(l1, h1), CodePointMatcher::Range(l2, h2)) => {
                CodePointMatcher::from_ranges([(*l1.max(l2), *h1.min(h2))])
            }
            _ => {
                let lhs = self.ranges();
                let rhs = other.ranges();
                let mut result = Vec::new();
                let (mut i, mut j) = (0, 0);
                while i < lhs.len() && j < rhs.len() {
                    let lo = lhs[i].0.max(rhs[j].0);
                    let hi = lhs[i].1.min(rhs[j].1);
                    if lo <= hi {
                        result.push((lo, hi));
                    }
                    if lhs[i].1 < rhs[j].1 {
                        i += 1;
                    } else {
                        j += 1;
                    }
                }
                Self::from_normalized(result)
            }
        }
    }

    /// The set of code points matched by this matcher but not by `other`.
    pub fn subtract(&self, other: &CodePointMatcher) -> CodePointMatcher {
        match (self, other) {
            (CodePointMatcher::Empty, _) | (_, CodePointMatcher::Any) => CodePointMatcher::Empty,
            (m, CodePointMatcher::Empty) => m.clone(),
            (CodePointMatcher::Single(c), m) => {
                if m.matches(*c) {
                    CodePointMatcher::Empty
                } else {
                    CodePointMatcher::Single(*c)
                }
            }
            _ => self.intersect(&other.complement()),
        }
    }

    /// The set of code points matched by at least one of the matchers.
    pub fn union(&self, other: &CodePointMatcher) -> CodePointMatcher {
        match (self, other) {
            (CodePointMatcher::Any, _) | (_, CodePointMatcher::Any) => CodePointMatcher::Any,
            (CodePointMatcher::Empty, m) | (m, CodePointMatcher::Empty) => m.clone(),
            _ => CodePointMatcher::from_ranges(self.ranges().into_iter().chain(other.ranges())),
        }
    }

    /// The set of all code points not matched by this matcher.
    pub fn complement(&self) -> CodePointMatcher {
        match self {
            CodePointMatcher::Empty => CodePointMatcher::Any,
            CodePointMatcher::Any => CodePointMatcher::Empty,
            _ => {
                let mut result = Vec::new();
                let mut next = 0u32;
                for (lo, hi) in self.ranges() {
                    if lo > next {
                        result.push((next, lo - 1));
                    }
                    next = hi.saturating_add(1);
                }
                if next <= MAX_CODE_POINT {
                    result.push((next, MAX_CODE_POINT));
                }
                Self::from_normalized(result)
            }
        }
    }
}

fn write_code_point(f: &mut std::fmt::Formatter<'_>, c: u32) -> std::fmt::Result {
    match char::from_u32(c) {
        Some(ch) if !ch.is_control() && !ch.is_whitespace() && !"[]-^\\".contains(ch) => {
            write!(f, "{}", ch)
        }
        _ => write!(f, "\\u{{{:x}}}", c),
    }
}

impl std::fmt::Display for CodePointMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodePointMatcher::Empty => write!(f, "[]"),
            CodePointMatcher::Any => write!(f, "."),
            CodePointMatcher::Single(c) => write_code_point(f, *c),
            _ => {
                write!(f, "[")?;
                for (lo, hi) in self.ranges() {
                    write_code_point(f, lo)?;
                    if hi > lo {
                        write!(f, "-")?;
                        write_code_point(f, hi)?;
                    }
                }
                write!(f, "]")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(ranges: &[(char, char)]) -> CodePointMatcher {
        CodePointMatcher::from_ranges(ranges.iter().map(|(l, h)| (*l as u32, *h as u32)))
    }

    #[test]
    fn test_canonical_form() {
        assert_eq!(CodePointMatcher::from_ranges([]), CodePointMatcher::Empty);
        assert_eq!(m(&[('a', 'a')]), CodePointMatcher::Single('a' as u32));
        assert_eq!(m(&[('a', 'c'), ('d', 'f')]), m(&[('a', 'f')]));
        assert_eq!(
            m(&[('a', 'f')]),
            CodePointMatcher::Range('a' as u32, 'f' as u32)
        );
        assert_eq!(
            CodePointMatcher::from_ranges([(0, 10), (11, MAX_CODE_POINT)]),
            CodePointMatcher::Any
        );
        assert!(matches!(
            m(&[('x', 'z'), ('a', 'c')]),
            CodePointMatcher::BitSet(_)
        ));
        assert_eq!(m(&[('x', 'z'), ('a', 'c')]), m(&[('a', 'c'), ('x', 'z')]));
    }

    #[test]
    fn test_matches() {
        let digits_and_lower = m(&[('0', '9'), ('a', 'z')]);
        assert!(digits_and_lower.matches('5' as u32));
        assert!(digits_and_lower.matches('a' as u32));
        assert!(digits_and_lower.matches('z' as u32));
        assert!(!digits_and_lower.matches('A' as u32));
        assert!(!digits_and_lower.matches('/' as u32));
        assert!(!CodePointMatcher::Empty.matches(0));
        assert!(CodePointMatcher::Any.matches(MAX_CODE_POINT));
        assert!(!CodePointMatcher::Any.matches(MAX_CODE_POINT + 1));
    }

    #[test]
    fn test_intersect() {
        let lower = m(&[('a', 'z')]);
        let hex = m(&[('0', '9'), ('a', 'f'), ('A', 'F')]);
        assert_eq!(lower.intersect(&hex), m(&[('a', 'f')]));
        assert_eq!(
            lower.intersect(&CodePointMatcher::from_char('q')),
            CodePointMatcher::from_char('q')
        );
        assert_eq!(
            lower.intersect(&CodePointMatcher::from_char('Q')),
            CodePointMatcher::Empty
        );
        assert_eq!(lower.intersect(&CodePointMatcher::Any), lower);
        assert_eq!(
            m(&[('a', 'c'), ('x', 'z')]).intersect(&m(&[('b', 'y')])),
            m(&[('b', 'c'), ('x', 'y')])
        );
    }

    #[test]
    fn test_subtract_and_complement() {
        let lower = m(&[('a', 'z')]);
        assert_eq!(
            lower.subtract(&m(&[('b', 'y')])),
            m(&[('a', 'a'), ('z', 'z')])
        );
        assert_eq!(lower.subtract(&lower), CodePointMatcher::Empty);
        assert_eq!(lower.complement().complement(), lower);
        assert_eq!(
            CodePointMatcher::from_char('\n').complement(),
            CodePointMatcher::from_ranges([(0, 9), (11, MAX_CODE_POINT)])
        );
        assert_eq!(
            CodePointMatcher::Any.subtract(&lower).union(&lower),
            CodePointMatcher::Any
        );
    }

    #[test]
    fn test_boolean_algebra_laws() {
        let samples = [
            CodePointMatcher::Empty,
            CodePointMatcher::Any,
            CodePointMatcher::from_char('m'),
            m(&[('a', 'z')]),
            m(&[('0', '9'), ('a', 'f')]),
            m(&[('e', 'q'), ('x', 'x')]),
        ];
        for a in &samples {
            for b in &samples {
                // a = (a - b) + (a & b), and the two parts are disjoint
                let diff = a.subtract(b);
                let both = a.intersect(b);
                assert_eq!(diff.union(&both), *a, "{} / {}", a, b);
                assert!(diff.intersect(&both).is_empty(), "{} / {}", a, b);
                assert_eq!(a.intersect(b), b.intersect(a));
                assert_eq!(a.union(b).count(), a.count() + b.count() - both.count());
            }
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(CodePointMatcher::from_char('a').to_string(), "a");
        assert_eq!(m(&[('a', 'c'), ('x', 'x')]).to_string(), "[a-cx]");
        assert_eq!(CodePointMatcher::from_char('\n').to_string(), "\\u{a}");
        assert_eq!(CodePointMatcher::Any.to_string(), ".");
    }
}
