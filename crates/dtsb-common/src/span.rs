//! Byte-offset spans into a declaration unit's text.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A half-open byte range `[start, end)` into a unit's text.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    /// Create a new span. `start` must not exceed `end`.
    pub fn new(start: u32, end: u32) -> Self {
        debug_assert!(start <= end, "span start {start} exceeds end {end}");
        Span { start, end }
    }

    /// Create a span from `usize` offsets.
    pub fn from_offsets(start: usize, end: usize) -> Self {
        Self::new(start as u32, end as u32)
    }

    /// An empty span at `pos`.
    pub fn at(pos: u32) -> Self {
        Span {
            start: pos,
            end: pos,
        }
    }

    pub fn len(&self) -> u32 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Whether `other` lies entirely inside this span.
    pub fn contains(&self, other: Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Whether the two spans share at least one byte.
    pub fn overlaps(&self, other: Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Smallest span covering both.
    pub fn cover(&self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }

    pub fn start_usize(&self) -> usize {
        self.start as usize
    }

    pub fn end_usize(&self) -> usize {
        self.end as usize
    }

    /// The text covered by this span. Out-of-range spans yield an empty string.
    pub fn slice<'a>(&self, text: &'a str) -> &'a str {
        text.get(self.start_usize()..self.end_usize()).unwrap_or("")
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_slice_and_len() {
        let text = "declare const a: A;";
        let span = Span::new(14, 15);
        assert_eq!(span.slice(text), "a");
        assert_eq!(span.len(), 1);
        assert!(!span.is_empty());
        assert!(Span::at(3).is_empty());
    }

    #[test]
    fn test_span_relations() {
        let outer = Span::new(0, 10);
        let inner = Span::new(2, 4);
        assert!(outer.contains(inner));
        assert!(!inner.contains(outer));
        assert!(outer.overlaps(inner));
        assert!(!Span::new(0, 2).overlaps(Span::new(2, 4)));
        assert_eq!(Span::new(5, 7).cover(Span::new(1, 3)), Span::new(1, 7));
    }

    #[test]
    fn test_span_out_of_range_slice_is_empty() {
        assert_eq!(Span::new(4, 40).slice("short"), "");
    }
}
