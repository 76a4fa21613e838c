//! Line/column positions computed from byte offsets.

use crate::span::Span;
use serde::{Deserialize, Serialize};

/// A zero-based line/character position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

impl Position {
    pub fn new(line: u32, character: u32) -> Self {
        Position { line, character }
    }
}

/// Precomputed line start offsets for a text.
///
/// Characters are counted in bytes; declaration files are overwhelmingly ASCII and
/// diagnostics only need to be stable, not editor-exact.
#[derive(Clone, Debug)]
pub struct LineMap {
    line_starts: Vec<u32>,
    len: u32,
}

impl LineMap {
    /// Build a line map by scanning for `\n`.
    pub fn build(text: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(memchr::memchr_iter(b'\n', text.as_bytes()).map(|i| i as u32 + 1));
        LineMap {
            line_starts,
            len: text.len() as u32,
        }
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Convert a byte offset to a position. Offsets past the end clamp to the end.
    pub fn offset_to_position(&self, offset: u32) -> Position {
        let offset = offset.min(self.len);
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        Position::new(line as u32, offset - self.line_starts[line])
    }

    /// The span of line `line`, excluding its line terminator.
    pub fn line_span(&self, text: &str, line: u32) -> Span {
        let line = line as usize;
        let start = self.line_starts.get(line).copied().unwrap_or(self.len);
        let mut end = self.line_starts.get(line + 1).map(|s| s - 1).unwrap_or(self.len);
        if end > start && text.as_bytes().get(end as usize - 1) == Some(&b'\r') {
            end -= 1;
        }
        Span::new(start, end.max(start))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_to_position() {
        let text = "interface A {}\ndeclare const b: A;\n";
        let map = LineMap::build(text);
        assert_eq!(map.line_count(), 3);
        assert_eq!(map.offset_to_position(0), Position::new(0, 0));
        assert_eq!(map.offset_to_position(15), Position::new(1, 0));
        assert_eq!(map.offset_to_position(29), Position::new(1, 14));
        assert_eq!(map.offset_to_position(10_000), Position::new(2, 0));
    }

    #[test]
    fn test_line_span_strips_carriage_return() {
        let text = "type A = 1;\r\ntype B = 2;";
        let map = LineMap::build(text);
        assert_eq!(map.line_span(text, 0).slice(text), "type A = 1;");
        assert_eq!(map.line_span(text, 1).slice(text), "type B = 2;");
    }
}
