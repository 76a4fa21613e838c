//! Lexical helpers over raw declaration text.
//!
//! The parser does not expose modifier keywords or trivia, so the few places that
//! splice text around them scan the source directly.

use bitflags::bitflags;
use dtsb_common::Span;

bitflags! {
    /// Leading modifier keywords of a top-level statement.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct Modifiers: u8 {
        const EXPORT = 1 << 0;
        const DEFAULT = 1 << 1;
        const DECLARE = 1 << 2;
    }
}

/// Modifier keywords found at the start of a statement.
#[derive(Clone, Debug, Default)]
pub struct ModifierScan {
    pub flags: Modifiers,
    /// `export` keyword plus the whitespace after it.
    pub export: Option<Span>,
    /// `default` keyword plus the whitespace after it.
    pub default: Option<Span>,
    /// Offset of the first token that is not `export`/`default`/`declare`.
    pub rest: usize,
}

/// Words that may precede a declaration keyword.
const LEADING_WORDS: &[&str] = &["export", "default", "declare", "abstract", "async", "const"];

pub fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$' || b >= 0x80
}

pub fn skip_whitespace(text: &str, mut pos: usize) -> usize {
    let bytes = text.as_bytes();
    while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
        pos += 1;
    }
    pos
}

/// Skip whitespace and comments.
pub fn skip_trivia(text: &str, mut pos: usize) -> usize {
    let bytes = text.as_bytes();
    loop {
        pos = skip_whitespace(text, pos);
        if bytes[pos.min(bytes.len())..].starts_with(b"//") {
            pos = line_end(text, pos);
        } else if bytes[pos.min(bytes.len())..].starts_with(b"/*") {
            pos = match text[pos + 2..].find("*/") {
                Some(i) => pos + 2 + i + 2,
                None => bytes.len(),
            };
        } else {
            return pos.min(bytes.len());
        }
    }
}

/// Offset of the `\n` ending the line containing `pos` (or the text length).
pub fn line_end(text: &str, pos: usize) -> usize {
    text.as_bytes()
        .get(pos..)
        .and_then(|rest| memchr::memchr(b'\n', rest))
        .map_or(text.len(), |i| pos + i)
}

/// The identifier-like word starting at `pos`.
pub fn word_at(text: &str, pos: usize) -> &str {
    let bytes = text.as_bytes();
    let mut end = pos;
    while end < bytes.len() && is_ident_byte(bytes[end]) {
        end += 1;
    }
    &text[pos.min(end)..end]
}

/// Move `start` backwards over modifier keywords that directly precede it, never
/// crossing `floor`.
pub fn extend_over_modifiers(text: &str, start: usize, floor: usize) -> usize {
    let bytes = text.as_bytes();
    let mut start = start;
    loop {
        let mut end = start;
        while end > floor && bytes[end - 1].is_ascii_whitespace() {
            end -= 1;
        }
        let mut word_start = end;
        while word_start > floor && is_ident_byte(bytes[word_start - 1]) {
            word_start -= 1;
        }
        if word_start < end && LEADING_WORDS.contains(&&text[word_start..end]) {
            start = word_start;
        } else {
            return start;
        }
    }
}

/// Extend a statement end over a `;` that follows on the same line.
pub fn extend_over_semicolon(text: &str, end: usize) -> usize {
    let bytes = text.as_bytes();
    let mut pos = end;
    while pos < bytes.len() && (bytes[pos] == b' ' || bytes[pos] == b'\t') {
        pos += 1;
    }
    if bytes.get(pos) == Some(&b';') { pos + 1 } else { end }
}

/// Where the node for a statement starting at `stmt_start` begins, given the end of the
/// previous statement.
///
/// A comment on the previous statement's last line belongs to that statement; any
/// comment starting on a later line (JSDoc) belongs to this one.
pub fn node_start(text: &str, prev_end: usize, stmt_start: usize) -> usize {
    let bytes = text.as_bytes();
    let mut pos = prev_end;
    while pos < stmt_start && (bytes[pos] == b' ' || bytes[pos] == b'\t') {
        pos += 1;
    }
    if prev_end > 0 && bytes[pos..].starts_with(b"//") {
        pos = line_end(text, pos);
    }
    skip_whitespace(text, pos).min(stmt_start)
}

/// Scan `export`, `default` and `declare` keywords at the start of a statement.
pub fn scan_modifiers(text: &str, start: usize) -> ModifierScan {
    let mut scan = ModifierScan::default();
    let mut pos = skip_trivia(text, start);
    loop {
        let word = word_at(text, pos);
        let next = skip_whitespace(text, pos + word.len());
        match word {
            "export" => {
                scan.flags |= Modifiers::EXPORT;
                scan.export = Some(Span::from_offsets(pos, next));
            }
            "default" => {
                scan.flags |= Modifiers::DEFAULT;
                scan.default = Some(Span::from_offsets(pos, next));
            }
            "declare" => scan.flags |= Modifiers::DECLARE,
            _ => {
                scan.rest = pos;
                return scan;
            }
        }
        pos = next;
    }
}

/// Turn a module specifier into an identifier: last path segment, without extension,
/// with non-identifier characters replaced by `_`.
pub fn identifier_from_specifier(specifier: &str) -> String {
    let segment = specifier
        .trim_end_matches('/')
        .rsplit('/')
        .find(|s| !s.is_empty() && *s != "." && *s != "..")
        .unwrap_or("module");
    let stem = segment.split('.').next().filter(|s| !s.is_empty()).unwrap_or(segment);
    let mut name: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '$' { c } else { '_' })
        .collect();
    if name.is_empty() || name.as_bytes()[0].is_ascii_digit() {
        name.insert(0, '_');
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip_trivia_skips_comments() {
        let text = "  // note\n /* block */ interface A {}";
        let pos = skip_trivia(text, 0);
        assert_eq!(&text[pos..pos + 9], "interface");
    }

    #[test]
    fn test_extend_over_modifiers_stops_at_floor() {
        let text = "type X = 1;\nexport declare class A {}";
        let class_pos = text.find("class").unwrap();
        let start = extend_over_modifiers(text, class_pos, 11);
        assert_eq!(&text[start..start + 6], "export");
        assert_eq!(extend_over_modifiers(text, start, 11), start);
    }

    #[test]
    fn test_extend_over_modifiers_ignores_other_words() {
        let text = "type X = Y\nclass A {}";
        let class_pos = text.find("class").unwrap();
        assert_eq!(extend_over_modifiers(text, class_pos, 0), class_pos);
    }

    #[test]
    fn test_scan_modifiers() {
        let text = "export default declare class A {}";
        let scan = scan_modifiers(text, 0);
        assert!(scan.flags.contains(Modifiers::EXPORT | Modifiers::DEFAULT | Modifiers::DECLARE));
        assert_eq!(scan.export.unwrap().slice(text), "export ");
        assert_eq!(scan.default.unwrap().slice(text), "default ");
        assert_eq!(word_at(text, scan.rest), "class");
    }

    #[test]
    fn test_node_start_keeps_jsdoc_with_next_statement() {
        let text = "type A = 1; // trailing\n/** doc */\ntype B = 2;";
        let prev_end = text.find(';').unwrap() + 1;
        let stmt_start = text.find("type B").unwrap();
        let start = node_start(text, prev_end, stmt_start);
        assert!(text[start..].starts_with("/** doc */"));
    }

    #[test]
    fn test_extend_over_semicolon() {
        let text = "declare const a: A ;\n";
        let end = text.find(" ;").unwrap();
        assert_eq!(extend_over_semicolon(text, end), end + 2);
        assert_eq!(extend_over_semicolon("type A = 1\n;", 10), 10);
    }

    #[test]
    fn test_line_end() {
        let text = "/// <reference types=\"node\" />\ntype A = 1;";
        assert_eq!(line_end(text, 0), text.find('\n').unwrap());
        assert_eq!(line_end(text, 5), text.find('\n').unwrap());
        assert_eq!(line_end(text, text.len() - 3), text.len());
        assert_eq!(line_end(text, text.len() + 1), text.len());
    }

    #[test]
    fn test_identifier_from_specifier() {
        assert_eq!(identifier_from_specifier("./foo-bar"), "foo_bar");
        assert_eq!(identifier_from_specifier("../types/index.js"), "index");
        assert_eq!(identifier_from_specifier("@scope/pkg"), "pkg");
        assert_eq!(identifier_from_specifier("3d"), "_3d");
        assert_eq!(identifier_from_specifier("./"), "module");
    }
}
