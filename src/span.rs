//! Source positions and spans.
//!
//! Every token, AST node, symbol and diagnostic carries at least one `Span`.
//! Spans are byte-addressed into a `SourceMap` entry so diagnostics can show
//! the offending line with a caret.

use serde::{Deserialize, Serialize};

/// Index into the compile-wide `SourceMap`.
pub type FileId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Span {
    pub file: FileId,
    pub offset: u32,
    pub len: u32,
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
}

impl Span {
    pub fn new(
        file: FileId,
        offset: usize,
        len: usize,
        start_line: u32,
        start_col: u32,
        end_line: u32,
        end_col: u32,
    ) -> Self {
        Span {
            file,
            offset: offset as u32,
            len: len as u32,
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }

    /// A span that points nowhere. Used for synthesized nodes.
    pub fn dummy() -> Self {
        Span::default()
    }

    /// Smallest span covering both `self` and `other`.
    /// Spans from different files keep `self`'s file.
    pub fn to(self, other: Span) -> Span {
        if other.file != self.file || other.len == 0 {
            return self;
        }
        if self.len == 0 {
            return other;
        }
        let start = self.offset.min(other.offset);
        let end = (self.offset + self.len).max(other.offset + other.len);
        Span {
            file: self.file,
            offset: start,
            len: end - start,
            start_line: self.start_line.min(other.start_line),
            start_col: if self.start_line <= other.start_line {
                self.start_col
            } else {
                other.start_col
            },
            end_line: self.end_line.max(other.end_line),
            end_col: if self.end_line >= other.end_line {
                self.end_col
            } else {
                other.end_col
            },
        }
    }
}

/// A registered source file: name plus full text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFile {
    pub name: String,
    pub text: String,
}

/// Compile-wide registry of source texts.
///
/// Owned by one compile context; never shared across threads (each pipeline
/// gets its own).
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct SourceMap {
    files: Vec<SourceFile>,
}

impl SourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&mut self, name: impl Into<String>, text: impl Into<String>) -> FileId {
        let mut text = text.into();
        // Strip a UTF-8 BOM if present; offsets are relative to the stripped text.
        if let Some(stripped) = text.strip_prefix('\u{feff}') {
            text = stripped.to_string();
        }
        self.files.push(SourceFile {
            name: name.into(),
            text,
        });
        (self.files.len() - 1) as FileId
    }

    pub fn name(&self, file: FileId) -> &str {
        self.files
            .get(file as usize)
            .map(|f| f.name.as_str())
            .unwrap_or("<unknown>")
    }

    pub fn text(&self, file: FileId) -> &str {
        self.files
            .get(file as usize)
            .map(|f| f.text.as_str())
            .unwrap_or("")
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// The source line containing `span`'s start, without its newline.
    pub fn line_of(&self, span: Span) -> Option<&str> {
        let text = self.text(span.file);
        if text.is_empty() {
            return None;
        }
        text.lines().nth(span.start_line.saturating_sub(1) as usize)
    }
}

/// Running line/column tracker used by the scanner and lexers.
#[derive(Debug, Clone, Copy)]
pub struct Cursor {
    pub offset: usize,
    pub line: u32,
    pub col: u32,
}

impl Cursor {
    pub fn start() -> Self {
        Cursor {
            offset: 0,
            line: 1,
            col: 1,
        }
    }

    pub fn advance(&mut self, ch: char) {
        self.offset += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
    }

    pub fn advance_str(&mut self, s: &str) {
        for ch in s.chars() {
            self.advance(ch);
        }
    }

    pub fn span_to(&self, file: FileId, end: Cursor) -> Span {
        Span::new(
            file,
            self.offset,
            end.offset.saturating_sub(self.offset),
            self.line,
            self.col,
            end.line,
            end.col,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_tracks_lines_and_columns() {
        let mut c = Cursor::start();
        c.advance_str("ab\ncd");
        assert_eq!(c.offset, 5);
        assert_eq!(c.line, 2);
        assert_eq!(c.col, 3);
    }

    #[test]
    fn source_map_strips_bom() {
        let mut sm = SourceMap::new();
        let id = sm.add_file("a.chtl", "\u{feff}div {}");
        assert_eq!(sm.text(id), "div {}");
    }

    #[test]
    fn span_merge_covers_both() {
        let a = Span::new(0, 0, 3, 1, 1, 1, 4);
        let b = Span::new(0, 10, 2, 2, 1, 2, 3);
        let m = a.to(b);
        assert_eq!(m.offset, 0);
        assert_eq!(m.len, 12);
        assert_eq!(m.start_line, 1);
        assert_eq!(m.end_line, 2);
    }

    #[test]
    fn line_of_returns_the_start_line() {
        let mut sm = SourceMap::new();
        let id = sm.add_file("a.chtl", "first\nsecond\nthird");
        let span = Span::new(id, 6, 6, 2, 1, 2, 7);
        assert_eq!(sm.line_of(span), Some("second"));
    }
}
