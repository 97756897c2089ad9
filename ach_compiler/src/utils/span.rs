//! Source location tracking
//!
//! Every expression node keeps the span it was parsed from, including
//! multi-line constructs, so diagnostics can be reported per source line and
//! shifted when the incremental engine moves an unchanged statement.
use serde::{Deserialize, Serialize};
use std::fmt;

/// A position in source text with line, column, and byte offset.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct Position {
    /// Byte offset from start of input (0-based)
    pub offset: usize,
    /// Line number (1-based)
    pub line: u32,
    /// Column number (1-based)
    pub column: u32,
}

impl Position {
    /// Create a new position
    pub fn new(offset: usize, line: u32, column: u32) -> Self {
        Self {
            offset,
            line,
            column,
        }
    }

    /// Create the starting position (offset 0, line 1, column 1)
    pub fn start() -> Self {
        Self {
            offset: 0,
            line: 1,
            column: 1,
        }
    }

    /// Advance position by one character
    pub fn advance(self, ch: char) -> Self {
        match ch {
            '\n' => Self {
                offset: self.offset + 1,
                line: self.line + 1,
                column: 1,
            },
            '\t' => Self {
                offset: self.offset + 1,
                line: self.line,
                column: self.column + 4 - ((self.column - 1) % 4),
            },
            _ => Self {
                offset: self.offset + ch.len_utf8(),
                line: self.line,
                column: self.column + 1,
            },
        }
    }

    /// Advance position by a string
    pub fn advance_str(self, s: &str) -> Self {
        s.chars().fold(self, |pos, ch| pos.advance(ch))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A span of source text from start to end position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    /// Start position (inclusive)
    pub start: Position,
    /// End position (exclusive)
    pub end: Position,
}

impl Span {
    /// Create a new span
    pub fn new(start: Position, end: Position) -> Self {
        debug_assert!(
            start.offset <= end.offset,
            "Span start must not be after end"
        );
        Self { start, end }
    }

    /// Create a single-character span
    pub fn single(pos: Position) -> Self {
        let end = Position {
            offset: pos.offset + 1,
            line: pos.line,
            column: pos.column + 1,
        };
        Self { start: pos, end }
    }

    /// Merge two spans into one covering both
    pub fn merge(self, other: Self) -> Self {
        let start = if self.start.offset < other.start.offset {
            self.start
        } else {
            other.start
        };

        let end = if self.end.offset > other.end.offset {
            self.end
        } else {
            other.end
        };

        Self { start, end }
    }

    /// Get the byte length of this span
    pub fn len(&self) -> usize {
        self.end.offset - self.start.offset
    }

    /// Check if this span is empty
    pub fn is_empty(&self) -> bool {
        self.start.offset == self.end.offset
    }

    /// Check if this span contains a position
    pub fn contains(&self, pos: Position) -> bool {
        pos.offset >= self.start.offset && pos.offset < self.end.offset
    }

    /// Get the source text for this span from the input
    pub fn slice<'a>(&self, input: &'a str) -> &'a str {
        &input[self.start.offset..self.end.offset]
    }

    /// Create an unknown/dummy span (used for generated nodes)
    pub fn dummy() -> Self {
        Self {
            start: Position::start(),
            end: Position::start(),
        }
    }

    /// True for spans produced by `dummy()`
    pub fn is_dummy(&self) -> bool {
        *self == Self::dummy()
    }

    /// Whether any part of the span lies on the given 1-based line
    pub fn covers_line(&self, line: u32) -> bool {
        self.start.line <= line && line <= self.end.line
    }

    /// Move the span by a number of lines. Byte offsets are left untouched
    /// since they are only meaningful for the source the span was read from.
    pub fn shift_lines(self, delta: i64) -> Self {
        if delta == 0 || self.is_dummy() {
            return self;
        }
        let shift = |line: u32| (line as i64 + delta).max(1) as u32;
        Self {
            start: Position {
                line: shift(self.start.line),
                ..self.start
            },
            end: Position {
                line: shift(self.end.line),
                ..self.end
            },
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start.line == self.end.line {
            write!(
                f,
                "{}:{}-{}",
                self.start.line, self.start.column, self.end.column
            )
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

/// A value with its source location
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Spanned<T> {
    /// The value
    pub value: T,
    /// The source span
    pub span: Span,
}

impl<T> Spanned<T> {
    /// Create a new spanned value
    pub fn new(value: T, span: Span) -> Self {
        Self { value, span }
    }
}

impl<T: fmt::Display> fmt::Display for Spanned<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

/// A source map that tracks line starts for efficient position lookup
#[derive(Debug, Clone)]
pub struct SourceMap {
    /// The original source text
    pub source: String,
    /// Byte offsets of line starts
    line_starts: Vec<usize>,
}

impl SourceMap {
    /// Create a new source map from source text
    pub fn new(source: String) -> Self {
        let mut line_starts = vec![0];
        for (offset, ch) in source.char_indices() {
            if ch == '\n' {
                line_starts.push(offset + 1);
            }
        }
        Self {
            source,
            line_starts,
        }
    }

    /// Number of lines in the source
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Byte offset at which a 1-based line begins
    pub fn line_start(&self, line_num: u32) -> Option<usize> {
        if line_num == 0 {
            return None;
        }
        self.line_starts.get((line_num - 1) as usize).copied()
    }

    /// Get the line and column for a byte offset
    pub fn position_at(&self, offset: usize) -> Position {
        let line = self
            .line_starts
            .binary_search(&offset)
            .unwrap_or_else(|i| i - 1);

        let line_start = self.line_starts[line];
        let column = self.source[line_start..offset].chars().count();

        Position::new(offset, (line + 1) as u32, (column + 1) as u32)
    }

    /// Get a line of text by line number (1-based)
    pub fn get_line(&self, line_num: u32) -> Option<&str> {
        if line_num == 0 {
            return None;
        }

        let line_idx = (line_num - 1) as usize;
        if line_idx >= self.line_starts.len() {
            return None;
        }

        let start = self.line_starts[line_idx];
        let end = if line_idx + 1 < self.line_starts.len() {
            self.line_starts[line_idx + 1] - 1
        } else {
            self.source.len()
        };

        Some(self.source[start..end].trim_end_matches(['\n', '\r']))
    }

    /// Get the text covered by a span
    pub fn span_text(&self, span: &Span) -> &str {
        span.slice(&self.source)
    }

    /// Format an error message with source context
    pub fn format_error(&self, span: &Span, message: &str) -> String {
        let mut result = String::new();

        // Error message
        result.push_str(&format!("Error: {}\n", message));
        result.push_str(&format!(
            "  --> {}:{}\n",
            span.start.line, span.start.column
        ));

        // Show the relevant line(s)
        if let Some(line) = self.get_line(span.start.line) {
            let line_num_str = format!("{}", span.start.line);
            let padding = " ".repeat(line_num_str.len());

            result.push_str(&format!("   {} |\n", padding));
            result.push_str(&format!("{} | {}\n", line_num_str, line));

            // Underline the error span
            let mut underline = String::new();
            underline.push_str(&format!("   {} | ", padding));

            // Add spaces before the error
            for _ in 1..span.start.column {
                underline.push(' ');
            }

            // Add carets under the error
            let span_len = if span.start.line == span.end.line {
                span.end.column.saturating_sub(span.start.column) as usize
            } else {
                line.len().saturating_sub((span.start.column - 1) as usize)
            };

            for _ in 0..span_len.max(1) {
                underline.push('^');
            }

            result.push_str(&underline);
            result.push('\n');
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_advance_tracks_lines() {
        let pos = Position::start().advance_str("ab\ncd");
        assert_eq!(pos.line, 2);
        assert_eq!(pos.column, 3);
        assert_eq!(pos.offset, 5);
    }

    #[test]
    fn test_span_merge_and_lines() {
        let a = Span::new(Position::new(0, 1, 1), Position::new(3, 1, 4));
        let b = Span::new(Position::new(10, 3, 2), Position::new(12, 3, 4));
        let merged = a.merge(b);
        assert_eq!(merged.start.line, 1);
        assert_eq!(merged.end.line, 3);
        assert!(merged.covers_line(2));
        assert!(!merged.covers_line(4));
    }

    #[test]
    fn test_shift_lines() {
        let span = Span::new(Position::new(4, 2, 1), Position::new(8, 2, 5));
        let shifted = span.shift_lines(3);
        assert_eq!(shifted.start.line, 5);
        assert_eq!(shifted.end.line, 5);
        assert_eq!(shifted.start.offset, 4);
        assert_eq!(span.shift_lines(-10).start.line, 1);
        assert!(Span::dummy().shift_lines(4).is_dummy());
    }

    #[test]
    fn test_source_map_lookup() {
        let map = SourceMap::new("a = 1\nb = a + 1\n".to_string());
        assert_eq!(map.get_line(2), Some("b = a + 1"));
        assert_eq!(map.position_at(6).line, 2);
        assert_eq!(map.line_start(2), Some(6));
        assert_eq!(map.line_count(), 3);
    }

    #[test]
    fn test_format_error_underlines_span() {
        let map = SourceMap::new("x = byte(\n".to_string());
        let span = Span::new(Position::new(4, 1, 5), Position::new(8, 1, 9));
        let rendered = map.format_error(&span, "bad call");
        assert!(rendered.contains("Error: bad call"));
        assert!(rendered.contains("^^^^"));
    }
}
