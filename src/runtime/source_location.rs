//! Source Location Utilities
//!
//! This module provides utilities for tracking and formatting source code positions.
//! It consolidates line/column calculation logic used by parse failures and
//! grammar compile errors.

use std::fmt;

/// A position in source code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourcePosition {
    /// Byte offset from start of input
    pub offset: usize,
    /// Line number (1-based)
    pub line: usize,
    /// Column number (1-based, counted in characters)
    pub column: usize,
}

impl SourcePosition {
    /// Create a new source position
    #[inline]
    pub fn new(offset: usize, line: usize, column: usize) -> Self {
        Self {
            offset,
            line,
            column,
        }
    }

    /// Create a position at the start of input
    #[inline]
    pub fn start() -> Self {
        Self {
            offset: 0,
            line: 1,
            column: 1,
        }
    }

    /// Calculate position from a byte offset in the input
    ///
    /// Offsets past the end are clamped to the input length, offsets inside a
    /// multi-byte character are moved back to its first byte.
    pub fn from_offset(input: &str, offset: usize) -> Self {
        let offset = floor_char_boundary(input, offset);
        let before = &input.as_bytes()[..offset];

        let line = memchr::memchr_iter(b'\n', before).count() + 1;
        let line_start = memchr::memrchr(b'\n', before).map_or(0, |nl| nl + 1);
        let column = input[line_start..offset].chars().count() + 1;

        Self {
            offset,
            line,
            column,
        }
    }

    /// The full text of the line containing this position (without the newline)
    pub fn line_text<'a>(&self, input: &'a str) -> &'a str {
        let offset = floor_char_boundary(input, self.offset);
        let bytes = input.as_bytes();
        let start = memchr::memrchr(b'\n', &bytes[..offset]).map_or(0, |nl| nl + 1);
        let end = memchr::memchr(b'\n', &bytes[offset..]).map_or(input.len(), |nl| offset + nl);
        input[start..end].trim_end_matches('\r')
    }

    /// Render the line containing this position with a caret under the column
    ///
    /// ```text
    /// sum = term ("+" term
    ///                     ^
    /// ```
    pub fn excerpt(&self, input: &str) -> String {
        let line = self.line_text(input);
        let padding: String = line
            .chars()
            .take(self.column.saturating_sub(1))
            .map(|c| if c == '\t' { '\t' } else { ' ' })
            .collect();
        format!("{}\n{}^", line, padding)
    }
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

impl Default for SourcePosition {
    fn default() -> Self {
        Self::start()
    }
}

/// A range in source code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceSpan {
    /// Start position
    pub start: SourcePosition,
    /// End position
    pub end: SourcePosition,
}

impl SourceSpan {
    /// Create a new span
    #[inline]
    pub fn new(start: SourcePosition, end: SourcePosition) -> Self {
        Self { start, end }
    }

    /// Create a span from byte offsets
    pub fn from_offsets(input: &str, start_offset: usize, end_offset: usize) -> Self {
        Self {
            start: SourcePosition::from_offset(input, start_offset),
            end: SourcePosition::from_offset(input, end_offset),
        }
    }

    /// Check if this span contains an offset
    #[inline]
    pub fn contains(&self, offset: usize) -> bool {
        offset >= self.start.offset && offset <= self.end.offset
    }

    /// Get the length of this span in bytes
    #[inline]
    pub fn len(&self) -> usize {
        self.end.offset.saturating_sub(self.start.offset)
    }

    /// Check if this is a zero-length span
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start.offset == self.end.offset
    }
}

impl fmt::Display for SourceSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start.line == self.end.line {
            write!(
                f,
                "line {}, columns {}-{}",
                self.start.line, self.start.column, self.end.column
            )
        } else {
            write!(
                f,
                "line {}, column {} to line {}, column {}",
                self.start.line, self.start.column, self.end.line, self.end.column
            )
        }
    }
}

/// Convert a byte offset to a (line, column) pair, both 1-based
#[inline]
pub fn offset_to_line_col(input: &str, offset: usize) -> (usize, usize) {
    let pos = SourcePosition::from_offset(input, offset);
    (pos.line, pos.column)
}

fn floor_char_boundary(input: &str, offset: usize) -> usize {
    let mut offset = offset.min(input.len());
    while !input.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_start() {
        let pos = SourcePosition::from_offset("hello world", 0);
        assert_eq!(pos, SourcePosition::new(0, 1, 1));
    }

    #[test]
    fn test_position_after_newline() {
        let pos = SourcePosition::from_offset("hello\nworld", 6);
        assert_eq!(pos.line, 2);
        assert_eq!(pos.column, 1);
    }

    #[test]
    fn test_position_multiline() {
        let pos = SourcePosition::from_offset("line1\nline2\nline3", 14);
        assert_eq!(pos.line, 3);
        assert_eq!(pos.column, 3);
    }

    #[test]
    fn test_position_multibyte() {
        // "世" is three bytes but one column
        let pos = SourcePosition::from_offset("世界 x", 7);
        assert_eq!(pos.line, 1);
        assert_eq!(pos.column, 4);
    }

    #[test]
    fn test_position_inside_multibyte_char() {
        let pos = SourcePosition::from_offset("世界", 1);
        assert_eq!(pos.offset, 0);
        assert_eq!(pos.column, 1);
    }

    #[test]
    fn test_position_beyond_end() {
        let pos = SourcePosition::from_offset("hello", 100);
        assert_eq!(pos.offset, 5);
        assert_eq!(pos.column, 6);
    }

    #[test]
    fn test_line_text() {
        let input = "first\nsecond line\nthird";
        let pos = SourcePosition::from_offset(input, 9);
        assert_eq!(pos.line_text(input), "second line");
    }

    #[test]
    fn test_excerpt_caret() {
        let input = "a = b\nc = (d\n";
        let pos = SourcePosition::from_offset(input, 11);
        assert_eq!(pos.excerpt(input), "c = (d\n     ^");
    }

    #[test]
    fn test_span_display() {
        let span = SourceSpan::from_offsets("abc\ndef", 0, 2);
        assert_eq!(span.to_string(), "line 1, columns 1-3");
        assert_eq!(span.len(), 2);
        assert!(span.contains(1));
    }
}
