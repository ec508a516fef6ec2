//! Source location tracking.

use std::fmt;
use std::path::PathBuf;

/// A span in the source code.
///
/// Lines and columns are zero-based as reported by tree-sitter; the byte
/// range is half-open.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Span {
    pub file: PathBuf,
    pub start_byte: usize,
    pub end_byte: usize,
    pub start_line: usize,
    pub start_col: usize,
    pub end_line: usize,
    pub end_col: usize,
}

impl Span {
    pub fn new(
        file: PathBuf,
        (start_byte, end_byte): (usize, usize),
        (start_line, start_col): (usize, usize),
        (end_line, end_col): (usize, usize),
    ) -> Self {
        Self {
            file,
            start_byte,
            end_byte,
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }

    /// Returns true if `other` lies entirely within this span.
    pub fn contains(&self, other: &Span) -> bool {
        self.start_byte <= other.start_byte && other.end_byte <= self.end_byte
    }

    /// Returns true if the byte offset falls inside this span.
    pub fn contains_offset(&self, offset: usize) -> bool {
        self.start_byte <= offset && offset < self.end_byte
    }

    pub fn len(&self) -> usize {
        self.end_byte.saturating_sub(self.start_byte)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}..{})", self.start_byte, self.end_byte)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(start: usize, end: usize) -> Span {
        Span::new(PathBuf::from("a.cs"), (start, end), (0, start), (0, end))
    }

    #[test]
    fn displays_as_text_span() {
        assert_eq!(span(10, 25).to_string(), "[10..25)");
    }

    #[test]
    fn containment_is_inclusive_of_bounds() {
        let outer = span(10, 30);
        assert!(outer.contains(&span(10, 30)));
        assert!(outer.contains(&span(12, 20)));
        assert!(!outer.contains(&span(5, 20)));
        assert!(outer.contains_offset(10));
        assert!(!outer.contains_offset(30));
    }
}
