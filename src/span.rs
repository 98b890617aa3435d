//! Source positions.

use std::fmt;

/// A region of source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// Byte offset of the first character.
    pub start: usize,
    /// Byte offset one past the last character.
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub fn new(start: usize, end: usize, line: usize, column: usize) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }

    /// A span that only knows its line, as recovered from a chunk's line table.
    pub fn at_line(line: usize) -> Self {
        Self::new(0, 0, line, 0)
    }

    /// Smallest span covering both `self` and `other`.
    pub fn merge(&self, other: &Span) -> Span {
        let first = if self.start <= other.start { self } else { other };
        Span::new(
            first.start,
            self.end.max(other.end),
            first.line,
            first.column,
        )
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.column == 0 {
            write!(f, "line {}", self.line)
        } else {
            write!(f, "line {}, column {}", self.line, self.column)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_orders_spans() {
        let a = Span::new(10, 12, 2, 3);
        let b = Span::new(0, 4, 1, 1);
        let merged = a.merge(&b);
        assert_eq!(merged.start, 0);
        assert_eq!(merged.end, 12);
        assert_eq!(merged.line, 1);
    }

    #[test]
    fn test_display() {
        assert_eq!(Span::new(0, 1, 4, 7).to_string(), "line 4, column 7");
        assert_eq!(Span::at_line(9).to_string(), "line 9");
    }
}
