//! Source location tracking

use std::fmt;

/// A span represents a range in IDL source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    /// Start character offset
    pub start: usize,
    /// End character offset (exclusive)
    pub end: usize,
    /// 1-based line of the start offset
    pub line: u32,
    /// 1-based column of the start offset
    pub column: u32,
}

impl Span {
    /// Create a new span
    pub fn new(start: usize, end: usize, line: u32, column: u32) -> Self {
        Self { start, end, line, column }
    }

    /// Create a dummy span (for testing)
    pub fn dummy() -> Self {
        Self { start: 0, end: 0, line: 1, column: 1 }
    }

    /// Merge two spans, keeping the position of the earlier one
    pub fn merge(&self, other: &Span) -> Span {
        let (line, column) = if self.start <= other.start {
            (self.line, self.column)
        } else {
            (other.line, other.column)
        };
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
            line,
            column,
        }
    }

    /// Get the length of the span
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Check if the span is empty
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

impl Default for Span {
    fn default() -> Self {
        Self::dummy()
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_keeps_earliest_position() {
        let a = Span::new(10, 14, 2, 3);
        let b = Span::new(2, 5, 1, 3);
        let merged = a.merge(&b);
        assert_eq!(merged, Span::new(2, 14, 1, 3));
        assert_eq!(merged.len(), 12);
    }

    #[test]
    fn test_display() {
        assert_eq!(Span::new(0, 1, 4, 7).to_string(), "line 4, column 7");
    }
}
