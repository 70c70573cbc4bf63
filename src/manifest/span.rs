use std::ops::Range;

use serde::Serialize;

/// Half-open byte range into the original source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn empty_at(offset: usize) -> Self {
        Self::new(offset, offset)
    }

    /// Smallest span covering both.
    pub fn join(self, other: Span) -> Self {
        Self::new(self.start.min(other.start), self.end.max(other.end))
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        if self.is_empty() || other.is_empty() {
            // insertions collide only with an edit that strictly contains them
            // or with another insertion at the same offset
            return (self.is_empty() && other.is_empty() && self.start == other.start)
                || (self.is_empty() && other.start < self.start && self.start < other.end)
                || (other.is_empty() && self.start < other.start && other.start < self.end);
        }
        self.start < other.end && other.start < self.end
    }
}

/// 1-based line and column. Columns count characters, not bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Maps byte offsets to [`Position`]s.
#[derive(Debug, Clone)]
pub struct LineIndex<'s> {
    source: &'s str,
    line_starts: Vec<usize>,
}

impl<'s> LineIndex<'s> {
    pub fn new(source: &'s str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            source
                .bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Self {
            source,
            line_starts,
        }
    }

    pub fn position(&self, offset: usize) -> Position {
        let offset = offset.min(self.source.len());
        let line = self.line_starts.partition_point(|&start| start <= offset);
        let line_start = self.line_starts[line - 1];
        let column = self
            .source
            .get(line_start..offset)
            .map(|prefix| prefix.chars().count())
            .unwrap_or(offset - line_start);
        Position {
            line,
            column: column + 1,
        }
    }

    /// Byte offset of the first character on the line containing `offset`.
    pub fn line_start(&self, offset: usize) -> usize {
        let line = self.line_starts.partition_point(|&start| start <= offset);
        self.line_starts[line - 1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_are_one_based() {
        let index = LineIndex::new("ab\ncd\n");
        assert_eq!(index.position(0), Position { line: 1, column: 1 });
        assert_eq!(index.position(1), Position { line: 1, column: 2 });
        assert_eq!(index.position(3), Position { line: 2, column: 1 });
        assert_eq!(index.position(6), Position { line: 3, column: 1 });
    }

    #[test]
    fn columns_count_characters() {
        let index = LineIndex::new("é = 'x'");
        assert_eq!(index.position(2), Position { line: 1, column: 2 });
    }

    #[test]
    fn line_start_of_offset() {
        let index = LineIndex::new("one\n  two\n");
        assert_eq!(index.line_start(6), 4);
        assert_eq!(index.line_start(2), 0);
    }

    #[test]
    fn overlap_rules() {
        assert!(Span::new(0, 5).overlaps(&Span::new(4, 8)));
        assert!(!Span::new(0, 4).overlaps(&Span::new(4, 8)));
        assert!(Span::empty_at(4).overlaps(&Span::empty_at(4)));
        assert!(!Span::empty_at(4).overlaps(&Span::new(0, 4)));
        assert!(Span::empty_at(3).overlaps(&Span::new(0, 4)));
    }
}
