//! Buffer positions and the position-adjustment rule.
//!
//! A [`Cursor`] addresses a row and a code-point offset inside it. Every position that outlives
//! an edit (view cursors, parked metas, marks, search hits) is rebased with
//! [`adjust_for_insertion`] or [`adjust_for_deletion`]; there is exactly one rule per direction
//! regardless of where the edit came from.

use std::fmt;

/// A `(row, code-point column)` position in a buffer.
///
/// Ordering is row-major, which is the order used by every range in this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Cursor {
    /// Zero-based row index.
    pub row: usize,
    /// Zero-based code-point offset within the row.
    pub col: usize,
}

impl Cursor {
    /// Create a new cursor.
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Position reached after inserting `text` at `self`.
    ///
    /// Each `'\n'` moves to column 0 of the next row.
    pub fn advanced_over(self, text: &[char]) -> Self {
        let newlines = text.iter().filter(|&&c| c == '\n').count();
        if newlines == 0 {
            return Self::new(self.row, self.col + text.len());
        }
        let tail = text.iter().rev().take_while(|&&c| c != '\n').count();
        Self::new(self.row + newlines, tail)
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.row, self.col)
    }
}

/// Direction of a committed edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditKind {
    /// Text was inserted; the span covers the new text.
    Insert,
    /// Text was removed; the span covers the text that used to be there.
    Delete,
}

/// An edit's affected span, normalized so that `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EditSpan {
    /// Insert or delete.
    pub kind: EditKind,
    /// First affected position.
    pub start: Cursor,
    /// One past the last affected position.
    pub end: Cursor,
}

impl EditSpan {
    /// Build a span, swapping the endpoints if they arrive in reverse order.
    pub fn new(kind: EditKind, a: Cursor, b: Cursor) -> Self {
        let (start, end) = if a <= b { (a, b) } else { (b, a) };
        Self { kind, start, end }
    }

    /// Span of an insertion.
    pub fn insert(a: Cursor, b: Cursor) -> Self {
        Self::new(EditKind::Insert, a, b)
    }

    /// Span of a deletion.
    pub fn delete(a: Cursor, b: Cursor) -> Self {
        Self::new(EditKind::Delete, a, b)
    }

    /// Number of rows added (insert) or removed (delete).
    pub fn row_delta(&self) -> usize {
        self.end.row - self.start.row
    }

    /// Rebase `pos` across this edit.
    pub fn adjust(&self, pos: Cursor) -> Cursor {
        match self.kind {
            EditKind::Insert => adjust_for_insertion(pos, self.start, self.end),
            EditKind::Delete => adjust_for_deletion(pos, self.start, self.end),
        }
    }
}

/// Rebase `pos` after text was inserted between `start` and `end`.
///
/// `end` is the position just past the inserted text. Positions before `start` keep their value.
/// A position at or after `start` on the same row moves with the text that followed the
/// insertion point; positions on later rows only move down.
pub fn adjust_for_insertion(pos: Cursor, start: Cursor, end: Cursor) -> Cursor {
    let (start, end) = if start <= end { (start, end) } else { (end, start) };
    if pos.row < start.row || (pos.row == start.row && pos.col < start.col) {
        return pos;
    }
    let rows = end.row - start.row;
    if pos.row == start.row {
        Cursor::new(pos.row + rows, pos.col - start.col + end.col)
    } else {
        Cursor::new(pos.row + rows, pos.col)
    }
}

/// Rebase `pos` after the text between `start` and `end` was removed.
///
/// Positions inside the removed range collapse onto `start`. Positions on `end`'s row are
/// re-anchored relative to `start`'s column; positions on later rows only move up.
pub fn adjust_for_deletion(pos: Cursor, start: Cursor, end: Cursor) -> Cursor {
    let (start, end) = if start <= end { (start, end) } else { (end, start) };
    if pos <= start {
        return pos;
    }
    if pos < end {
        return start;
    }
    if pos.row == end.row {
        Cursor::new(start.row, pos.col - end.col + start.col)
    } else {
        Cursor::new(pos.row - (end.row - start.row), pos.col)
    }
}
