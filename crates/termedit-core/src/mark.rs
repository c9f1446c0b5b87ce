//! Marks: remembered buffer positions.

use crate::cursor::{Cursor, EditSpan};
use crate::layout::cell_width;
use crate::rows::{EOF_MARK, RowStore};
use crate::workspace::BufferId;

/// Display cells kept in a mark's preview.
pub const PREVIEW_WIDTH: usize = 20;

/// A position in a buffer with a short preview of the text there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mark {
    /// Buffer the mark belongs to.
    pub buffer: BufferId,
    /// Marked position.
    pub cursor: Cursor,
    /// Text starting at the mark, for listing.
    pub preview: String,
}

impl Mark {
    /// Create a mark at `cursor`, capturing its preview from `rows`.
    pub fn new(buffer: BufferId, cursor: Cursor, rows: &RowStore) -> Self {
        Self {
            buffer,
            cursor,
            preview: preview_at(rows, cursor),
        }
    }

    /// Rebase the mark across an edit of its buffer.
    pub fn rebase(&mut self, span: &EditSpan) {
        self.cursor = span.adjust(self.cursor);
    }
}

// Up to PREVIEW_WIDTH cells of text from `cursor`, with runs of blanks and newlines condensed.
fn preview_at(rows: &RowStore, cursor: Cursor) -> String {
    let mut out = String::new();
    let mut width = 0;
    let mut last_blank = false;
    let chars = rows
        .iter()
        .skip(cursor.row)
        .enumerate()
        .flat_map(|(i, row)| {
            let skip = if i == 0 { cursor.col } else { 0 };
            row.chars().iter().skip(skip).copied()
        });
    for ch in chars {
        if ch == EOF_MARK {
            break;
        }
        let blank = ch.is_whitespace() || ch.is_control();
        if blank && last_blank {
            continue;
        }
        let shown = if blank { ' ' } else { ch };
        let w = cell_width(shown, width, 1);
        if width + w > PREVIEW_WIDTH {
            break;
        }
        out.push(shown);
        width += w;
        last_blank = blank;
    }
    out
}

/// Marks of every buffer in a workspace, most recent last.
#[derive(Debug, Clone, Default)]
pub struct MarkRing {
    marks: Vec<Mark>,
}

impl MarkRing {
    /// Create an empty ring.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a mark, replacing an identical position in the same buffer.
    pub fn set(&mut self, mark: Mark) {
        self.unset(mark.buffer, mark.cursor);
        self.marks.push(mark);
    }

    /// Remove the mark at `cursor` in `buffer`. Returns `true` if one was removed.
    pub fn unset(&mut self, buffer: BufferId, cursor: Cursor) -> bool {
        let before = self.marks.len();
        self.marks
            .retain(|m| !(m.buffer == buffer && m.cursor == cursor));
        self.marks.len() != before
    }

    /// Whether a mark exists at `cursor` in `buffer`.
    pub fn contains(&self, buffer: BufferId, cursor: Cursor) -> bool {
        self.marks
            .iter()
            .any(|m| m.buffer == buffer && m.cursor == cursor)
    }

    /// The most recently set mark of `buffer`.
    pub fn last_for(&self, buffer: BufferId) -> Option<&Mark> {
        self.marks.iter().rev().find(|m| m.buffer == buffer)
    }

    /// Mutable access to the most recently set mark of `buffer`.
    pub fn last_for_mut(&mut self, buffer: BufferId) -> Option<&mut Mark> {
        self.marks.iter_mut().rev().find(|m| m.buffer == buffer)
    }

    /// All marks, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Mark> {
        self.marks.iter()
    }

    /// Marks of `buffer`, for rebasing after an edit.
    pub fn for_buffer_mut(&mut self, buffer: BufferId) -> impl Iterator<Item = &mut Mark> {
        self.marks.iter_mut().filter(move |m| m.buffer == buffer)
    }

    /// Drop every mark of `buffer`.
    pub fn remove_buffer(&mut self, buffer: BufferId) {
        self.marks.retain(|m| m.buffer != buffer);
    }

    /// Number of marks.
    pub fn len(&self) -> usize {
        self.marks.len()
    }

    /// Whether the ring is empty.
    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }
}
