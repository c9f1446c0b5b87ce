//! Per-view cache of measured rows.

use std::rc::Rc;

use tracing::trace;

use crate::cursor::{EditKind, EditSpan};
use crate::layout::RowLayout;
use crate::rows::RowStore;

/// Lazily filled `row index -> RowLayout` table for one screen geometry.
///
/// Entries are shared through [`Rc`] so a caller can hold a layout while the cache keeps
/// changing. When rows are inserted or deleted the entries are relocated, not recomputed.
#[derive(Debug, Clone)]
pub struct BoundaryCache {
    screen_width: usize,
    tab_width: usize,
    entries: Vec<Option<Rc<RowLayout>>>,
}

impl BoundaryCache {
    /// Create an empty cache for the given geometry.
    pub fn new(screen_width: usize, tab_width: usize) -> Self {
        Self {
            screen_width,
            tab_width,
            entries: Vec::new(),
        }
    }

    /// Screen width the cached layouts were measured for.
    pub fn screen_width(&self) -> usize {
        self.screen_width
    }

    /// Tab width the cached layouts were measured for.
    pub fn tab_width(&self) -> usize {
        self.tab_width
    }

    /// Change the geometry. Any change drops every entry.
    pub fn set_geometry(&mut self, screen_width: usize, tab_width: usize) {
        if (screen_width, tab_width) != (self.screen_width, self.tab_width) {
            self.screen_width = screen_width;
            self.tab_width = tab_width;
            self.clear();
        }
    }

    /// Layout of `row`, measuring it on a miss.
    ///
    /// # Panics
    ///
    /// Panics if `row` does not exist in `rows`: the caller must resynchronize its cursors
    /// before asking for a row.
    pub fn get(&mut self, rows: &RowStore, row: usize) -> Rc<RowLayout> {
        let Some(text) = rows.row(row) else {
            panic!(
                "boundary cache asked for row {row} of a buffer with {} rows",
                rows.row_count()
            );
        };
        if let Some(Some(layout)) = self.entries.get(row) {
            return Rc::clone(layout);
        }
        let layout = Rc::new(RowLayout::measure(
            text.chars(),
            self.screen_width,
            self.tab_width,
        ));
        self.set(row, Rc::clone(&layout));
        layout
    }

    /// Cached layout of `row` without measuring.
    pub fn peek(&self, row: usize) -> Option<&Rc<RowLayout>> {
        self.entries.get(row).and_then(Option::as_ref)
    }

    /// Store an already measured layout for `row`.
    pub fn set(&mut self, row: usize, layout: Rc<RowLayout>) {
        if row >= self.entries.len() {
            self.entries.resize(row + 1, None);
        }
        self.entries[row] = Some(layout);
    }

    /// Drop the entry for `row`.
    pub fn invalidate(&mut self, row: usize) {
        if let Some(entry) = self.entries.get_mut(row) {
            *entry = None;
        }
    }

    /// Make room for `count` new rows at `at`; later entries move down.
    pub fn insert_rows(&mut self, at: usize, count: usize) {
        if count == 0 {
            return;
        }
        if at > self.entries.len() {
            self.entries.resize(at, None);
        }
        self.entries
            .splice(at..at, std::iter::repeat_n(None, count));
    }

    /// Forget `count` rows starting at `at`; later entries move up.
    pub fn delete_rows(&mut self, at: usize, count: usize) {
        if at >= self.entries.len() {
            return;
        }
        let end = (at + count).min(self.entries.len());
        self.entries.drain(at..end);
    }

    /// Apply a committed edit: the edited row is invalidated and the rows below are relocated.
    pub fn apply_edit(&mut self, span: &EditSpan) {
        let rows = span.row_delta();
        trace!(kind = ?span.kind, row = span.start.row, rows, "shifting boundary cache");
        self.invalidate(span.start.row);
        match span.kind {
            EditKind::Insert => self.insert_rows(span.start.row + 1, rows),
            EditKind::Delete => self.delete_rows(span.start.row + 1, rows),
        }
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of slots, cached or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache has no slots.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `row` currently has a cached layout.
    pub fn is_cached(&self, row: usize) -> bool {
        self.peek(row).is_some()
    }
}
