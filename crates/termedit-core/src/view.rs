//! Views: a cursor, a viewport and a boundary cache bound to a shared buffer.
//!
//! A view never owns buffer text. Every method that needs rows takes the buffer's
//! [`RowStore`] as an argument, and the workspace keeps the view's cache and cursor in step with
//! edits made through any view.

use std::rc::Rc;

use tracing::debug;
use unicode_segmentation::UnicodeSegmentation;

use crate::cache::BoundaryCache;
use crate::cursor::{Cursor, EditSpan};
use crate::error::Outcome;
use crate::layout::{Boundary, RowLayout};
use crate::rows::{Row, RowStore};
use crate::search::{SearchError, SearchHandle, SearchPoll, SearchQuery, SearchResults, spawn_search};
use crate::snapshot::{HeadlessGrid, char_label, render_line};
use crate::viewport::{ScreenPos, ScrollState, Viewport};
use crate::workspace::BufferId;

/// Cursor movement commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Movement {
    /// One code point forward, wrapping onto the next row.
    Forward,
    /// One code point backward, wrapping onto the previous row.
    Backward,
    /// Down one screen line, keeping the screen column.
    NextLine,
    /// Up one screen line, keeping the screen column.
    PrevLine,
    /// First non-blank of the row, or column 0 if already there.
    LineStart,
    /// The row's terminator.
    LineEnd,
    /// Start of the current screen line.
    ScreenLineStart,
    /// Last code point of the current screen line.
    ScreenLineEnd,
    /// Start of the next word.
    NextWord,
    /// Start of the previous word.
    PrevWord,
    /// Half a screen down.
    HalfPageDown,
    /// Half a screen up.
    HalfPageUp,
    /// First position of the buffer.
    BufferStart,
    /// The end-of-file marker.
    BufferEnd,
    /// Column 0 of a 1-based line number.
    GotoLine(usize),
}

/// Parked state of a view that switched to another buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Meta {
    /// Cursor in the parked buffer.
    pub cursor: Cursor,
    /// Preferred screen column for vertical movement.
    pub preferred_x: Option<usize>,
    /// Scroll position.
    pub scroll: ScrollState,
}

impl Meta {
    /// Rebase the parked cursor across an edit.
    pub fn rebase(&mut self, span: &EditSpan) {
        self.cursor = span.adjust(self.cursor);
    }
}

/// One view of a buffer.
#[derive(Debug)]
pub struct View {
    buffer: BufferId,
    cursor: Cursor,
    preferred_x: Option<usize>,
    cache: BoundaryCache,
    viewport: Viewport,
    search: SearchResults,
    pending_search: Option<SearchHandle>,
    search_generation: u64,
}

impl View {
    pub(crate) fn new(
        buffer: BufferId,
        width: usize,
        height: usize,
        tab_width: usize,
        threshold: usize,
    ) -> Self {
        Self {
            buffer,
            cursor: Cursor::default(),
            preferred_x: None,
            cache: BoundaryCache::new(width, tab_width),
            viewport: Viewport::new(width, height, threshold),
            search: SearchResults::default(),
            pending_search: None,
            search_generation: 0,
        }
    }

    /// Buffer shown by this view.
    pub fn buffer(&self) -> BufferId {
        self.buffer
    }

    /// Current cursor.
    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// Viewport state.
    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Boundary cache of this view.
    pub fn cache(&self) -> &BoundaryCache {
        &self.cache
    }

    /// Results of the last finished search.
    pub fn search_results(&self) -> &SearchResults {
        &self.search
    }

    /// Whether a background search is running.
    pub fn is_searching(&self) -> bool {
        self.pending_search.is_some()
    }

    pub(crate) fn set_cursor(&mut self, cursor: Cursor) {
        self.cursor = cursor;
        self.preferred_x = None;
    }

    pub(crate) fn cache_mut(&mut self) -> &mut BoundaryCache {
        &mut self.cache
    }

    pub(crate) fn resize(&mut self, width: usize, height: usize) {
        self.viewport.resize(width, height);
        let tab_width = self.cache.tab_width();
        self.cache.set_geometry(width, tab_width);
    }

    pub(crate) fn to_meta(&self) -> Meta {
        Meta {
            cursor: self.cursor,
            preferred_x: self.preferred_x,
            scroll: self.viewport.scroll_state(),
        }
    }

    /// Rebind the view to `buffer`, restoring `meta` when one was parked there.
    pub(crate) fn attach(&mut self, buffer: BufferId, meta: Option<Meta>, rows: &RowStore) {
        self.cancel_search();
        self.search.clear();
        self.cache.clear();
        self.buffer = buffer;
        let meta = meta.unwrap_or(Meta {
            cursor: Cursor::default(),
            preferred_x: None,
            scroll: ScrollState::default(),
        });
        self.cursor = rows.clamp(meta.cursor);
        self.preferred_x = meta.preferred_x;
        self.viewport.restore(meta.scroll);
    }

    /// Rebase this view's cursor and search hits after an edit made through another view.
    pub(crate) fn follow_edit(&mut self, span: &EditSpan) {
        self.cursor = span.adjust(self.cursor);
        self.cache.apply_edit(span);
        self.overlay_follow_edit(span);
    }

    /// Rebase search hits and drop a running scan, whose snapshot is now stale.
    pub(crate) fn overlay_follow_edit(&mut self, span: &EditSpan) {
        self.search.rebase(span);
        self.cancel_search();
    }

    /// Layout of `row`, or `None` if the row does not exist.
    pub fn layout(&mut self, rows: &RowStore, row: usize) -> Option<Rc<RowLayout>> {
        (row < rows.row_count()).then(|| self.cache.get(rows, row))
    }

    /// Screen line within its row that holds `cursor`; `None` for an invalid position.
    pub fn index_of_logical_row(&mut self, rows: &RowStore, cursor: Cursor) -> Option<usize> {
        self.layout(rows, cursor.row)?
            .index_of_logical_row(cursor.col)
    }

    /// Whether `cursor` is the last code point of its screen line. Invalid positions are not.
    pub fn is_end_of_logical_row(&mut self, rows: &RowStore, cursor: Cursor) -> bool {
        if !rows.contains(cursor) {
            return false;
        }
        self.layout(rows, cursor.row)
            .is_some_and(|layout| layout.is_end_of_logical_row(cursor.col))
    }

    /// Last screen line of `row`; `None` if the row does not exist.
    pub fn last_boundary_of(&mut self, rows: &RowStore, row: usize) -> Option<Boundary> {
        self.layout(rows, row).map(|layout| *layout.last_boundary())
    }

    /// Scroll to the cursor and render the visible screen lines.
    pub fn render(&mut self, rows: &RowStore) -> HeadlessGrid {
        let cursor = self.viewport.scroll_to(&mut self.cache, rows, self.cursor);
        let mut lines = Vec::with_capacity(self.viewport.height());
        for (row_index, sub_line) in self.viewport.screen_lines(&mut self.cache, rows) {
            let Some(row) = rows.row(row_index) else {
                break;
            };
            let layout = self.cache.get(rows, row_index);
            let highlights = self.search.columns_on_row(row_index);
            lines.push(render_line(row_index, row, &layout, sub_line, &highlights));
        }
        let cursor_label = rows
            .row(self.cursor.row)
            .and_then(|row| row.get(self.cursor.col))
            .map(char_label)
            .unwrap_or_default();
        HeadlessGrid {
            lines,
            cursor,
            cursor_label,
        }
    }

    /// Screen position of the cursor, scrolling if needed.
    pub fn screen_cursor(&mut self, rows: &RowStore) -> ScreenPos {
        self.viewport.scroll_to(&mut self.cache, rows, self.cursor)
    }

    /// Buffer position under a screen cell of the last redraw.
    pub fn cursor_at_screen(&mut self, rows: &RowStore, pos: ScreenPos) -> Option<Cursor> {
        self.viewport.cursor_at(&mut self.cache, rows, pos)
    }

    /// Move the cursor.
    pub fn move_cursor(&mut self, rows: &RowStore, movement: Movement) -> Outcome {
        let height = self.viewport.height();
        match movement {
            Movement::Forward => self.forward(rows),
            Movement::Backward => self.backward(rows),
            Movement::NextLine => self.next_line(rows),
            Movement::PrevLine => self.prev_line(rows),
            Movement::LineStart => {
                let Some(row) = rows.row(self.cursor.row) else {
                    return Outcome::InvalidLine;
                };
                let indent = row.indent_len().min(row.len() - 1);
                let col = if self.cursor.col == indent { 0 } else { indent };
                self.set_cursor(Cursor::new(self.cursor.row, col));
                Outcome::Done
            }
            Movement::LineEnd => {
                let col = rows.row_len(self.cursor.row).saturating_sub(1);
                self.set_cursor(Cursor::new(self.cursor.row, col));
                Outcome::Done
            }
            Movement::ScreenLineStart | Movement::ScreenLineEnd => {
                let Some(layout) = self.layout(rows, self.cursor.row) else {
                    return Outcome::InvalidLine;
                };
                let Some(sub) = layout.index_of_logical_row(self.cursor.col) else {
                    return Outcome::InvalidLine;
                };
                let b = layout.boundaries()[sub];
                let col = if movement == Movement::ScreenLineStart {
                    b.start_index
                } else {
                    b.stop_index.saturating_sub(1).max(b.start_index)
                };
                self.set_cursor(Cursor::new(self.cursor.row, col));
                Outcome::Done
            }
            Movement::NextWord => self.next_word(rows),
            Movement::PrevWord => self.prev_word(rows),
            Movement::HalfPageDown | Movement::HalfPageUp => {
                let line = self.viewport.cursor().y;
                let step = (height / 2).max(1);
                let mut outcome = Outcome::Done;
                for i in 0..step {
                    outcome = if movement == Movement::HalfPageDown {
                        self.next_line(rows)
                    } else {
                        self.prev_line(rows)
                    };
                    if !outcome.is_done() {
                        if i > 0 {
                            outcome = Outcome::Done;
                        }
                        break;
                    }
                }
                self.viewport.set_cursor_line(line);
                outcome
            }
            Movement::BufferStart => {
                self.set_cursor(Cursor::default());
                self.viewport.set_cursor_line(0);
                Outcome::Done
            }
            Movement::BufferEnd => {
                self.set_cursor(rows.end_cursor());
                let t = self.viewport.effective_threshold();
                self.viewport.set_cursor_line(height.saturating_sub(t + 1));
                Outcome::Done
            }
            Movement::GotoLine(line) => {
                if line == 0 || line > rows.row_count() {
                    return Outcome::InvalidLine;
                }
                self.set_cursor(Cursor::new(line - 1, 0));
                self.viewport.set_cursor_line((height - 1) / 2);
                Outcome::Done
            }
        }
    }

    fn forward(&mut self, rows: &RowStore) -> Outcome {
        let Cursor { row, col } = self.cursor;
        if col + 1 < rows.row_len(row) {
            self.set_cursor(Cursor::new(row, col + 1));
        } else if row + 1 < rows.row_count() {
            self.set_cursor(Cursor::new(row + 1, 0));
        } else {
            return Outcome::EndOfBuffer;
        }
        Outcome::Done
    }

    fn backward(&mut self, rows: &RowStore) -> Outcome {
        let Cursor { row, col } = self.cursor;
        if col > 0 {
            self.set_cursor(Cursor::new(row, col - 1));
        } else if row > 0 {
            let col = rows.row_len(row - 1).saturating_sub(1);
            self.set_cursor(Cursor::new(row - 1, col));
        } else {
            return Outcome::BeginningOfBuffer;
        }
        Outcome::Done
    }

    // Screen column of the cursor and its screen line within the row.
    fn cursor_cell(&mut self, rows: &RowStore) -> Option<(Rc<RowLayout>, usize, usize)> {
        let layout = self.layout(rows, self.cursor.row)?;
        let (x, sub) = layout.screen_position(self.cursor.col)?;
        Some((layout, x, sub))
    }

    fn next_line(&mut self, rows: &RowStore) -> Outcome {
        let Some((layout, x, sub)) = self.cursor_cell(rows) else {
            return Outcome::InvalidLine;
        };
        let target_x = self.preferred_x.unwrap_or(x);
        let next = if sub + 1 < layout.line_count() {
            layout
                .col_at(sub + 1, target_x)
                .map(|col| Cursor::new(self.cursor.row, col))
        } else if self.cursor.row + 1 < rows.row_count() {
            let row = self.cursor.row + 1;
            self.layout(rows, row)
                .and_then(|below| below.col_at(0, target_x))
                .map(|col| Cursor::new(row, col))
        } else {
            return Outcome::EndOfBuffer;
        };
        self.move_vertically(next, target_x)
    }

    fn prev_line(&mut self, rows: &RowStore) -> Outcome {
        let Some((layout, x, sub)) = self.cursor_cell(rows) else {
            return Outcome::InvalidLine;
        };
        let target_x = self.preferred_x.unwrap_or(x);
        let prev = if sub > 0 {
            layout
                .col_at(sub - 1, target_x)
                .map(|col| Cursor::new(self.cursor.row, col))
        } else if self.cursor.row > 0 {
            let row = self.cursor.row - 1;
            self.layout(rows, row)
                .and_then(|above| above.col_at(above.line_count() - 1, target_x))
                .map(|col| Cursor::new(row, col))
        } else {
            return Outcome::BeginningOfBuffer;
        };
        self.move_vertically(prev, target_x)
    }

    fn move_vertically(&mut self, target: Option<Cursor>, target_x: usize) -> Outcome {
        match target {
            Some(cursor) => {
                self.cursor = cursor;
                self.preferred_x = Some(target_x);
                Outcome::Done
            }
            None => Outcome::InvalidLine,
        }
    }

    fn next_word(&mut self, rows: &RowStore) -> Outcome {
        let Cursor { row, col } = self.cursor;
        let Some(current) = rows.row(row) else {
            return Outcome::InvalidLine;
        };
        let end = current.len() - 1;
        let target = if let Some(start) = word_starts(current).into_iter().find(|&s| s > col) {
            Cursor::new(row, start)
        } else if col < end {
            Cursor::new(row, end)
        } else if let Some(below) = rows.row(row + 1) {
            Cursor::new(row + 1, word_starts(below).first().copied().unwrap_or(0))
        } else {
            return Outcome::EndOfBuffer;
        };
        self.set_cursor(target);
        Outcome::Done
    }

    fn prev_word(&mut self, rows: &RowStore) -> Outcome {
        let Cursor { row, col } = self.cursor;
        let Some(current) = rows.row(row) else {
            return Outcome::InvalidLine;
        };
        let target = if let Some(start) = word_starts(current).into_iter().rfind(|&s| s < col) {
            Cursor::new(row, start)
        } else if col > 0 {
            Cursor::new(row, 0)
        } else if row > 0 {
            let above = rows.row(row - 1).map(word_starts).unwrap_or_default();
            Cursor::new(row - 1, above.last().copied().unwrap_or(0))
        } else {
            return Outcome::BeginningOfBuffer;
        };
        self.set_cursor(target);
        Outcome::Done
    }

    /// Start a background search over a snapshot of `rows`, replacing any running one.
    ///
    /// An empty query clears the results immediately.
    pub(crate) fn start_search(
        &mut self,
        rows: &RowStore,
        query: Option<SearchQuery>,
        guard: usize,
    ) -> Result<(), SearchError> {
        self.cancel_search();
        self.search_generation += 1;
        let Some(query) = query else {
            self.search.clear();
            return Ok(());
        };
        let snapshot: Vec<String> = rows.iter().map(Row::content).collect();
        debug!(generation = self.search_generation, rows = snapshot.len(), "search started");
        self.pending_search = Some(spawn_search(self.search_generation, snapshot, query, guard)?);
        Ok(())
    }

    /// Collect a finished background search, if any.
    pub(crate) fn poll_search(&mut self) -> SearchPoll {
        let Some(handle) = &self.pending_search else {
            return SearchPoll::Cancelled;
        };
        let poll = handle.poll();
        match &poll {
            SearchPoll::Pending => {}
            SearchPoll::Finished(report) => {
                if report.generation == self.search_generation {
                    self.search = SearchResults::new(report.hits.clone());
                }
                self.pending_search = None;
            }
            SearchPoll::Cancelled => self.pending_search = None,
        }
        poll
    }

    /// Block until the running search finishes. Returns `false` if it was cancelled.
    pub(crate) fn wait_search(&mut self) -> bool {
        let Some(handle) = self.pending_search.take() else {
            return false;
        };
        match handle.wait() {
            Some(report) if report.generation == self.search_generation => {
                self.search = SearchResults::new(report.hits);
                true
            }
            _ => false,
        }
    }

    pub(crate) fn cancel_search(&mut self) {
        if let Some(handle) = self.pending_search.take() {
            debug!(generation = handle.generation(), "cancelling search");
            handle.cancel();
        }
    }

    pub(crate) fn search_mut(&mut self) -> &mut SearchResults {
        &mut self.search
    }
}

// Code-point columns where words start on `row`.
fn word_starts(row: &Row) -> Vec<usize> {
    let text = row.content();
    let mut starts = Vec::new();
    let mut col = 0;
    for segment in text.split_word_bounds() {
        if segment.chars().any(char::is_alphanumeric) {
            starts.push(col);
        }
        col += segment.chars().count();
    }
    starts
}
