//! Viewport: which screen lines are visible and where the cursor lands on screen.
//!
//! The viewport keeps the cursor's screen line between a top and a bottom threshold so that
//! moving the cursor near an edge scrolls the text instead of the cursor. While the cursor stays
//! on screen it keeps the line it is drawn on; after a jump off screen it reuses the previous
//! cursor line. Either way the line is clamped into the threshold band.

use crate::cache::BoundaryCache;
use crate::cursor::Cursor;
use crate::rows::RowStore;

/// Default distance, in screen lines, kept between the cursor and the top/bottom edge.
pub const DEFAULT_VERTICAL_THRESHOLD: usize = 5;

/// A screen cell coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ScreenPos {
    /// Column, in cells.
    pub x: usize,
    /// Screen line.
    pub y: usize,
}

/// Scroll position that can be parked and restored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ScrollState {
    /// First visible row.
    pub start_row: usize,
    /// First visible screen line within `start_row`.
    pub start_sub_line: usize,
    /// Cursor position on screen after the last redraw.
    pub cursor: ScreenPos,
}

/// Viewport state of one view.
#[derive(Debug, Clone)]
pub struct Viewport {
    width: usize,
    height: usize,
    threshold: usize,
    scroll: ScrollState,
}

impl Viewport {
    /// Create a viewport of `width` x `height` cells.
    pub fn new(width: usize, height: usize, threshold: usize) -> Self {
        Self {
            width,
            height: height.max(1),
            threshold,
            scroll: ScrollState::default(),
        }
    }

    /// Width in cells.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in screen lines.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Resize the viewport.
    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height.max(1);
    }

    /// Threshold actually applied: the configured value, reduced so that the band between the
    /// top and bottom threshold is never empty.
    pub fn effective_threshold(&self) -> usize {
        self.threshold.min((self.height - 1) / 2)
    }

    /// Scroll position after the last redraw.
    pub fn scroll_state(&self) -> ScrollState {
        self.scroll
    }

    /// Restore a parked scroll position. The next [`scroll_to`](Self::scroll_to) starts from it.
    pub fn restore(&mut self, scroll: ScrollState) {
        self.scroll = scroll;
    }

    /// First visible row and screen line within it.
    pub fn start(&self) -> (usize, usize) {
        (self.scroll.start_row, self.scroll.start_sub_line)
    }

    /// Cursor position on screen after the last redraw.
    pub fn cursor(&self) -> ScreenPos {
        self.scroll.cursor
    }

    /// Scroll so that `cursor` is visible and return its screen position.
    ///
    /// # Panics
    ///
    /// Panics if `cursor` does not address an existing position in `rows`.
    pub fn scroll_to(
        &mut self,
        cache: &mut BoundaryCache,
        rows: &RowStore,
        cursor: Cursor,
    ) -> ScreenPos {
        let layout = cache.get(rows, cursor.row);
        let Some((x, sub_line)) = layout.screen_position(cursor.col) else {
            panic!(
                "cursor {cursor} is outside row {} of length {}",
                cursor.row,
                rows.row_len(cursor.row)
            );
        };

        if let Some(above) = self.lines_above_if_all_fit(cache, rows, cursor.row) {
            self.scroll = ScrollState {
                start_row: 0,
                start_sub_line: 0,
                cursor: ScreenPos {
                    x,
                    y: above + sub_line,
                },
            };
            return self.scroll.cursor;
        }

        let t = self.effective_threshold();
        let mut y = self
            .visible_line_of(cache, rows, cursor.row, sub_line)
            .unwrap_or(self.scroll.cursor.y)
            .clamp(t, self.height - t - 1);
        let (start_row, start_sub_line) = if y <= sub_line {
            (cursor.row, sub_line - y)
        } else {
            let mut remaining = y - sub_line;
            let mut row = cursor.row;
            loop {
                if row == 0 {
                    // not enough text above: the cursor moves up instead
                    y -= remaining;
                    break (0, 0);
                }
                row -= 1;
                let lines = cache.get(rows, row).line_count();
                if lines >= remaining {
                    break (row, lines - remaining);
                }
                remaining -= lines;
            }
        };

        self.scroll = ScrollState {
            start_row,
            start_sub_line,
            cursor: ScreenPos { x, y },
        };
        self.scroll.cursor
    }

    /// Ask the next [`scroll_to`](Self::scroll_to) to put the cursor on screen line `y`.
    ///
    /// Used by commands that recenter or page. The threshold band still applies.
    pub fn set_cursor_line(&mut self, y: usize) {
        self.scroll.start_row = usize::MAX;
        self.scroll.cursor.y = y.min(self.height - 1);
    }

    /// `(row, sub_line)` pairs of the visible screen lines, top to bottom.
    pub fn screen_lines(&self, cache: &mut BoundaryCache, rows: &RowStore) -> Vec<(usize, usize)> {
        let mut lines = Vec::with_capacity(self.height);
        let mut row = self.scroll.start_row;
        let mut sub_line = self.scroll.start_sub_line;
        while lines.len() < self.height && row < rows.row_count() {
            let count = cache.get(rows, row).line_count();
            while sub_line < count && lines.len() < self.height {
                lines.push((row, sub_line));
                sub_line += 1;
            }
            row += 1;
            sub_line = 0;
        }
        lines
    }

    /// Buffer position under screen cell `pos`, or `None` below the last line of the buffer.
    pub fn cursor_at(
        &self,
        cache: &mut BoundaryCache,
        rows: &RowStore,
        pos: ScreenPos,
    ) -> Option<Cursor> {
        let (row, sub_line) = *self.screen_lines(cache, rows).get(pos.y)?;
        let col = cache.get(rows, row).col_at(sub_line, pos.x)?;
        Some(Cursor::new(row, col))
    }

    // Screen line of `(cursor_row, sub_line)` measured from the current start, if on screen.
    fn visible_line_of(
        &self,
        cache: &mut BoundaryCache,
        rows: &RowStore,
        cursor_row: usize,
        sub_line: usize,
    ) -> Option<usize> {
        let ScrollState {
            start_row,
            start_sub_line,
            ..
        } = self.scroll;
        if start_row >= rows.row_count() || (cursor_row, sub_line) < (start_row, start_sub_line) {
            return None;
        }
        let mut y = 0;
        let mut skip = start_sub_line;
        for row in start_row..cursor_row {
            y += cache.get(rows, row).line_count().saturating_sub(skip);
            skip = 0;
            if y >= self.height {
                return None;
            }
        }
        y += sub_line - skip;
        (y < self.height).then_some(y)
    }

    // Screen lines above `cursor_row` when the whole buffer fits the viewport.
    fn lines_above_if_all_fit(
        &self,
        cache: &mut BoundaryCache,
        rows: &RowStore,
        cursor_row: usize,
    ) -> Option<usize> {
        let mut total = 0;
        let mut above = 0;
        for row in 0..rows.row_count() {
            if row == cursor_row {
                above = total;
            }
            total += cache.get(rows, row).line_count();
            if total > self.height {
                return None;
            }
        }
        Some(above)
    }
}
