//! Headless render output.
//!
//! A redraw produces a [`HeadlessGrid`]: one [`HeadlessLine`] per visible screen line, each a
//! list of [`Cell`]s that a terminal front end can paint without knowing anything about tabs,
//! control codes or soft wrap.

use std::ops::Range;

use crate::layout::RowLayout;
use crate::rows::{EOF_MARK, Row};
use crate::viewport::ScreenPos;

/// Glyph drawn for a tab.
pub const MARK_TAB: char = '»';
/// Glyph drawn for a newline.
pub const MARK_LINEFEED: char = '↵';
/// Glyph drawn for the end-of-file marker.
pub const MARK_EOF: char = '◂';
/// Glyph drawn at the right edge of a screen line that continues on the next one.
pub const MARK_CONTINUATION: char = '\\';

/// How a cell should be styled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellStyle {
    /// Ordinary text.
    Text,
    /// Tab mark; the cell spans the whole tab width.
    Tab,
    /// Newline mark.
    Linefeed,
    /// End-of-file mark.
    Eof,
    /// One half of a `^X` control-code rendering.
    ControlCode,
    /// Soft-wrap continuation mark.
    Continuation,
    /// Text inside a search hit.
    SearchHit,
}

/// Cell (character) information
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    /// Character to display
    pub ch: char,
    /// Visual width in cells
    pub width: usize,
    /// Style classification
    pub style: CellStyle,
}

impl Cell {
    /// Create a cell.
    pub fn new(ch: char, width: usize, style: CellStyle) -> Self {
        Self { ch, width, style }
    }
}

/// Headless line information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadlessLine {
    /// Buffer row this screen line belongs to
    pub row_index: usize,
    /// Index of this screen line within the row
    pub sub_line: usize,
    /// Whether this is a continuation created by soft wrap
    pub is_wrapped_part: bool,
    /// List of cells
    pub cells: Vec<Cell>,
}

impl HeadlessLine {
    /// Visual width of this line, in cells.
    pub fn visual_width(&self) -> usize {
        self.cells.iter().map(|c| c.width).sum()
    }

    /// The displayed characters, for tests and debugging.
    pub fn text(&self) -> String {
        self.cells.iter().map(|c| c.ch).collect()
    }
}

/// Headless grid snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadlessGrid {
    /// Visible screen lines, top to bottom
    pub lines: Vec<HeadlessLine>,
    /// Cursor position on screen
    pub cursor: ScreenPos,
    /// Status-line label of the character under the cursor, see [`char_label`]
    pub cursor_label: String,
}

impl HeadlessGrid {
    /// Number of screen lines.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }
}

/// Caret notation for a control code: `'\u{1}'` is `'A'`, DEL is `'?'`.
pub fn control_caret(ch: char) -> Option<char> {
    match ch {
        '\u{7f}' => Some('?'),
        c if c < ' ' => char::from_u32(c as u32 + 64),
        _ => None,
    }
}

/// Printable label for the character under the cursor, as shown on a status line.
pub fn char_label(ch: char) -> String {
    match ch {
        '\t' => "\\t".to_string(),
        '\n' => "\\n".to_string(),
        '\r' => "\\r".to_string(),
        EOF_MARK => "EOF".to_string(),
        c => match control_caret(c) {
            Some(caret) => format!("^{caret}"),
            None => c.to_string(),
        },
    }
}

/// Render screen line `sub_line` of `row`.
///
/// `highlights` are code-point ranges of this row drawn as [`CellStyle::SearchHit`].
pub fn render_line(
    row_index: usize,
    row: &Row,
    layout: &RowLayout,
    sub_line: usize,
    highlights: &[Range<usize>],
) -> HeadlessLine {
    let mut line = HeadlessLine {
        row_index,
        sub_line,
        is_wrapped_part: sub_line > 0,
        cells: Vec::new(),
    };
    let Some(boundary) = layout.boundaries().get(sub_line) else {
        return line;
    };

    for col in boundary.start_index..boundary.stop_index {
        let Some(ch) = row.get(col) else { break };
        let width = layout.width_at(col).unwrap_or(1);
        let hit = highlights.iter().any(|r| r.contains(&col));
        let text_style = if hit {
            CellStyle::SearchHit
        } else {
            CellStyle::Text
        };
        match ch {
            '\t' => line.cells.push(Cell::new(MARK_TAB, width, CellStyle::Tab)),
            '\n' => line.cells.push(Cell::new(MARK_LINEFEED, width, CellStyle::Linefeed)),
            EOF_MARK => line.cells.push(Cell::new(MARK_EOF, width, CellStyle::Eof)),
            c => match control_caret(c) {
                Some(caret) => {
                    line.cells.push(Cell::new('^', 1, CellStyle::ControlCode));
                    line.cells.push(Cell::new(caret, 1, CellStyle::ControlCode));
                }
                None => line.cells.push(Cell::new(c, width, text_style)),
            },
        }
    }

    if sub_line + 1 < layout.line_count() {
        line.cells
            .push(Cell::new(MARK_CONTINUATION, 1, CellStyle::Continuation));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rows::RowStore;

    fn first_row(text: &str) -> Row {
        RowStore::from_text(text).0.row(0).unwrap().clone()
    }

    #[test]
    fn test_control_codes_render_as_caret_pairs() {
        let row = first_row("a\u{1}\u{7f}\n");
        let layout = RowLayout::measure(row.chars(), 80, 4);
        let line = render_line(0, &row, &layout, 0, &[]);
        assert_eq!(line.text(), "a^A^?↵");
        assert_eq!(line.visual_width(), 6);
        assert_eq!(line.cells[1].style, CellStyle::ControlCode);
    }

    #[test]
    fn test_tab_and_eof_marks() {
        let row = first_row("x\ty");
        let layout = RowLayout::measure(row.chars(), 80, 4);
        let line = render_line(0, &row, &layout, 0, &[]);
        assert_eq!(line.cells[1], Cell::new(MARK_TAB, 3, CellStyle::Tab));
        assert_eq!(line.cells.last().unwrap().style, CellStyle::Eof);
    }

    #[test]
    fn test_wrapped_line_has_continuation() {
        let row = first_row("aaaa bbbb cccc\n");
        let layout = RowLayout::measure(row.chars(), 10, 4);
        let first = render_line(0, &row, &layout, 0, &[]);
        assert_eq!(first.text(), "aaaa bbbb\\");
        assert!(!first.is_wrapped_part);
        let second = render_line(0, &row, &layout, 1, &[]);
        assert_eq!(second.text(), " cccc↵");
        assert!(second.is_wrapped_part);
    }

    #[test]
    fn test_search_hits_are_styled() {
        let row = first_row("find me\n");
        let layout = RowLayout::measure(row.chars(), 80, 4);
        let line = render_line(0, &row, &layout, 0, &[5..7]);
        let styles: Vec<CellStyle> = line.cells.iter().map(|c| c.style).collect();
        assert_eq!(styles[4], CellStyle::Text);
        assert_eq!(styles[5], CellStyle::SearchHit);
        assert_eq!(styles[6], CellStyle::SearchHit);
    }

    #[test]
    fn test_char_label() {
        assert_eq!(char_label('\t'), "\\t");
        assert_eq!(char_label('\u{7f}'), "^?");
        assert_eq!(char_label('\u{3}'), "^C");
        assert_eq!(char_label('日'), "日");
    }
}
