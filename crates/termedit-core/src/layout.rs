//! Soft line-wrap.
//!
//! A row is measured left to right into [`Boundary`] records, one per screen line. Widths follow
//! terminal conventions: wide glyphs take two cells, control codes are drawn as `^X` (two cells),
//! and a tab extends to the next tab stop counted from the start of the row.
//!
//! Line breaking honors East-Asian rules: a screen line may not begin with closing punctuation
//! (`。`, `)`, `、`, ...) or end with opening punctuation (`「`, `(`, ...), and a number such as
//! `3.14` is never split around its decimal separator. Breaks are only searched for in the last
//! [`WRAP_MARGIN`] columns; without a legal break point the row is cut where it overflows.

use bitflags::bitflags;
use unicode_width::UnicodeWidthChar;

use crate::rows::EOF_MARK;

/// Columns before the right edge in which a break point is looked for.
pub const WRAP_MARGIN: usize = 8;

/// Display width of the newline terminator.
pub const LINEFEED_WIDTH: usize = 1;

/// Display width of the end-of-file marker.
pub const EOF_WIDTH: usize = 1;

/// Display width of a control code rendered as `^X`.
pub const CONTROL_WIDTH: usize = 2;

/// Default tab width.
pub const DEFAULT_TAB_WIDTH: usize = 4;

const DEL: char = '\u{7f}';

const LINE_START_PROHIBITED: &str = concat!(
    ")]}>,.:;!?%",
    "、。，．：；！？）］｝〉》」』】〕〗〙〟’”",
    "ゝゞーァィゥェォッャュョヮヵヶぁぃぅぇぉっゃゅょゎゕゖ",
    "々〻‐゠–〜・…‥°′″℃¢％‰",
);

const LINE_END_PROHIBITED: &str = "([{<（［｛〈《「『【〔〖〘〝‘“$￥＄£￡#＃№";

bitflags! {
    /// Line-breaking class of a code point.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CharClass: u16 {
        /// May not begin a screen line (closing brackets, trailing punctuation, small kana).
        const LINE_START_PROHIBITED = 1 << 0;
        /// May not end a screen line (opening brackets, currency prefixes).
        const LINE_END_PROHIBITED = 1 << 1;
        /// Decimal digit.
        const NUMBER = 1 << 2;
        /// `.` or `,` between digits.
        const DECIMAL_SEPARATOR = 1 << 3;
        /// Full-width glyph.
        const WIDE = 1 << 4;
        /// Control code, including the row terminators.
        const CONTROL = 1 << 5;
        /// Horizontal tab.
        const TAB = 1 << 6;
        /// Space.
        const SPACE = 1 << 7;
        /// Anything else.
        const OTHER = 1 << 8;

        /// Bits that say what a code point is, as opposed to how it may break.
        const KIND = Self::NUMBER.bits()
            | Self::WIDE.bits()
            | Self::CONTROL.bits()
            | Self::TAB.bits()
            | Self::SPACE.bits()
            | Self::OTHER.bits();
    }
}

/// Classify `ch` for line breaking.
pub fn classify(ch: char) -> CharClass {
    let mut class = match ch {
        '\t' => CharClass::TAB,
        ' ' => CharClass::SPACE,
        '\u{3000}' => CharClass::SPACE | CharClass::WIDE,
        '0'..='9' => CharClass::NUMBER,
        '０'..='９' => CharClass::NUMBER | CharClass::WIDE,
        '.' | ',' => CharClass::DECIMAL_SEPARATOR | CharClass::OTHER,
        c if c < ' ' || c == DEL => CharClass::CONTROL,
        c if UnicodeWidthChar::width(c) == Some(2) => CharClass::WIDE,
        _ => CharClass::OTHER,
    };
    if LINE_START_PROHIBITED.contains(ch) {
        class |= CharClass::LINE_START_PROHIBITED;
    }
    if LINE_END_PROHIBITED.contains(ch) {
        class |= CharClass::LINE_END_PROHIBITED;
    }
    class
}

/// Display width of `ch` when it starts at `column` cells from the beginning of its row.
pub fn cell_width(ch: char, column: usize, tab_width: usize) -> usize {
    match ch {
        '\n' => LINEFEED_WIDTH,
        EOF_MARK => EOF_WIDTH,
        '\t' => {
            let tab_width = tab_width.max(1);
            tab_width - column % tab_width
        }
        c if c < ' ' || c == DEL => CONTROL_WIDTH,
        c => UnicodeWidthChar::width(c).unwrap_or(1),
    }
}

#[derive(Debug, Clone, Copy)]
struct Glyph {
    class: CharClass,
    width: usize,
}

impl Glyph {
    fn is_narrow_digit(self) -> bool {
        self.class.contains(CharClass::NUMBER) && !self.class.contains(CharClass::WIDE)
    }

    fn starts_prohibited(self) -> bool {
        self.class.contains(CharClass::LINE_START_PROHIBITED)
    }
}

// Whether a screen line may end after `one_back` and continue with `current`.
fn is_break_point(two_back: Option<Glyph>, one_back: Option<Glyph>, current: Glyph) -> bool {
    let (Some(p2), Some(p1)) = (two_back, one_back) else {
        return false;
    };
    if p1.class.contains(CharClass::LINE_END_PROHIBITED) {
        return false;
    }
    if p2.starts_prohibited() && p1.starts_prohibited() && current.starts_prohibited() {
        return true;
    }
    if p1.starts_prohibited() && !current.starts_prohibited() {
        let inside_number = p2.is_narrow_digit()
            && p1.class.contains(CharClass::DECIMAL_SEPARATOR)
            && current.is_narrow_digit();
        return !inside_number;
    }
    if !p1.starts_prohibited() && !current.starts_prohibited() {
        let shared = p1.class & current.class & CharClass::KIND;
        return shared.is_empty() || p1.width != current.width;
    }
    false
}

/// One screen line's share of a row: the half-open code-point range `[start_index, stop_index)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Boundary {
    /// First code point on this screen line.
    pub start_index: usize,
    /// One past the last code point on this screen line.
    pub stop_index: usize,
    /// Cell width of this screen line.
    pub width: usize,
    /// Cell width from the start of the row through `stop_index`.
    pub total_width: usize,
}

impl Boundary {
    /// Number of code points on this screen line.
    pub fn len(&self) -> usize {
        self.stop_index - self.start_index
    }

    /// Only the boundary of a zero-length row is empty.
    pub fn is_empty(&self) -> bool {
        self.start_index == self.stop_index
    }

    /// Whether `col` falls on this screen line.
    pub fn contains(&self, col: usize) -> bool {
        self.start_index <= col && col < self.stop_index
    }
}

/// Measured layout of one row: its boundaries plus the cell width decided for every code point.
///
/// Tab widths depend on the column a tab starts at, so they are computed once here and read back
/// by the viewport and renderer instead of being recomputed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowLayout {
    boundaries: Vec<Boundary>,
    widths: Vec<usize>,
}

impl RowLayout {
    /// Measure `row` for a screen `screen_width` cells wide.
    pub fn measure(row: &[char], screen_width: usize, tab_width: usize) -> Self {
        let soft_limit = screen_width.saturating_sub(WRAP_MARGIN);
        let mut widths = vec![0; row.len()];
        let mut boundaries = Vec::new();

        let mut start = 0;
        let mut x = 0;
        let mut total = 0;
        let mut candidate: Option<Boundary> = None;
        let mut two_back: Option<Glyph> = None;
        let mut one_back: Option<Glyph> = None;

        let mut i = 0;
        while i < row.len() {
            let ch = row[i];
            let mut w = cell_width(ch, total, tab_width);
            if ch == '\t' && i == start {
                // a tab leading a screen line is cut to fit it
                w = w.min(screen_width.saturating_sub(1).max(1));
            }
            widths[i] = w;
            let glyph = Glyph {
                class: classify(ch),
                width: w,
            };
            let is_last = i + 1 == row.len();

            if i > start && x + w >= soft_limit && is_break_point(two_back, one_back, glyph) {
                candidate = Some(Boundary {
                    start_index: start,
                    stop_index: i,
                    width: x,
                    total_width: total,
                });
            }

            // The last code point always closes the row, overflowing or not.
            if x + w >= screen_width && !is_last && i > start {
                if let Some(bp) = candidate.take() {
                    boundaries.push(bp);
                    start = bp.stop_index;
                    i = start;
                    x = 0;
                    total = bp.total_width;
                    two_back = None;
                    one_back = None;
                    continue;
                }

                if glyph.starts_prohibited() && i - 1 > start && widths[i - 1] + w < screen_width {
                    // carry the previous code point down so this one does not lead the line
                    let carried = widths[i - 1];
                    boundaries.push(Boundary {
                        start_index: start,
                        stop_index: i - 1,
                        width: x - carried,
                        total_width: total - carried,
                    });
                    start = i - 1;
                    x = carried;
                } else {
                    boundaries.push(Boundary {
                        start_index: start,
                        stop_index: i,
                        width: x,
                        total_width: total,
                    });
                    start = i;
                    x = 0;
                    // measure again as the first glyph of the new line
                    continue;
                }
            }

            two_back = one_back;
            one_back = Some(glyph);
            x += w;
            total += w;
            i += 1;
        }

        boundaries.push(Boundary {
            start_index: start,
            stop_index: row.len(),
            width: x,
            total_width: total,
        });
        Self { boundaries, widths }
    }

    /// The screen lines of this row, in order. Never empty.
    pub fn boundaries(&self) -> &[Boundary] {
        &self.boundaries
    }

    /// Cell width of every code point.
    pub fn widths(&self) -> &[usize] {
        &self.widths
    }

    /// Cell width of the code point at `col`.
    pub fn width_at(&self, col: usize) -> Option<usize> {
        self.widths.get(col).copied()
    }

    /// Number of screen lines the row occupies.
    pub fn line_count(&self) -> usize {
        self.boundaries.len()
    }

    /// Index of the screen line holding `col`, or `None` when `col` is outside the row.
    pub fn index_of_logical_row(&self, col: usize) -> Option<usize> {
        self.boundaries.iter().position(|b| b.contains(col))
    }

    /// Whether `col` is the last code point of its screen line.
    pub fn is_end_of_logical_row(&self, col: usize) -> bool {
        self.boundaries.iter().any(|b| b.stop_index == col + 1)
    }

    /// The final screen line of the row.
    pub fn last_boundary(&self) -> &Boundary {
        // measure() always pushes a closing boundary
        &self.boundaries[self.boundaries.len() - 1]
    }

    /// Screen position of `col` as `(x, sub_line)` relative to the row's first screen line.
    pub fn screen_position(&self, col: usize) -> Option<(usize, usize)> {
        let sub_line = self.index_of_logical_row(col)?;
        let start = self.boundaries[sub_line].start_index;
        let x = self.widths[start..col].iter().sum();
        Some((x, sub_line))
    }

    /// Code point on screen line `sub_line` whose cell covers `x`.
    ///
    /// Past the end of the line, the line's last code point is returned.
    pub fn col_at(&self, sub_line: usize, x: usize) -> Option<usize> {
        let boundary = self.boundaries.get(sub_line)?;
        let mut cell = 0;
        for col in boundary.start_index..boundary.stop_index {
            cell += self.widths[col];
            if cell > x {
                return Some(col);
            }
        }
        Some(boundary.stop_index.saturating_sub(1).max(boundary.start_index))
    }
}

/// Compute the screen-line boundaries of `row`.
pub fn compute_boundaries(row: &[char], screen_width: usize, tab_width: usize) -> Vec<Boundary> {
    RowLayout::measure(row, screen_width, tab_width).boundaries
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    fn ranges(bs: &[Boundary]) -> Vec<(usize, usize)> {
        bs.iter().map(|b| (b.start_index, b.stop_index)).collect()
    }

    #[test]
    fn test_cell_width() {
        assert_eq!(cell_width('a', 0, 4), 1);
        assert_eq!(cell_width('中', 0, 4), 2);
        assert_eq!(cell_width('\t', 0, 4), 4);
        assert_eq!(cell_width('\t', 5, 4), 3);
        assert_eq!(cell_width('\t', 8, 8), 8);
        assert_eq!(cell_width('\u{1}', 0, 4), 2);
        assert_eq!(cell_width('\u{7f}', 0, 4), 2);
        assert_eq!(cell_width('\n', 0, 4), 1);
        assert_eq!(cell_width(EOF_MARK, 0, 4), 1);
    }

    #[test]
    fn test_classify() {
        assert!(classify('。').contains(CharClass::LINE_START_PROHIBITED | CharClass::WIDE));
        assert!(classify('「').contains(CharClass::LINE_END_PROHIBITED));
        assert!(classify('.').contains(CharClass::DECIMAL_SEPARATOR));
        assert!(classify('.').contains(CharClass::LINE_START_PROHIBITED));
        assert_eq!(classify('7'), CharClass::NUMBER);
        assert_eq!(classify('\t'), CharClass::TAB);
        assert_eq!(classify('a'), CharClass::OTHER);
        assert_eq!(classify('\n'), CharClass::CONTROL);
    }

    #[test]
    fn test_single_line_with_tab() {
        let bs = compute_boundaries(&chars("hello\tworld\n"), 80, 4);
        // 5 + tab stop at column 5 (3) + 5 + newline
        let w = 5 + 3 + 5 + 1;
        assert_eq!(
            bs,
            vec![Boundary {
                start_index: 0,
                stop_index: 12,
                width: w,
                total_width: w
            }]
        );
    }

    #[test]
    fn test_empty_row_has_one_boundary() {
        let bs = compute_boundaries(&[], 80, 4);
        assert_eq!(bs.len(), 1);
        assert!(bs[0].is_empty());

        let bs = compute_boundaries(&['\n'], 80, 4);
        assert_eq!(ranges(&bs), vec![(0, 1)]);
    }

    #[test]
    fn test_wraps_between_words() {
        let bs = compute_boundaries(&chars("aaaa bbbb cccc\n"), 10, 4);
        assert_eq!(ranges(&bs), vec![(0, 9), (9, 15)]);
        assert_eq!(bs[0].width, 9);
        assert_eq!(bs[1].total_width, 15);
    }

    #[test]
    fn test_number_not_split_at_decimal_point() {
        let bs = compute_boundaries(&chars("x 12345.678\n"), 10, 4);
        assert_eq!(ranges(&bs), vec![(0, 2), (2, 12)]);
        assert!(bs.iter().all(|b| b.width <= 10));
    }

    #[test]
    fn test_hard_wrap_without_break_point() {
        let bs = compute_boundaries(&chars("abcdefghijklmnopqrstuvwxy\n"), 10, 4);
        assert_eq!(ranges(&bs), vec![(0, 9), (9, 18), (18, 26)]);
    }

    #[test]
    fn test_closing_punctuation_does_not_lead_line() {
        let bs = compute_boundaries(&chars("あいうえ。\n"), 10, 4);
        assert_eq!(ranges(&bs), vec![(0, 3), (3, 6)]);

        let bs = compute_boundaries(&chars("あいうえお。\n"), 10, 4);
        assert_eq!(ranges(&bs), vec![(0, 4), (4, 7)]);
    }

    #[test]
    fn test_tab_moves_to_next_line_whole() {
        // tab at column 9 is 3 cells wide and cannot fit on a 10-cell line
        let row = chars("abcdefghi\tz\n");
        let layout = RowLayout::measure(&row, 10, 4);
        assert_eq!(ranges(layout.boundaries()), vec![(0, 9), (9, 12)]);
        assert_eq!(layout.width_at(9), Some(3));
        assert_eq!(layout.boundaries()[1].width, 5);
    }

    #[test]
    fn test_tab_wider_than_screen_is_clipped() {
        let layout = RowLayout::measure(&chars("\tX\n"), 10, 16);
        assert_eq!(layout.width_at(0), Some(9));
        assert_eq!(ranges(layout.boundaries()), vec![(0, 1), (1, 3)]);
        assert!(layout.boundaries().iter().all(|b| b.width <= 10));

        // the tab wrapped onto a fresh line is clipped the same way
        let layout = RowLayout::measure(&chars("ab\tc\n"), 10, 32);
        assert_eq!(ranges(layout.boundaries()), vec![(0, 2), (2, 3), (3, 5)]);
        assert_eq!(layout.width_at(2), Some(9));

        let layout = RowLayout::measure(&chars("abcdefg\tX\n"), 10, 16);
        assert_eq!(ranges(layout.boundaries()), vec![(0, 7), (7, 8), (8, 10)]);
        assert_eq!(layout.width_at(7), Some(9));
        assert!(layout.boundaries().iter().all(|b| b.width < 10));
    }

    #[test]
    fn test_partition_and_width_bound() {
        let samples = [
            "The quick brown fox jumps over the lazy dog again and again.\n",
            "日本語のテキストは、文字幅が二倍です。「括弧」も含みます。\n",
            "\t\tindent\twith\ttabs and control \u{1}\u{2} codes\n",
            "1,234,567.89 + 3.14159 = 1,234,571.03159 etc etc etc\n",
        ];
        for text in samples {
            let row = chars(text);
            for width in 10..40 {
                let bs = compute_boundaries(&row, width, 4);
                assert_eq!(bs[0].start_index, 0);
                assert_eq!(bs.last().unwrap().stop_index, row.len());
                for pair in bs.windows(2) {
                    assert_eq!(pair[0].stop_index, pair[1].start_index);
                }
                assert!(bs.iter().all(|b| !b.is_empty() && b.width <= width));
            }
        }
    }

    #[test]
    fn test_logical_row_queries() {
        let layout = RowLayout::measure(&chars("aaaa bbbb cccc\n"), 10, 4);
        assert_eq!(layout.line_count(), 2);
        assert_eq!(layout.index_of_logical_row(3), Some(0));
        assert_eq!(layout.index_of_logical_row(9), Some(1));
        assert_eq!(layout.index_of_logical_row(15), None);
        assert!(layout.is_end_of_logical_row(8));
        assert!(layout.is_end_of_logical_row(14));
        assert!(!layout.is_end_of_logical_row(9));
        assert_eq!(layout.last_boundary().start_index, 9);
    }

    #[test]
    fn test_screen_position_and_back() {
        let layout = RowLayout::measure(&chars("a\tb中c\n"), 80, 4);
        assert_eq!(layout.screen_position(0), Some((0, 0)));
        assert_eq!(layout.screen_position(2), Some((4, 0)));
        assert_eq!(layout.screen_position(4), Some((7, 0)));
        assert_eq!(layout.col_at(0, 2), Some(1));
        assert_eq!(layout.col_at(0, 6), Some(3));
        assert_eq!(layout.col_at(0, 50), Some(5));
        assert_eq!(layout.col_at(1, 0), None);
    }
}
