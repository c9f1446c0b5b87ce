//! The row store.
//!
//! A buffer's text is an ordered list of [`Row`]s. Each row holds code points and ends in exactly
//! one terminator: `'\n'` for every row but the last, which ends in [`EOF_MARK`]. Because of the
//! terminator, a cursor may always sit on column `len - 1` without being past the end.

use std::fmt;

use crate::cursor::Cursor;
use crate::error::CoreError;
use crate::line_ending::LineEnding;

/// Code point that terminates the last row in memory. Never written to disk.
pub const EOF_MARK: char = '\u{1A}';

/// One buffer row: code points followed by a terminator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Row {
    chars: Vec<char>,
}

impl Row {
    fn from_chars(chars: Vec<char>) -> Self {
        Self { chars }
    }

    /// Number of code points, terminator included.
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    /// A row always holds at least its terminator, but a freshly split tail may briefly be empty.
    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// The code points of this row, terminator included.
    pub fn chars(&self) -> &[char] {
        &self.chars
    }

    /// Code point at `col`.
    pub fn get(&self, col: usize) -> Option<char> {
        self.chars.get(col).copied()
    }

    /// The terminator code point.
    pub fn terminator(&self) -> Option<char> {
        self.chars.last().copied()
    }

    /// Whether this row ends with the end-of-file marker.
    pub fn is_last(&self) -> bool {
        self.terminator() == Some(EOF_MARK)
    }

    /// Text of the row without its terminator.
    pub fn content(&self) -> String {
        let end = self.chars.len().saturating_sub(1);
        self.chars[..end].iter().collect()
    }

    /// Number of leading spaces and tabs.
    pub fn indent_len(&self) -> usize {
        self.chars
            .iter()
            .take_while(|c| **c == ' ' || **c == '\t')
            .count()
    }

    /// UTF-8 byte offset of code-point column `col` (clamped to the row length).
    pub fn byte_offset(&self, col: usize) -> usize {
        self.chars[..col.min(self.chars.len())]
            .iter()
            .map(|c| c.len_utf8())
            .sum()
    }

    /// Code-point column containing UTF-8 byte offset `byte`.
    ///
    /// Returns `None` when `byte` is past the end of the row.
    pub fn col_at_byte(&self, byte: usize) -> Option<usize> {
        let mut offset = 0;
        for (col, ch) in self.chars.iter().enumerate() {
            let next = offset + ch.len_utf8();
            if byte < next {
                return Some(col);
            }
            offset = next;
        }
        (byte == offset).then_some(self.chars.len())
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.chars.iter().try_for_each(|c| write!(f, "{c}"))
    }
}

/// Ordered, owned rows of one buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowStore {
    rows: Vec<Row>,
}

impl Default for RowStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RowStore {
    /// An empty buffer: a single row holding only the end-of-file marker.
    pub fn new() -> Self {
        Self {
            rows: vec![Row::from_chars(vec![EOF_MARK])],
        }
    }

    /// Bulk-load rows that already carry their `'\n'` terminators.
    ///
    /// The end-of-file marker is appended to the final row, or as a row of its own when the input
    /// ends with a newline.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut rows: Vec<Row> = lines
            .into_iter()
            .map(|line| Row::from_chars(line.as_ref().chars().collect()))
            .filter(|row| !row.is_empty())
            .collect();

        match rows.last_mut() {
            Some(last) if last.terminator() != Some('\n') => last.chars.push(EOF_MARK),
            _ => rows.push(Row::from_chars(vec![EOF_MARK])),
        }
        Self { rows }
    }

    /// Load raw text, normalizing its newlines. Returns the store and the detected line ending.
    pub fn from_text(text: &str) -> (Self, LineEnding) {
        let (lines, ending) = crate::line_ending::split_lines(text);
        (Self::from_lines(lines), ending)
    }

    /// Serialize to bytes, stripping the end-of-file marker and writing `ending` for newlines.
    pub fn to_bytes(&self, ending: LineEnding) -> Vec<u8> {
        let mut out = Vec::new();
        let mut buf = [0u8; 4];
        for row in &self.rows {
            for &ch in &row.chars {
                match ch {
                    EOF_MARK => {}
                    '\n' => out.extend_from_slice(ending.as_str().as_bytes()),
                    other => out.extend_from_slice(other.encode_utf8(&mut buf).as_bytes()),
                }
            }
        }
        out
    }

    /// Whole buffer as LF-normalized text without the end-of-file marker.
    pub fn text(&self) -> String {
        self.rows
            .iter()
            .flat_map(|row| row.chars.iter())
            .filter(|c| **c != EOF_MARK)
            .collect()
    }

    /// Number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Row at `index`.
    pub fn row(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    /// Iterate over every row.
    pub fn iter(&self) -> impl Iterator<Item = &Row> {
        self.rows.iter()
    }

    /// Length of row `index`, or 0 when the row does not exist.
    pub fn row_len(&self, index: usize) -> usize {
        self.rows.get(index).map_or(0, Row::len)
    }

    /// Position of the end-of-file marker.
    pub fn end_cursor(&self) -> Cursor {
        let row = self.rows.len() - 1;
        Cursor::new(row, self.rows[row].len().saturating_sub(1))
    }

    /// Whether `cursor` addresses an existing code point (terminator included).
    pub fn contains(&self, cursor: Cursor) -> bool {
        cursor.col < self.row_len(cursor.row)
    }

    /// Clamp `cursor` onto the nearest existing position.
    pub fn clamp(&self, cursor: Cursor) -> Cursor {
        let row = cursor.row.min(self.rows.len() - 1);
        let col = cursor.col.min(self.rows[row].len().saturating_sub(1));
        Cursor::new(row, col)
    }

    /// Insert `text` at `cursor` and return the position just past it.
    ///
    /// Each newline-terminated segment splits the current row at the cursor. A final segment
    /// without a newline is spliced in place.
    pub fn insert(&mut self, cursor: Cursor, text: &[char]) -> Result<Cursor, CoreError> {
        if !self.contains(cursor) {
            return Err(CoreError::StaleCursor {
                cursor,
                row_count: self.rows.len(),
            });
        }

        let mut at = cursor;
        for segment in text.split_inclusive(|&c| c == '\n') {
            let row = &mut self.rows[at.row];
            if segment.last() == Some(&'\n') {
                let tail = row.chars.split_off(at.col);
                row.chars.extend_from_slice(segment);
                self.rows.insert(at.row + 1, Row::from_chars(tail));
                at = Cursor::new(at.row + 1, 0);
            } else {
                row.chars.splice(at.col..at.col, segment.iter().copied());
                at.col += segment.len();
            }
        }
        Ok(at)
    }

    /// Remove `[start, end)` and return the removed code points.
    ///
    /// Degenerate (`start >= end`) or out-of-range requests return `None` and change nothing.
    /// The end-of-file marker can never be removed because `end` must address an existing code
    /// point.
    pub fn remove_range(&mut self, start: Cursor, end: Cursor) -> Option<Vec<char>> {
        if !self.valid_range(start, end) {
            return None;
        }
        if start.row == end.row {
            let row = &mut self.rows[start.row];
            return Some(row.chars.drain(start.col..end.col).collect());
        }

        let mut removed: Vec<char> = self.rows[start.row].chars.split_off(start.col);
        for row in self.rows.drain(start.row + 1..end.row) {
            removed.extend(row.chars);
        }
        // `end.row` has now shifted to `start.row + 1`
        let bottom = self.rows.remove(start.row + 1);
        removed.extend_from_slice(&bottom.chars[..end.col]);
        self.rows[start.row]
            .chars
            .extend_from_slice(&bottom.chars[end.col..]);
        Some(removed)
    }

    /// Copy `[start, end)` without modifying the store. Same validity rules as
    /// [`remove_range`](Self::remove_range).
    pub fn get_range(&self, start: Cursor, end: Cursor) -> Option<Vec<char>> {
        if !self.valid_range(start, end) {
            return None;
        }
        if start.row == end.row {
            return Some(self.rows[start.row].chars[start.col..end.col].to_vec());
        }
        let mut out = self.rows[start.row].chars[start.col..].to_vec();
        for row in &self.rows[start.row + 1..end.row] {
            out.extend_from_slice(&row.chars);
        }
        out.extend_from_slice(&self.rows[end.row].chars[..end.col]);
        Some(out)
    }

    fn valid_range(&self, start: Cursor, end: Cursor) -> bool {
        start < end && self.contains(start) && self.contains(end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn test_new_store_has_eof_row() {
        let rows = RowStore::new();
        assert_eq!(rows.row_count(), 1);
        assert_eq!(rows.row(0).unwrap().chars(), &[EOF_MARK]);
        assert_eq!(rows.end_cursor(), Cursor::new(0, 0));
    }

    #[test]
    fn test_from_lines_eof_placement() {
        let rows = RowStore::from_lines(["ab\n", "cd"]);
        assert_eq!(rows.row_count(), 2);
        assert_eq!(rows.row(1).unwrap().chars(), &['c', 'd', EOF_MARK]);

        let rows = RowStore::from_lines(["ab\n", "cd\n"]);
        assert_eq!(rows.row_count(), 3);
        assert_eq!(rows.row(2).unwrap().chars(), &[EOF_MARK]);

        let rows = RowStore::from_lines(Vec::<String>::new());
        assert_eq!(rows, RowStore::new());
    }

    #[test]
    fn test_insert_splits_rows() {
        let (mut rows, _) = RowStore::from_text("hello world");
        let end = rows.insert(Cursor::new(0, 5), &chars(",\nnew\n")).unwrap();
        assert_eq!(end, Cursor::new(2, 0));
        assert_eq!(rows.row_count(), 3);
        assert_eq!(rows.row(0).unwrap().to_string(), "hello,\n");
        assert_eq!(rows.row(1).unwrap().to_string(), "new\n");
        assert_eq!(rows.row(2).unwrap().content(), " world");
    }

    #[test]
    fn test_insert_in_place() {
        let (mut rows, _) = RowStore::from_text("ac\n");
        let end = rows.insert(Cursor::new(0, 1), &['b']).unwrap();
        assert_eq!(end, Cursor::new(0, 2));
        assert_eq!(rows.text(), "abc\n");
    }

    #[test]
    fn test_insert_rejects_stale_cursor() {
        let (mut rows, _) = RowStore::from_text("abc");
        let err = rows.insert(Cursor::new(4, 0), &['x']).unwrap_err();
        assert!(matches!(err, CoreError::StaleCursor { row_count: 1, .. }));
        // past the terminator
        assert!(rows.insert(Cursor::new(0, 4), &['x']).is_err());
    }

    #[test]
    fn test_remove_range_same_row() {
        let (mut rows, _) = RowStore::from_text("abcdef");
        let removed = rows.remove_range(Cursor::new(0, 1), Cursor::new(0, 4));
        assert_eq!(removed, Some(chars("bcd")));
        assert_eq!(rows.text(), "aef");
    }

    #[test]
    fn test_remove_range_across_rows() {
        let (mut rows, _) = RowStore::from_text("one\ntwo\nthree\nfour");
        let removed = rows.remove_range(Cursor::new(0, 2), Cursor::new(2, 3));
        assert_eq!(removed, Some(chars("e\ntwo\nthr")));
        assert_eq!(rows.text(), "onee\nfour");
        assert_eq!(rows.row_count(), 2);
    }

    #[test]
    fn test_remove_range_degenerate_is_noop() {
        let (mut rows, _) = RowStore::from_text("abc\ndef");
        let before = rows.clone();
        assert_eq!(rows.remove_range(Cursor::new(0, 1), Cursor::new(0, 1)), None);
        assert_eq!(rows.remove_range(Cursor::new(1, 0), Cursor::new(0, 1)), None);
        assert_eq!(rows.remove_range(Cursor::new(1, 0), Cursor::new(1, 4)), None);
        assert_eq!(rows.remove_range(Cursor::new(0, 0), Cursor::new(5, 0)), None);
        assert_eq!(rows, before);
    }

    #[test]
    fn test_get_range_matches_remove() {
        let (mut rows, _) = RowStore::from_text("one\ntwo\nthree");
        let start = Cursor::new(0, 1);
        let end = Cursor::new(2, 2);
        let copied = rows.get_range(start, end);
        assert_eq!(copied, rows.remove_range(start, end));
    }

    #[test]
    fn test_to_bytes_strips_eof_and_applies_ending() {
        let (rows, ending) = RowStore::from_text("a\r\nb\r\n");
        assert_eq!(ending, LineEnding::Crlf);
        assert_eq!(rows.to_bytes(ending), b"a\r\nb\r\n".to_vec());
        assert_eq!(rows.to_bytes(LineEnding::Lf), b"a\nb\n".to_vec());
    }

    #[test]
    fn test_byte_addressing() {
        let (rows, _) = RowStore::from_text("aé日b");
        let row = rows.row(0).unwrap();
        assert_eq!(row.byte_offset(0), 0);
        assert_eq!(row.byte_offset(2), 3);
        assert_eq!(row.byte_offset(3), 6);
        assert_eq!(row.col_at_byte(4), Some(2));
        assert_eq!(row.col_at_byte(6), Some(3));
        assert_eq!(row.col_at_byte(100), None);
    }
}
