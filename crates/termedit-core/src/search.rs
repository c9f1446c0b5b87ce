//! Text search.
//!
//! Queries are compiled into a [`regex::Regex`] (plain queries are escaped first) and run row by
//! row over a snapshot of the buffer. Hits are reported as code-point spans, never byte offsets.
//!
//! A scan can run on a worker thread ([`spawn_search`]). It observes a [`CancelToken`] before
//! every row and every `guard` matches within a row, so an edit or a newer search can abort it
//! without waiting.

use std::ops::Range;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, TryRecvError, bounded};
use regex::{Regex, RegexBuilder};
use thiserror::Error;
use tracing::debug;

use crate::cursor::{Cursor, EditSpan};

/// Default number of matches scanned in one row between cancellation checks.
pub const DEFAULT_SCAN_GUARD: usize = 100_000;

/// Options that control how search is performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SearchOptions {
    /// If `true`, performs a case-sensitive search.
    pub case_sensitive: bool,
    /// If `true`, matches only whole words.
    pub whole_word: bool,
    /// If `true`, treats the query as a regex pattern.
    pub regex: bool,
}

/// Search errors.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("invalid regex: {0}")]
    /// The provided regex pattern failed to compile.
    InvalidRegex(#[from] regex::Error),
    #[error("failed to start search worker: {0}")]
    /// The worker thread could not be spawned.
    Worker(#[from] std::io::Error),
}

/// A match: a code-point span within one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SearchHit {
    /// First code point of the match.
    pub start: Cursor,
    /// One past the last code point of the match.
    pub stop: Cursor,
}

impl SearchHit {
    /// Whether the hit has collapsed to nothing.
    pub fn is_empty(&self) -> bool {
        self.start >= self.stop
    }

    /// Column range of a hit that lies within one row.
    pub fn columns(&self) -> Range<usize> {
        self.start.col..self.stop.col
    }

    /// Rebase both endpoints across an edit.
    pub fn rebase(&mut self, span: &EditSpan) {
        self.start = span.adjust(self.start);
        self.stop = span.adjust(self.stop);
    }
}

/// Shared flag that asks a running scan to stop.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// A compiled, non-empty query.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    regex: Regex,
    whole_word: bool,
}

impl SearchQuery {
    /// Compile `query`. An empty query yields `Ok(None)`: it matches nothing.
    pub fn new(query: &str, options: SearchOptions) -> Result<Option<Self>, SearchError> {
        if query.is_empty() {
            return Ok(None);
        }
        let pattern = if options.regex {
            query.to_string()
        } else {
            regex::escape(query)
        };
        let regex = RegexBuilder::new(&pattern)
            .case_insensitive(!options.case_sensitive)
            .build()?;
        Ok(Some(Self {
            regex,
            whole_word: options.whole_word,
        }))
    }

    /// Matches within one row's text (terminator excluded).
    ///
    /// Returns `None` if `token` was cancelled during the scan.
    pub fn find_in_row(
        &self,
        row: usize,
        text: &str,
        token: &CancelToken,
        guard: usize,
    ) -> Option<Vec<SearchHit>> {
        let guard = guard.max(1);
        let index = CharIndex::new(text);
        let mut hits = Vec::new();
        for (scanned, m) in self.regex.find_iter(text).enumerate() {
            if (scanned + 1) % guard == 0 && token.is_cancelled() {
                return None;
            }
            if m.is_empty() {
                continue;
            }
            let start = index.byte_to_char(m.start());
            let stop = index.byte_to_char(m.end());
            if self.whole_word && !is_whole_word(text, m.start(), m.end()) {
                continue;
            }
            hits.push(SearchHit {
                start: Cursor::new(row, start),
                stop: Cursor::new(row, stop),
            });
        }
        Some(hits)
    }
}

#[derive(Debug)]
struct CharIndex {
    char_to_byte: Vec<usize>,
}

impl CharIndex {
    fn new(text: &str) -> Self {
        let mut char_to_byte: Vec<usize> = text.char_indices().map(|(b, _)| b).collect();
        char_to_byte.push(text.len());
        Self { char_to_byte }
    }

    fn byte_to_char(&self, byte_offset: usize) -> usize {
        match self.char_to_byte.binary_search(&byte_offset) {
            Ok(idx) => idx,
            Err(idx) => idx,
        }
    }
}

fn is_word_char(ch: char) -> bool {
    ch == '_' || ch.is_alphanumeric()
}

fn is_whole_word(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
}

/// Scan every row of `rows`. Returns `None` if cancelled.
pub fn search_rows(
    rows: &[String],
    query: &SearchQuery,
    token: &CancelToken,
    guard: usize,
) -> Option<Vec<SearchHit>> {
    let mut hits = Vec::new();
    for (row, text) in rows.iter().enumerate() {
        if token.is_cancelled() {
            return None;
        }
        hits.extend(query.find_in_row(row, text, token, guard)?);
    }
    Some(hits)
}

/// Completed scan delivered by a worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchReport {
    /// Generation the scan was started for.
    pub generation: u64,
    /// Hits in buffer order.
    pub hits: Vec<SearchHit>,
}

/// State of a background scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchPoll {
    /// Still running.
    Pending,
    /// Finished with a report.
    Finished(SearchReport),
    /// Cancelled before finishing.
    Cancelled,
}

/// Handle on a background scan. Dropping it cancels the scan.
#[derive(Debug)]
pub struct SearchHandle {
    generation: u64,
    token: CancelToken,
    receiver: Receiver<SearchReport>,
    worker: Option<JoinHandle<()>>,
}

impl SearchHandle {
    /// Generation this scan was started for.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The scan's cancellation token.
    pub fn token(&self) -> &CancelToken {
        &self.token
    }

    /// Ask the scan to stop.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Check for completion without blocking.
    pub fn poll(&self) -> SearchPoll {
        match self.receiver.try_recv() {
            Ok(report) => SearchPoll::Finished(report),
            Err(TryRecvError::Empty) => SearchPoll::Pending,
            Err(TryRecvError::Disconnected) => SearchPoll::Cancelled,
        }
    }

    /// Block until the scan finishes. Returns `None` if it was cancelled.
    pub fn wait(mut self) -> Option<SearchReport> {
        let report = self.receiver.recv().ok();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
        report
    }
}

impl Drop for SearchHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Run `query` over `rows` on a worker thread.
pub fn spawn_search(
    generation: u64,
    rows: Vec<String>,
    query: SearchQuery,
    guard: usize,
) -> Result<SearchHandle, SearchError> {
    let token = CancelToken::new();
    let (sender, receiver) = bounded(1);
    let worker_token = token.clone();
    let worker = std::thread::Builder::new()
        .name(format!("search-{generation}"))
        .spawn(move || {
            match search_rows(&rows, &query, &worker_token, guard) {
                Some(hits) => {
                    debug!(generation, hits = hits.len(), "search finished");
                    let _ = sender.send(SearchReport { generation, hits });
                }
                None => debug!(generation, "search cancelled"),
            }
        })?;
    Ok(SearchHandle {
        generation,
        token,
        receiver,
        worker: Some(worker),
    })
}

/// Hits of the last finished search in a view, with the currently selected one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchResults {
    hits: Vec<SearchHit>,
    current: Option<usize>,
}

impl SearchResults {
    /// Wrap finished hits. Nothing is selected yet.
    pub fn new(hits: Vec<SearchHit>) -> Self {
        Self {
            hits,
            current: None,
        }
    }

    /// All hits in buffer order.
    pub fn hits(&self) -> &[SearchHit] {
        &self.hits
    }

    /// Whether there are no hits.
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// The selected hit.
    pub fn current(&self) -> Option<SearchHit> {
        self.current.and_then(|i| self.hits.get(i).copied())
    }

    /// Select the first hit at or after `from`, wrapping to the first hit.
    pub fn select_next(&mut self, from: Cursor) -> Option<SearchHit> {
        if self.hits.is_empty() {
            return None;
        }
        let index = self
            .hits
            .iter()
            .position(|h| h.start >= from)
            .unwrap_or(0);
        self.current = Some(index);
        self.current()
    }

    /// Select the last hit before `from`, wrapping to the last hit.
    pub fn select_prev(&mut self, from: Cursor) -> Option<SearchHit> {
        if self.hits.is_empty() {
            return None;
        }
        let index = self
            .hits
            .iter()
            .rposition(|h| h.start < from)
            .unwrap_or(self.hits.len() - 1);
        self.current = Some(index);
        self.current()
    }

    /// Column ranges of the hits on `row`.
    pub fn columns_on_row(&self, row: usize) -> Vec<Range<usize>> {
        self.hits
            .iter()
            .filter(|h| h.start.row == row && h.stop.row == row)
            .map(SearchHit::columns)
            .collect()
    }

    /// Rebase every hit across an edit, dropping hits that collapsed.
    pub fn rebase(&mut self, span: &EditSpan) {
        let selected = self.current();
        for hit in &mut self.hits {
            hit.rebase(span);
        }
        self.hits.retain(|h| !h.is_empty());
        self.current = selected.and_then(|old| {
            let mut moved = old;
            moved.rebase(span);
            self.hits.iter().position(|h| *h == moved)
        });
    }

    /// Forget all hits.
    pub fn clear(&mut self) {
        self.hits.clear();
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|s| s.to_string()).collect()
    }

    fn spans(hits: &[SearchHit]) -> Vec<(usize, usize, usize)> {
        hits.iter()
            .map(|h| (h.start.row, h.start.col, h.stop.col))
            .collect()
    }

    #[test]
    fn test_plain_search_is_case_insensitive_by_default() {
        let query = SearchQuery::new("foo", SearchOptions::default())
            .unwrap()
            .unwrap();
        let hits = search_rows(
            &rows(&["Foo bar", "xx fOO foo"]),
            &query,
            &CancelToken::new(),
            DEFAULT_SCAN_GUARD,
        )
        .unwrap();
        assert_eq!(spans(&hits), vec![(0, 0, 3), (1, 3, 6), (1, 7, 10)]);
    }

    #[test]
    fn test_plain_query_escapes_metacharacters() {
        let query = SearchQuery::new("a.b", SearchOptions::default())
            .unwrap()
            .unwrap();
        let hits = search_rows(&rows(&["axb a.b"]), &query, &CancelToken::new(), 10).unwrap();
        assert_eq!(spans(&hits), vec![(0, 4, 7)]);
    }

    #[test]
    fn test_columns_are_code_points() {
        let options = SearchOptions {
            regex: true,
            case_sensitive: true,
            ..SearchOptions::default()
        };
        let query = SearchQuery::new("語+", options).unwrap().unwrap();
        let hits = search_rows(&rows(&["日本語語です"]), &query, &CancelToken::new(), 10).unwrap();
        assert_eq!(spans(&hits), vec![(0, 2, 4)]);
    }

    #[test]
    fn test_whole_word() {
        let options = SearchOptions {
            whole_word: true,
            ..SearchOptions::default()
        };
        let query = SearchQuery::new("cat", options).unwrap().unwrap();
        let hits = search_rows(&rows(&["cat concat cat_ cat."]), &query, &CancelToken::new(), 10)
            .unwrap();
        assert_eq!(spans(&hits), vec![(0, 0, 3), (0, 16, 19)]);
    }

    #[test]
    fn test_empty_query_and_bad_regex() {
        assert!(SearchQuery::new("", SearchOptions::default()).unwrap().is_none());
        let options = SearchOptions {
            regex: true,
            ..SearchOptions::default()
        };
        assert!(matches!(
            SearchQuery::new("(", options),
            Err(SearchError::InvalidRegex(_))
        ));
    }

    #[test]
    fn test_cancelled_scan_returns_none() {
        let query = SearchQuery::new("a", SearchOptions::default())
            .unwrap()
            .unwrap();
        let token = CancelToken::new();
        token.cancel();
        assert_eq!(search_rows(&rows(&["aaa"]), &query, &token, 10), None);
        // guard check inside a long row
        assert_eq!(query.find_in_row(0, &"a".repeat(50), &token, 10), None);
    }

    #[test]
    fn test_worker_delivers_report() {
        let query = SearchQuery::new("needle", SearchOptions::default())
            .unwrap()
            .unwrap();
        let mut lines = vec!["hay".to_string(); 1000];
        lines[500] = "a needle here".to_string();
        let handle = spawn_search(7, lines, query, DEFAULT_SCAN_GUARD).unwrap();
        let report = handle.wait().unwrap();
        assert_eq!(report.generation, 7);
        assert_eq!(spans(&report.hits), vec![(500, 2, 8)]);
    }

    #[test]
    fn test_results_navigation_wraps() {
        let hit = |row, col| SearchHit {
            start: Cursor::new(row, col),
            stop: Cursor::new(row, col + 1),
        };
        let mut results = SearchResults::new(vec![hit(1, 0), hit(3, 2), hit(5, 1)]);
        assert_eq!(results.select_next(Cursor::new(2, 0)), Some(hit(3, 2)));
        assert_eq!(results.select_next(Cursor::new(6, 0)), Some(hit(1, 0)));
        assert_eq!(results.select_prev(Cursor::new(3, 2)), Some(hit(1, 0)));
        assert_eq!(results.select_prev(Cursor::new(0, 0)), Some(hit(5, 1)));
    }

    #[test]
    fn test_results_rebase_drops_collapsed_hits() {
        let mut results = SearchResults::new(vec![
            SearchHit {
                start: Cursor::new(0, 2),
                stop: Cursor::new(0, 4),
            },
            SearchHit {
                start: Cursor::new(1, 2),
                stop: Cursor::new(1, 4),
            },
        ]);
        results.select_next(Cursor::new(1, 0));
        results.rebase(&EditSpan::delete(Cursor::new(0, 0), Cursor::new(0, 5)));
        assert_eq!(results.hits().len(), 1);
        assert_eq!(results.current().unwrap().start, Cursor::new(1, 2));
        results.rebase(&EditSpan::insert(Cursor::new(0, 0), Cursor::new(1, 0)));
        assert_eq!(results.current().unwrap().start, Cursor::new(2, 2));
    }
}
