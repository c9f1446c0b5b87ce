//! Error and status types.
//!
//! Failures that must abort a command are [`CoreError`] values. Boundary conditions a user
//! routinely runs into (moving past the last row, undoing with an empty stack) are reported as an
//! [`Outcome`] instead, so the command layer can surface a status line without treating them as
//! errors.

use thiserror::Error;

use crate::cursor::Cursor;

/// Errors raised by the row store and the edit history.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("cursor {cursor} is outside the buffer ({row_count} rows)")]
    /// An insert was attempted at a position that no longer exists.
    StaleCursor {
        /// The rejected position.
        cursor: Cursor,
        /// Row count of the buffer at the time of the attempt.
        row_count: usize,
    },
}

/// Result status of a command that may legitimately do nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// The command took effect.
    Done,
    /// The cursor is already at the start of the buffer.
    BeginningOfBuffer,
    /// The cursor is already at the end of the buffer.
    EndOfBuffer,
    /// The undo stack is empty.
    NothingToUndo,
    /// The redo stack is empty.
    NothingToRedo,
    /// A region command was issued without a mark in this buffer.
    NoMark,
    /// A region command was issued with identical start and end.
    EmptyRegion,
    /// A go-to-line target outside the buffer.
    InvalidLine,
    /// No search results to navigate.
    NoSearchHits,
}

impl Outcome {
    /// Returns `true` if the command took effect.
    pub fn is_done(self) -> bool {
        self == Self::Done
    }
}
