//! Undo/redo history.
//!
//! Every mutation of a buffer is recorded as an [`EditAction`]. Consecutive actions of the same
//! class whose cursors chain are merged, so typing or deleting one character at a time produces a
//! single undo step.

use tracing::trace;

use crate::cursor::{Cursor, EditSpan};
use crate::error::CoreError;
use crate::rows::RowStore;

/// What an [`EditAction`] did to the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionClass {
    /// Text inserted at `before`; the cursor ended at `after`.
    Insert,
    /// Text removed forward from `before`; the cursor stayed put.
    Delete,
    /// Text removed backward: the cursor moved from `before` to `after`.
    DeleteBackward,
}

/// One undoable change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditAction {
    /// Kind of change.
    pub class: ActionClass,
    /// Cursor before the change.
    pub before: Cursor,
    /// Cursor after the change.
    pub after: Cursor,
    /// Affected code points, in buffer order.
    pub data: Vec<char>,
}

impl EditAction {
    /// An insertion of `data` at `before` that ended at `after`.
    pub fn insert(before: Cursor, after: Cursor, data: Vec<char>) -> Self {
        Self {
            class: ActionClass::Insert,
            before,
            after,
            data,
        }
    }

    /// A forward deletion of `data` at `at`.
    pub fn delete(at: Cursor, data: Vec<char>) -> Self {
        Self {
            class: ActionClass::Delete,
            before: at,
            after: at,
            data,
        }
    }

    /// A backward deletion that moved the cursor from `before` to `after`.
    ///
    /// `deleted` lists the removed code points in the order they were deleted, nearest to the
    /// cursor first. [`History::record`] turns them back into buffer order.
    pub fn delete_backward(before: Cursor, after: Cursor, deleted: Vec<char>) -> Self {
        Self {
            class: ActionClass::DeleteBackward,
            before,
            after,
            data: deleted,
        }
    }

    /// The action that undoes this one.
    ///
    /// Undoing a forward delete re-inserts the text but leaves the cursor where the delete left
    /// it, so the inverse of `Delete` is an `Insert` whose `after` equals its `before`.
    pub fn inverse(&self) -> Self {
        match self.class {
            ActionClass::Insert => Self {
                class: ActionClass::DeleteBackward,
                before: self.after,
                after: self.before,
                data: self.data.clone(),
            },
            ActionClass::DeleteBackward => Self {
                class: ActionClass::Insert,
                before: self.after,
                after: self.before,
                data: self.data.clone(),
            },
            ActionClass::Delete => Self {
                class: ActionClass::Insert,
                before: self.before,
                after: self.before,
                data: self.data.clone(),
            },
        }
    }

    /// Replay this action against `rows`.
    ///
    /// Returns the affected span, or `None` if the removal was degenerate.
    pub fn apply(&self, rows: &mut RowStore) -> Result<Option<EditSpan>, CoreError> {
        match self.class {
            ActionClass::Insert => {
                let end = rows.insert(self.before, &self.data)?;
                Ok(Some(EditSpan::insert(self.before, end)))
            }
            ActionClass::Delete => {
                let end = self.before.advanced_over(&self.data);
                Ok(rows
                    .remove_range(self.before, end)
                    .map(|_| EditSpan::delete(self.before, end)))
            }
            ActionClass::DeleteBackward => Ok(rows
                .remove_range(self.after, self.before)
                .map(|_| EditSpan::delete(self.after, self.before))),
        }
    }

    fn chains_onto(&self, top: &EditAction) -> bool {
        self.class == top.class && top.after == self.before
    }
}

/// Two-stack undo model with a save mark.
#[derive(Debug, Clone)]
pub struct History {
    undo: Vec<EditAction>,
    redo: Vec<EditAction>,
    save_mark: Option<usize>,
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl History {
    /// Create an empty, clean history.
    pub fn new() -> Self {
        Self {
            undo: Vec::new(),
            redo: Vec::new(),
            save_mark: Some(0),
        }
    }

    /// Record a user edit: merge it into the top action when possible and clear redo.
    pub fn record(&mut self, mut action: EditAction) {
        self.redo.clear();
        // the saved state lived on the discarded redo branch
        if self.save_mark.is_some_and(|mark| mark > self.undo.len()) {
            self.save_mark = None;
        }
        if action.class == ActionClass::DeleteBackward {
            action.data.reverse();
        }

        let saved_at_top = self.save_mark_is_at_top();
        if let Some(top) = self.undo.last_mut()
            && !saved_at_top
            && action.chains_onto(top)
        {
            match action.class {
                ActionClass::Insert | ActionClass::Delete => top.data.extend(action.data),
                ActionClass::DeleteBackward => {
                    action.data.extend(top.data.drain(..));
                    top.data = action.data;
                }
            }
            top.after = action.after;
            trace!(class = ?top.class, len = top.data.len(), "merged edit action");
            return;
        }
        self.undo.push(action);
    }

    /// Pop the most recent action for undoing.
    pub fn pop_undo(&mut self) -> Option<EditAction> {
        self.undo.pop()
    }

    /// Pop the most recent undone action for redoing.
    pub fn pop_redo(&mut self) -> Option<EditAction> {
        self.redo.pop()
    }

    /// Push an action that was just undone.
    pub fn push_redo(&mut self, action: EditAction) {
        self.redo.push(action);
    }

    /// Push an action that was just redone. Unlike [`record`](Self::record) this neither merges
    /// nor clears the redo stack.
    pub fn push_undo(&mut self, action: EditAction) {
        self.undo.push(action);
    }

    /// Move every undo entry onto the redo stack with its class inverted.
    ///
    /// `Insert` and `DeleteBackward` swap into each other along with their cursors; `Delete`
    /// becomes `Insert`. Stack order is kept: the most recent action ends up on top of the redo
    /// stack, so the next redo reverts it first.
    pub fn move_all_to_redo(&mut self) {
        for action in self.undo.drain(..) {
            let moved = match action.class {
                ActionClass::Insert => EditAction {
                    class: ActionClass::DeleteBackward,
                    before: action.after,
                    after: action.before,
                    data: action.data,
                },
                ActionClass::DeleteBackward => EditAction {
                    class: ActionClass::Insert,
                    before: action.after,
                    after: action.before,
                    data: action.data,
                },
                ActionClass::Delete => EditAction {
                    class: ActionClass::Insert,
                    ..action
                },
            };
            self.redo.push(moved);
        }
        self.save_mark = Some(0);
    }

    /// Remember the current depth as the saved state.
    pub fn mark_saved(&mut self) {
        self.save_mark = Some(self.undo.len());
    }

    /// Whether the buffer differs from its saved state.
    pub fn is_dirty(&self) -> bool {
        self.save_mark != Some(self.undo.len())
    }

    /// Number of entries on the undo stack.
    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    /// Number of entries on the redo stack.
    pub fn redo_depth(&self) -> usize {
        self.redo.len()
    }

    /// Whether an undo is possible.
    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    /// Whether a redo is possible.
    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// The most recent undo entry.
    pub fn last(&self) -> Option<&EditAction> {
        self.undo.last()
    }

    /// Drop both stacks and mark the history clean.
    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
        self.save_mark = Some(0);
    }

    // A merge into the saved action would make the save mark lie about the content.
    fn save_mark_is_at_top(&self) -> bool {
        self.save_mark == Some(self.undo.len())
    }
}
