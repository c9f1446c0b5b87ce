//! Workspace: open buffers and the views into them.
//!
//! The [`Workspace`] owns every buffer (rows + history + parked metas) and every view (cursor +
//! boundary cache + viewport). Buffers and views refer to each other by id only: a buffer keeps a
//! registry of the [`ViewId`]s currently showing it, and a view names its [`BufferId`].
//!
//! Commands execute **against a specific view**. Text edits are applied to the view's buffer,
//! recorded in its history, and the resulting [`EditSpan`] is broadcast through
//! [`crate::sync`] to every other dependent of the same buffer.

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::{debug, warn};

use crate::config::EditorConfig;
use crate::cursor::{Cursor, EditSpan};
use crate::error::{CoreError, Outcome};
use crate::history::{EditAction, History};
use crate::layout::cell_width;
use crate::line_ending::LineEnding;
use crate::mark::{Mark, MarkRing};
use crate::rows::{EOF_MARK, RowStore};
use crate::search::{SearchError, SearchOptions, SearchPoll, SearchQuery};
use crate::snapshot::HeadlessGrid;
use crate::sync;
use crate::view::{Meta, Movement, View};

/// Opaque identifier for an open buffer in a [`Workspace`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BufferId(pub(crate) u64);

impl BufferId {
    /// Get the underlying numeric id.
    pub fn get(self) -> u64 {
        self.0
    }
}

/// Opaque identifier for a view in a [`Workspace`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ViewId(pub(crate) u64);

impl ViewId {
    /// Get the underlying numeric id.
    pub fn get(self) -> u64 {
        self.0
    }
}

/// Workspace-level errors.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("buffer {0:?} not found")]
    /// A buffer id was not found.
    BufferNotFound(BufferId),
    #[error("view {0:?} not found")]
    /// A view id was not found.
    ViewNotFound(ViewId),
    #[error("buffer {0:?} is read-only")]
    /// An edit was attempted on a read-only buffer.
    ReadOnly(BufferId),
    #[error(transparent)]
    /// The row store rejected an edit.
    Core(#[from] CoreError),
    #[error(transparent)]
    /// A search could not be started.
    Search(#[from] SearchError),
}

/// Text taken out of (or copied from) a buffer by a region command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Removed {
    /// Whether the command took effect.
    pub outcome: Outcome,
    /// The removed or copied text; empty when nothing happened.
    pub text: String,
}

impl Removed {
    fn nothing(outcome: Outcome) -> Self {
        Self {
            outcome,
            text: String::new(),
        }
    }

    fn done(data: &[char]) -> Self {
        Self {
            outcome: Outcome::Done,
            text: data.iter().collect(),
        }
    }
}

/// An open buffer.
#[derive(Debug)]
pub struct Buffer {
    uri: Option<String>,
    rows: RowStore,
    history: History,
    line_ending: LineEnding,
    metas: Vec<Meta>,
    views: Vec<ViewId>,
    read_only: bool,
}

impl Buffer {
    fn new(uri: Option<String>, rows: RowStore, line_ending: LineEnding) -> Self {
        Self {
            uri,
            rows,
            history: History::new(),
            line_ending,
            metas: Vec::new(),
            views: Vec::new(),
            read_only: false,
        }
    }

    /// Host-provided uri or path.
    pub fn uri(&self) -> Option<&str> {
        self.uri.as_deref()
    }

    /// The buffer text.
    pub fn rows(&self) -> &RowStore {
        &self.rows
    }

    /// Undo/redo history.
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Newline convention used when serializing.
    pub fn line_ending(&self) -> LineEnding {
        self.line_ending
    }

    /// Whether the buffer differs from its last saved state.
    pub fn is_dirty(&self) -> bool {
        self.history.is_dirty()
    }

    /// Whether edits are rejected.
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Views currently showing this buffer.
    pub fn view_ids(&self) -> &[ViewId] {
        &self.views
    }

    /// Parked states of views that switched away, oldest first.
    pub fn metas(&self) -> &[Meta] {
        &self.metas
    }
}

/// Which stack an applied action came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Replay {
    User,
    Undo,
    Redo,
}

/// Buffers, views and marks of one editor session.
#[derive(Debug, Default)]
pub struct Workspace {
    config: EditorConfig,
    next_buffer_id: u64,
    buffers: BTreeMap<BufferId, Buffer>,
    next_view_id: u64,
    views: BTreeMap<ViewId, View>,
    active_view: Option<ViewId>,
    marks: MarkRing,
}

impl Workspace {
    /// Create an empty workspace.
    pub fn new(config: EditorConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Settings shared by all views.
    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Returns the number of open buffers.
    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    /// Returns `true` if there are no open buffers.
    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Returns the number of open views.
    pub fn view_count(&self) -> usize {
        self.views.len()
    }

    /// Ids of all open buffers.
    pub fn buffer_ids(&self) -> impl Iterator<Item = BufferId> + '_ {
        self.buffers.keys().copied()
    }

    /// Look up a buffer.
    pub fn buffer(&self, id: BufferId) -> Option<&Buffer> {
        self.buffers.get(&id)
    }

    /// Look up a view.
    pub fn view(&self, id: ViewId) -> Option<&View> {
        self.views.get(&id)
    }

    /// The mark ring.
    pub fn marks(&self) -> &MarkRing {
        &self.marks
    }

    /// Return the active view id (if any).
    pub fn active_view_id(&self) -> Option<ViewId> {
        self.active_view
    }

    /// Set the active view.
    pub fn set_active_view(&mut self, id: ViewId) -> Result<(), WorkspaceError> {
        if !self.views.contains_key(&id) {
            return Err(WorkspaceError::ViewNotFound(id));
        }
        self.active_view = Some(id);
        Ok(())
    }

    /// Buffer shown by `view`.
    pub fn buffer_id_for_view(&self, view: ViewId) -> Result<BufferId, WorkspaceError> {
        self.views
            .get(&view)
            .map(View::buffer)
            .ok_or(WorkspaceError::ViewNotFound(view))
    }

    /// Cursor of `view`.
    pub fn cursor(&self, view: ViewId) -> Result<Cursor, WorkspaceError> {
        self.views
            .get(&view)
            .map(View::cursor)
            .ok_or(WorkspaceError::ViewNotFound(view))
    }

    /// Full text of a buffer, end-of-file marker excluded.
    pub fn text(&self, buffer: BufferId) -> Result<String, WorkspaceError> {
        Ok(self.buffer_ref(buffer)?.rows.text())
    }

    /// Open a buffer from raw text. The newline convention is detected.
    pub fn open_buffer(&mut self, uri: Option<String>, text: &str) -> BufferId {
        let (rows, line_ending) = RowStore::from_text(text);
        self.insert_buffer(uri, rows, line_ending)
    }

    /// Open a buffer from rows that already carry their `\n` terminators.
    pub fn open_lines<I, S>(&mut self, uri: Option<String>, lines: I, line_ending: LineEnding) -> BufferId
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.insert_buffer(uri, RowStore::from_lines(lines), line_ending)
    }

    fn insert_buffer(&mut self, uri: Option<String>, rows: RowStore, line_ending: LineEnding) -> BufferId {
        let id = BufferId(self.next_buffer_id);
        self.next_buffer_id = self.next_buffer_id.saturating_add(1);
        debug!(
            buffer = id.get(),
            uri = uri.as_deref().unwrap_or(""),
            rows = rows.row_count(),
            line_ending = line_ending.name(),
            "opened buffer"
        );
        self.buffers.insert(id, Buffer::new(uri, rows, line_ending));
        id
    }

    /// Create a view of `buffer`. The first view created becomes active.
    pub fn create_view(
        &mut self,
        buffer: BufferId,
        width: usize,
        height: usize,
    ) -> Result<ViewId, WorkspaceError> {
        let Some(entry) = self.buffers.get_mut(&buffer) else {
            return Err(WorkspaceError::BufferNotFound(buffer));
        };
        let id = ViewId(self.next_view_id);
        self.next_view_id = self.next_view_id.saturating_add(1);
        entry.views.push(id);
        self.views.insert(
            id,
            View::new(
                buffer,
                width,
                height,
                self.config.tab_width,
                self.config.vertical_threshold,
            ),
        );
        if self.active_view.is_none() {
            self.active_view = Some(id);
        }
        debug!(view = id.get(), buffer = buffer.get(), width, height, "created view");
        Ok(id)
    }

    /// Close a view. If no other view shows its buffer, the buffer is closed too.
    pub fn close_view(&mut self, id: ViewId) -> Result<(), WorkspaceError> {
        let Some(mut view) = self.views.remove(&id) else {
            return Err(WorkspaceError::ViewNotFound(id));
        };
        view.cancel_search();
        if self.active_view == Some(id) {
            self.active_view = self.views.keys().next().copied();
        }
        debug!(view = id.get(), "closed view");

        let buffer = view.buffer();
        let orphaned = match self.buffers.get_mut(&buffer) {
            Some(entry) => {
                entry.views.retain(|v| *v != id);
                entry.views.is_empty()
            }
            None => false,
        };
        if orphaned {
            self.close_buffer(buffer)?;
        }
        Ok(())
    }

    /// Close a buffer together with its views and marks.
    pub fn close_buffer(&mut self, id: BufferId) -> Result<(), WorkspaceError> {
        let Some(entry) = self.buffers.remove(&id) else {
            return Err(WorkspaceError::BufferNotFound(id));
        };
        for view in &entry.views {
            if let Some(mut view) = self.views.remove(view) {
                view.cancel_search();
            }
        }
        self.marks.remove_buffer(id);
        if self
            .active_view
            .is_some_and(|active| !self.views.contains_key(&active))
        {
            self.active_view = self.views.keys().next().copied();
        }
        debug!(buffer = id.get(), views = entry.views.len(), "closed buffer");
        Ok(())
    }

    /// Show `target` in `view`.
    ///
    /// The view's cursor and scroll position are parked as a meta on the buffer it leaves. The
    /// most recent meta of `target`, if any, is restored.
    pub fn switch_buffer(&mut self, view: ViewId, target: BufferId) -> Result<(), WorkspaceError> {
        let current = self.buffer_id_for_view(view)?;
        if current == target {
            return Ok(());
        }
        if !self.buffers.contains_key(&target) {
            return Err(WorkspaceError::BufferNotFound(target));
        }
        let Some(v) = self.views.get_mut(&view) else {
            return Err(WorkspaceError::ViewNotFound(view));
        };
        if let Some(old) = self.buffers.get_mut(&current) {
            old.metas.push(v.to_meta());
            old.views.retain(|id| *id != view);
        }
        let Some(new) = self.buffers.get_mut(&target) else {
            return Err(WorkspaceError::BufferNotFound(target));
        };
        let meta = new.metas.pop();
        new.views.push(view);
        v.attach(target, meta, &new.rows);
        debug!(
            view = view.get(),
            from = current.get(),
            to = target.get(),
            restored = meta.is_some(),
            "switched buffer"
        );
        Ok(())
    }

    /// Change a view's geometry. Its boundary cache is cleared if the width changed.
    pub fn resize_view(
        &mut self,
        view: ViewId,
        width: usize,
        height: usize,
    ) -> Result<(), WorkspaceError> {
        let Some(v) = self.views.get_mut(&view) else {
            return Err(WorkspaceError::ViewNotFound(view));
        };
        v.resize(width, height);
        Ok(())
    }

    /// Make a buffer read-only, or writable again.
    pub fn set_read_only(&mut self, buffer: BufferId, read_only: bool) -> Result<(), WorkspaceError> {
        self.buffer_mut(buffer)?.read_only = read_only;
        Ok(())
    }

    /// Run `f` with mutable access to a view and read access to its buffer's rows.
    pub fn with_view<R>(
        &mut self,
        view: ViewId,
        f: impl FnOnce(&mut View, &RowStore) -> R,
    ) -> Result<R, WorkspaceError> {
        let Some(v) = self.views.get_mut(&view) else {
            return Err(WorkspaceError::ViewNotFound(view));
        };
        let buffer = v.buffer();
        let Some(entry) = self.buffers.get(&buffer) else {
            return Err(WorkspaceError::BufferNotFound(buffer));
        };
        Ok(f(v, &entry.rows))
    }

    /// Move the cursor of `view`.
    pub fn move_cursor(&mut self, view: ViewId, movement: Movement) -> Result<Outcome, WorkspaceError> {
        self.with_view(view, |v, rows| v.move_cursor(rows, movement))
    }

    /// Scroll `view` to its cursor and render the visible screen lines.
    pub fn render(&mut self, view: ViewId) -> Result<HeadlessGrid, WorkspaceError> {
        self.with_view(view, |v, rows| v.render(rows))
    }

    /// Insert `text` at the cursor. End-of-file markers in the input are dropped.
    pub fn insert_text(&mut self, view: ViewId, text: &str) -> Result<Outcome, WorkspaceError> {
        let data: Vec<char> = text.chars().filter(|&c| c != EOF_MARK).collect();
        self.insert_chars(view, data)
    }

    /// Insert a tab, or spaces up to the next tab stop when `soft_tab` is set.
    pub fn insert_tab(&mut self, view: ViewId) -> Result<Outcome, WorkspaceError> {
        if !self.config.soft_tab {
            return self.insert_chars(view, vec!['\t']);
        }
        let tab_width = self.config.tab_width;
        let cursor = self.cursor(view)?;
        let rows = &self.buffer_ref(self.buffer_id_for_view(view)?)?.rows;
        let column = rows
            .row(cursor.row)
            .map(|row| {
                row.chars()[..cursor.col]
                    .iter()
                    .fold(0, |x, &ch| x + cell_width(ch, x, tab_width))
            })
            .unwrap_or(0);
        let spaces = tab_width - column % tab_width;
        self.insert_chars(view, vec![' '; spaces])
    }

    /// Split the row at the cursor, copying its indentation when `auto_indent` is set.
    pub fn newline(&mut self, view: ViewId) -> Result<Outcome, WorkspaceError> {
        let cursor = self.cursor(view)?;
        let mut data = vec!['\n'];
        if self.config.auto_indent {
            let rows = &self.buffer_ref(self.buffer_id_for_view(view)?)?.rows;
            if let Some(row) = rows.row(cursor.row) {
                let indent = row.indent_len().min(cursor.col);
                data.extend_from_slice(&row.chars()[..indent]);
            }
        }
        self.insert_chars(view, data)
    }

    fn insert_chars(&mut self, view: ViewId, data: Vec<char>) -> Result<Outcome, WorkspaceError> {
        self.writable(view)?;
        if data.is_empty() {
            return Ok(Outcome::Done);
        }
        let before = self.cursor(view)?;
        let after = before.advanced_over(&data);
        self.perform(view, EditAction::insert(before, after, data), Replay::User)?;
        Ok(Outcome::Done)
    }

    /// Delete the code point under the cursor.
    pub fn delete_forward(&mut self, view: ViewId) -> Result<Outcome, WorkspaceError> {
        let buffer = self.writable(view)?;
        let cursor = self.cursor(view)?;
        let rows = &self.buffer_ref(buffer)?.rows;
        if cursor == rows.end_cursor() {
            return Ok(Outcome::EndOfBuffer);
        }
        let Some(ch) = rows.row(cursor.row).and_then(|row| row.get(cursor.col)) else {
            return Ok(Outcome::EndOfBuffer);
        };
        self.perform(view, EditAction::delete(cursor, vec![ch]), Replay::User)?;
        Ok(Outcome::Done)
    }

    /// Delete the code point before the cursor, joining rows at column 0.
    pub fn delete_backward(&mut self, view: ViewId) -> Result<Outcome, WorkspaceError> {
        let buffer = self.writable(view)?;
        let cursor = self.cursor(view)?;
        let rows = &self.buffer_ref(buffer)?.rows;
        let prev = if cursor.col > 0 {
            Cursor::new(cursor.row, cursor.col - 1)
        } else if cursor.row > 0 {
            Cursor::new(cursor.row - 1, rows.row_len(cursor.row - 1).saturating_sub(1))
        } else {
            return Ok(Outcome::BeginningOfBuffer);
        };
        let Some(ch) = rows.row(prev.row).and_then(|row| row.get(prev.col)) else {
            return Ok(Outcome::BeginningOfBuffer);
        };
        self.perform(
            view,
            EditAction::delete_backward(cursor, prev, vec![ch]),
            Replay::User,
        )?;
        Ok(Outcome::Done)
    }

    /// Remove the rest of the row, or the newline itself when the cursor is already on it.
    pub fn kill_line(&mut self, view: ViewId) -> Result<Removed, WorkspaceError> {
        let buffer = self.writable(view)?;
        let cursor = self.cursor(view)?;
        let rows = &self.buffer_ref(buffer)?.rows;
        let terminator = rows.row_len(cursor.row).saturating_sub(1);
        let end = if cursor.col < terminator {
            Cursor::new(cursor.row, terminator)
        } else if cursor.row + 1 < rows.row_count() {
            Cursor::new(cursor.row + 1, 0)
        } else {
            return Ok(Removed::nothing(Outcome::EndOfBuffer));
        };
        self.remove_forward(view, buffer, cursor, end)
    }

    /// Remove the text between the cursor and the buffer's most recent mark.
    pub fn kill_region(&mut self, view: ViewId) -> Result<Removed, WorkspaceError> {
        let buffer = self.writable(view)?;
        match self.region(view)? {
            Ok((start, end)) => self.remove_forward(view, buffer, start, end),
            Err(outcome) => Ok(Removed::nothing(outcome)),
        }
    }

    /// Copy the text between the cursor and the buffer's most recent mark.
    pub fn copy_region(&mut self, view: ViewId) -> Result<Removed, WorkspaceError> {
        let buffer = self.buffer_id_for_view(view)?;
        let (start, end) = match self.region(view)? {
            Ok(region) => region,
            Err(outcome) => return Ok(Removed::nothing(outcome)),
        };
        let data = self
            .buffer_ref(buffer)?
            .rows
            .get_range(start, end)
            .unwrap_or_default();
        Ok(Removed::done(&data))
    }

    // Ordered (start, end) of the region, or the status explaining why there is none.
    fn region(&self, view: ViewId) -> Result<Result<(Cursor, Cursor), Outcome>, WorkspaceError> {
        let buffer = self.buffer_id_for_view(view)?;
        let cursor = self.cursor(view)?;
        let Some(mark) = self.marks.last_for(buffer) else {
            return Ok(Err(Outcome::NoMark));
        };
        if mark.cursor == cursor {
            return Ok(Err(Outcome::EmptyRegion));
        }
        Ok(Ok((cursor.min(mark.cursor), cursor.max(mark.cursor))))
    }

    fn remove_forward(
        &mut self,
        view: ViewId,
        buffer: BufferId,
        start: Cursor,
        end: Cursor,
    ) -> Result<Removed, WorkspaceError> {
        let Some(data) = self.buffer_ref(buffer)?.rows.get_range(start, end) else {
            return Ok(Removed::nothing(Outcome::EmptyRegion));
        };
        let removed = Removed::done(&data);
        self.perform(view, EditAction::delete(start, data), Replay::User)?;
        Ok(removed)
    }

    /// Set a mark at the cursor, or remove the one already there.
    ///
    /// Returns `true` if a mark is now set.
    pub fn set_mark(&mut self, view: ViewId) -> Result<bool, WorkspaceError> {
        let buffer = self.buffer_id_for_view(view)?;
        let cursor = self.cursor(view)?;
        if self.marks.unset(buffer, cursor) {
            debug!(buffer = buffer.get(), %cursor, "mark removed");
            return Ok(false);
        }
        let mark = Mark::new(buffer, cursor, &self.buffer_ref(buffer)?.rows);
        debug!(buffer = buffer.get(), %cursor, preview = %mark.preview, "mark set");
        self.marks.set(mark);
        Ok(true)
    }

    /// Exchange the cursor with the buffer's most recent mark.
    pub fn swap_cursor_and_mark(&mut self, view: ViewId) -> Result<Outcome, WorkspaceError> {
        let buffer = self.buffer_id_for_view(view)?;
        let cursor = self.cursor(view)?;
        let Some(mark) = self.marks.last_for(buffer) else {
            return Ok(Outcome::NoMark);
        };
        let target = mark.cursor;
        let replacement = Mark::new(buffer, cursor, &self.buffer_ref(buffer)?.rows);
        if let Some(mark) = self.marks.last_for_mut(buffer) {
            *mark = replacement;
        }
        self.with_view(view, |v, _| v.set_cursor(target))?;
        Ok(Outcome::Done)
    }

    /// Undo the most recent action of the view's buffer.
    pub fn undo(&mut self, view: ViewId) -> Result<Outcome, WorkspaceError> {
        let buffer = self.writable(view)?;
        let Some(action) = self.buffer_mut(buffer)?.history.pop_undo() else {
            return Ok(Outcome::NothingToUndo);
        };
        debug!(buffer = buffer.get(), class = ?action.class, len = action.data.len(), "undo");
        match self.perform(view, action.inverse(), Replay::Undo) {
            Ok(_) => {
                self.buffer_mut(buffer)?.history.push_redo(action);
                Ok(Outcome::Done)
            }
            Err(err) => {
                self.buffer_mut(buffer)?.history.push_undo(action);
                Err(err)
            }
        }
    }

    /// Redo the most recently undone action of the view's buffer.
    pub fn redo(&mut self, view: ViewId) -> Result<Outcome, WorkspaceError> {
        let buffer = self.writable(view)?;
        let Some(action) = self.buffer_mut(buffer)?.history.pop_redo() else {
            return Ok(Outcome::NothingToRedo);
        };
        debug!(buffer = buffer.get(), class = ?action.class, len = action.data.len(), "redo");
        match self.perform(view, action.clone(), Replay::Redo) {
            Ok(_) => {
                self.buffer_mut(buffer)?.history.push_undo(action);
                Ok(Outcome::Done)
            }
            Err(err) => {
                self.buffer_mut(buffer)?.history.push_redo(action);
                Err(err)
            }
        }
    }

    // Apply `action` to the view's buffer, place the view's cursor at `action.after` and bring
    // every other dependent of the buffer up to date.
    fn perform(
        &mut self,
        view: ViewId,
        action: EditAction,
        replay: Replay,
    ) -> Result<Option<EditSpan>, WorkspaceError> {
        let buffer = self.buffer_id_for_view(view)?;
        let Some(entry) = self.buffers.get_mut(&buffer) else {
            return Err(WorkspaceError::BufferNotFound(buffer));
        };
        let span = match action.apply(&mut entry.rows) {
            Ok(span) => span,
            Err(err) => {
                warn!(buffer = buffer.get(), %err, "edit rejected");
                return Err(err.into());
            }
        };
        let Some(span) = span else {
            return Ok(None);
        };

        if let Some(v) = self.views.get_mut(&view) {
            sync::commit_origin(v, &entry.rows, &span, action.after);
        }
        sync::synchronize(
            &span,
            buffer,
            Some(view),
            &mut self.views,
            &mut entry.metas,
            self.marks.for_buffer_mut(buffer),
        );
        if replay == Replay::User {
            entry.history.record(action);
        }
        Ok(Some(span))
    }

    /// Serialize a buffer with its newline convention.
    pub fn serialize(&self, buffer: BufferId) -> Result<Vec<u8>, WorkspaceError> {
        let entry = self.buffer_ref(buffer)?;
        Ok(entry.rows.to_bytes(entry.line_ending))
    }

    /// Change the newline convention used by [`serialize`](Self::serialize).
    pub fn set_line_ending(&mut self, buffer: BufferId, line_ending: LineEnding) -> Result<(), WorkspaceError> {
        self.buffer_mut(buffer)?.line_ending = line_ending;
        Ok(())
    }

    /// Record the current state of a buffer as saved.
    pub fn mark_saved(&mut self, buffer: BufferId) -> Result<(), WorkspaceError> {
        self.buffer_mut(buffer)?.history.mark_saved();
        Ok(())
    }

    /// Whether a buffer differs from its last saved state.
    pub fn is_dirty(&self, buffer: BufferId) -> Result<bool, WorkspaceError> {
        Ok(self.buffer_ref(buffer)?.is_dirty())
    }

    /// Swap in new contents produced outside the edit path, such as a formatter run at save time.
    ///
    /// The undo stack moves onto the redo stack, every view's cache is dropped and every cursor
    /// bound to the buffer is clamped into the new text.
    pub fn replace_contents(&mut self, buffer: BufferId, text: &str) -> Result<(), WorkspaceError> {
        let Some(entry) = self.buffers.get_mut(&buffer) else {
            return Err(WorkspaceError::BufferNotFound(buffer));
        };
        if entry.read_only {
            return Err(WorkspaceError::ReadOnly(buffer));
        }
        let (rows, _) = RowStore::from_text(text);
        entry.rows = rows;
        entry.history.move_all_to_redo();
        for meta in &mut entry.metas {
            meta.cursor = entry.rows.clamp(meta.cursor);
        }
        for mark in self.marks.for_buffer_mut(buffer) {
            mark.cursor = entry.rows.clamp(mark.cursor);
        }
        for id in &entry.views {
            if let Some(v) = self.views.get_mut(id) {
                v.cache_mut().clear();
                v.cancel_search();
                v.search_mut().clear();
                v.set_cursor(entry.rows.clamp(v.cursor()));
            }
        }
        debug!(
            buffer = buffer.get(),
            rows = entry.rows.row_count(),
            redo = entry.history.redo_depth(),
            "replaced buffer contents"
        );
        Ok(())
    }

    /// Start a background search in `view`. An empty query clears the results.
    pub fn start_search(
        &mut self,
        view: ViewId,
        query: &str,
        options: SearchOptions,
    ) -> Result<(), WorkspaceError> {
        let query = SearchQuery::new(query, options)?;
        let guard = self.config.search_scan_guard;
        self.with_view(view, |v, rows| v.start_search(rows, query, guard))??;
        Ok(())
    }

    /// Collect the view's background search if it has finished.
    pub fn poll_search(&mut self, view: ViewId) -> Result<SearchPoll, WorkspaceError> {
        let Some(v) = self.views.get_mut(&view) else {
            return Err(WorkspaceError::ViewNotFound(view));
        };
        Ok(v.poll_search())
    }

    /// Search and wait for the result. Returns the number of hits.
    pub fn search_blocking(
        &mut self,
        view: ViewId,
        query: &str,
        options: SearchOptions,
    ) -> Result<usize, WorkspaceError> {
        self.start_search(view, query, options)?;
        let Some(v) = self.views.get_mut(&view) else {
            return Err(WorkspaceError::ViewNotFound(view));
        };
        v.wait_search();
        Ok(v.search_results().hits().len())
    }

    /// Move to the next search hit after the cursor, wrapping to the first.
    pub fn next_hit(&mut self, view: ViewId) -> Result<Outcome, WorkspaceError> {
        self.with_view(view, |v, _| {
            let cursor = v.cursor();
            let from = Cursor::new(cursor.row, cursor.col + 1);
            match v.search_mut().select_next(from) {
                Some(hit) => {
                    v.set_cursor(hit.start);
                    Outcome::Done
                }
                None => Outcome::NoSearchHits,
            }
        })
    }

    /// Move to the previous search hit before the cursor, wrapping to the last.
    pub fn prev_hit(&mut self, view: ViewId) -> Result<Outcome, WorkspaceError> {
        self.with_view(view, |v, _| {
            let cursor = v.cursor();
            match v.search_mut().select_prev(cursor) {
                Some(hit) => {
                    v.set_cursor(hit.start);
                    Outcome::Done
                }
                None => Outcome::NoSearchHits,
            }
        })
    }

    /// Replace the selected search hit with `replacement` and leave the cursor after it.
    pub fn replace_current_hit(
        &mut self,
        view: ViewId,
        replacement: &str,
    ) -> Result<Outcome, WorkspaceError> {
        let buffer = self.writable(view)?;
        let Some(hit) = self
            .views
            .get(&view)
            .and_then(|v| v.search_results().current())
        else {
            return Ok(Outcome::NoSearchHits);
        };
        self.remove_forward(view, buffer, hit.start, hit.stop)?;
        self.insert_text(view, replacement)
    }

    fn writable(&self, view: ViewId) -> Result<BufferId, WorkspaceError> {
        let buffer = self.buffer_id_for_view(view)?;
        if self.buffer_ref(buffer)?.read_only {
            return Err(WorkspaceError::ReadOnly(buffer));
        }
        Ok(buffer)
    }

    fn buffer_ref(&self, id: BufferId) -> Result<&Buffer, WorkspaceError> {
        self.buffers
            .get(&id)
            .ok_or(WorkspaceError::BufferNotFound(id))
    }

    fn buffer_mut(&mut self, id: BufferId) -> Result<&mut Buffer, WorkspaceError> {
        self.buffers
            .get_mut(&id)
            .ok_or(WorkspaceError::BufferNotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn workspace_with(text: &str) -> (Workspace, BufferId, ViewId) {
        let mut ws = Workspace::new(EditorConfig::default());
        let buffer = ws.open_buffer(None, text);
        let view = ws.create_view(buffer, 40, 10).unwrap();
        (ws, buffer, view)
    }

    #[test]
    fn test_typing_merges_into_one_undo_step() {
        let (mut ws, buffer, view) = workspace_with("");
        for ch in ["a", "b", "c"] {
            ws.insert_text(view, ch).unwrap();
        }
        assert_eq!(ws.text(buffer).unwrap(), "abc");
        assert_eq!(ws.buffer(buffer).unwrap().history().undo_depth(), 1);
        assert_eq!(ws.undo(view).unwrap(), Outcome::Done);
        assert_eq!(ws.text(buffer).unwrap(), "");
        assert_eq!(ws.cursor(view).unwrap(), Cursor::new(0, 0));
        assert_eq!(ws.undo(view).unwrap(), Outcome::NothingToUndo);
        assert_eq!(ws.redo(view).unwrap(), Outcome::Done);
        assert_eq!(ws.text(buffer).unwrap(), "abc");
        assert_eq!(ws.cursor(view).unwrap(), Cursor::new(0, 3));
    }

    #[test]
    fn test_backspace_merge_keeps_buffer_order() {
        let (mut ws, buffer, view) = workspace_with("hello");
        ws.move_cursor(view, Movement::LineEnd).unwrap();
        for _ in 0..3 {
            ws.delete_backward(view).unwrap();
        }
        assert_eq!(ws.text(buffer).unwrap(), "he");
        let top = ws.buffer(buffer).unwrap().history().last().unwrap().clone();
        assert_eq!(top.data, vec!['l', 'l', 'o']);
        ws.undo(view).unwrap();
        assert_eq!(ws.text(buffer).unwrap(), "hello");
        assert_eq!(ws.cursor(view).unwrap(), Cursor::new(0, 5));
    }

    #[test]
    fn test_boundary_conditions_are_outcomes() {
        let (mut ws, _, view) = workspace_with("x");
        assert_eq!(ws.delete_backward(view).unwrap(), Outcome::BeginningOfBuffer);
        ws.move_cursor(view, Movement::BufferEnd).unwrap();
        assert_eq!(ws.delete_forward(view).unwrap(), Outcome::EndOfBuffer);
        assert_eq!(ws.redo(view).unwrap(), Outcome::NothingToRedo);
        assert_eq!(ws.kill_region(view).unwrap().outcome, Outcome::NoMark);
        ws.set_mark(view).unwrap();
        assert_eq!(ws.kill_region(view).unwrap().outcome, Outcome::EmptyRegion);
    }

    #[test]
    fn test_newline_auto_indent_and_soft_tab() {
        let mut ws = Workspace::new(EditorConfig {
            soft_tab: true,
            ..EditorConfig::default()
        });
        let buffer = ws.open_buffer(None, "    let x");
        let view = ws.create_view(buffer, 40, 10).unwrap();
        ws.move_cursor(view, Movement::LineEnd).unwrap();
        ws.newline(view).unwrap();
        assert_eq!(ws.cursor(view).unwrap(), Cursor::new(1, 4));
        ws.insert_text(view, "ab").unwrap();
        ws.insert_tab(view).unwrap();
        assert_eq!(ws.text(buffer).unwrap(), "    let x\n    ab  ");
    }

    #[test]
    fn test_kill_line_then_join() {
        let (mut ws, buffer, view) = workspace_with("one two\nthree");
        ws.move_cursor(view, Movement::NextWord).unwrap();
        let killed = ws.kill_line(view).unwrap();
        assert_eq!(killed.text, "two");
        let joined = ws.kill_line(view).unwrap();
        assert_eq!(joined.text, "\n");
        assert_eq!(ws.text(buffer).unwrap(), "one three");
        ws.move_cursor(view, Movement::BufferEnd).unwrap();
        assert_eq!(ws.kill_line(view).unwrap().outcome, Outcome::EndOfBuffer);
    }

    #[test]
    fn test_kill_region_and_undo() {
        let (mut ws, buffer, view) = workspace_with("alpha beta gamma");
        ws.move_cursor(view, Movement::NextWord).unwrap();
        ws.set_mark(view).unwrap();
        ws.move_cursor(view, Movement::NextWord).unwrap();
        assert_eq!(ws.copy_region(view).unwrap().text, "beta ");
        let killed = ws.kill_region(view).unwrap();
        assert_eq!(killed.text, "beta ");
        assert_eq!(ws.text(buffer).unwrap(), "alpha gamma");
        assert_eq!(ws.cursor(view).unwrap(), Cursor::new(0, 6));
        ws.undo(view).unwrap();
        assert_eq!(ws.text(buffer).unwrap(), "alpha beta gamma");
        ws.redo(view).unwrap();
        assert_eq!(ws.text(buffer).unwrap(), "alpha gamma");
    }

    #[test]
    fn test_swap_cursor_and_mark() {
        let (mut ws, buffer, view) = workspace_with("abc def");
        ws.set_mark(view).unwrap();
        ws.move_cursor(view, Movement::LineEnd).unwrap();
        assert_eq!(ws.swap_cursor_and_mark(view).unwrap(), Outcome::Done);
        assert_eq!(ws.cursor(view).unwrap(), Cursor::new(0, 0));
        assert_eq!(ws.marks().last_for(buffer).unwrap().cursor, Cursor::new(0, 7));
    }

    #[test]
    fn test_read_only_rejects_edits() {
        let (mut ws, buffer, view) = workspace_with("text");
        ws.set_read_only(buffer, true).unwrap();
        assert!(matches!(
            ws.insert_text(view, "x"),
            Err(WorkspaceError::ReadOnly(_))
        ));
        assert_eq!(ws.text(buffer).unwrap(), "text");
    }

    #[test]
    fn test_read_only_rejects_replace_contents() {
        let (mut ws, buffer, view) = workspace_with("text");
        ws.insert_text(view, "more ").unwrap();
        ws.set_read_only(buffer, true).unwrap();
        assert!(matches!(
            ws.replace_contents(buffer, "reformatted"),
            Err(WorkspaceError::ReadOnly(_))
        ));
        assert_eq!(ws.text(buffer).unwrap(), "more text");
        assert_eq!(ws.buffer(buffer).unwrap().history().undo_depth(), 1);

        ws.set_read_only(buffer, false).unwrap();
        ws.replace_contents(buffer, "reformatted").unwrap();
        assert_eq!(ws.text(buffer).unwrap(), "reformatted");
    }

    #[test]
    fn test_save_mark_and_dirty() {
        let (mut ws, buffer, view) = workspace_with("");
        assert!(!ws.is_dirty(buffer).unwrap());
        ws.insert_text(view, "a").unwrap();
        assert!(ws.is_dirty(buffer).unwrap());
        ws.mark_saved(buffer).unwrap();
        assert!(!ws.is_dirty(buffer).unwrap());
        ws.insert_text(view, "b").unwrap();
        assert_eq!(ws.buffer(buffer).unwrap().history().undo_depth(), 2);
        ws.undo(view).unwrap();
        assert!(!ws.is_dirty(buffer).unwrap());
    }

    #[test]
    fn test_serialize_keeps_line_ending() {
        let (mut ws, buffer, view) = workspace_with("a\r\nb\r\n");
        assert_eq!(ws.buffer(buffer).unwrap().line_ending(), LineEnding::Crlf);
        ws.move_cursor(view, Movement::BufferEnd).unwrap();
        ws.insert_text(view, "c").unwrap();
        assert_eq!(ws.serialize(buffer).unwrap(), b"a\r\nb\r\nc".to_vec());
    }

    #[test]
    fn test_close_last_view_closes_buffer() {
        let (mut ws, buffer, view) = workspace_with("x");
        let second = ws.create_view(buffer, 20, 5).unwrap();
        ws.close_view(view).unwrap();
        assert!(ws.buffer(buffer).is_some());
        assert_eq!(ws.active_view_id(), Some(second));
        ws.close_view(second).unwrap();
        assert!(ws.buffer(buffer).is_none());
        assert!(ws.is_empty());
        assert!(matches!(
            ws.close_view(second),
            Err(WorkspaceError::ViewNotFound(_))
        ));
    }
}
