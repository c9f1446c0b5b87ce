#![warn(missing_docs)]
//! termedit-core - editing core for a terminal text editor
//!
//! # Overview
//!
//! `termedit-core` holds the state of a terminal editor without drawing anything: buffer text as
//! rows of code points, undo/redo history, East-Asian aware soft wrap with line-break
//! prohibition rules, a per-view cache of wrap boundaries, viewport scrolling, and the
//! synchronization that keeps every view, mark and search hit of a buffer consistent after an
//! edit made through any one of them.
//!
//! A front end paints the [`HeadlessGrid`] returned by [`Workspace::render`].
//!
//! # Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  Workspace (buffers, views, edit commands)  │  ← Public API
//! ├─────────────────────────────────────────────┤
//! │  Cursor Synchronizer                        │  ← Edit broadcast
//! ├─────────────────────────────────────────────┤
//! │  Viewport + Snapshot (HeadlessGrid)         │  ← Rendering data
//! ├─────────────────────────────────────────────┤
//! │  Boundary Cache (per view)                  │  ← Measured rows
//! ├─────────────────────────────────────────────┤
//! │  Line-Break Engine                          │  ← Text layout
//! ├─────────────────────────────────────────────┤
//! │  Row Store + Edit History                   │  ← Text storage
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use termedit_core::{Cursor, EditorConfig, Movement, Workspace};
//!
//! let mut ws = Workspace::new(EditorConfig::default());
//! let buffer = ws.open_buffer(None, "fn main() {\n}\n");
//! let left = ws.create_view(buffer, 40, 10).unwrap();
//! let right = ws.create_view(buffer, 20, 10).unwrap();
//!
//! ws.move_cursor(right, Movement::NextLine).unwrap();
//! ws.insert_text(left, "// entry point\n").unwrap();
//!
//! // the other view's cursor followed the inserted row
//! assert_eq!(ws.cursor(right).unwrap(), Cursor::new(2, 0));
//!
//! ws.undo(left).unwrap();
//! assert_eq!(ws.cursor(right).unwrap(), Cursor::new(1, 0));
//!
//! let grid = ws.render(left).unwrap();
//! assert_eq!(grid.lines[0].text(), "fn main() {↵");
//! ```
//!
//! # Module Description
//!
//! - [`rows`] - row store and persistence interface
//! - [`history`] - undo/redo stacks with action merging and a save mark
//! - [`layout`] - line-break engine
//! - [`cache`] - per-view boundary cache
//! - [`viewport`] - scrolling with a vertical threshold band
//! - [`sync`] - cursor synchronizer
//! - [`snapshot`] - headless render output
//! - [`search`] - background search with cancellation
//! - [`workspace`] - buffers, views and edit commands

pub mod cache;
pub mod config;
pub mod cursor;
pub mod error;
pub mod history;
pub mod layout;
pub mod line_ending;
pub mod mark;
pub mod rows;
pub mod search;
pub mod snapshot;
pub mod sync;
pub mod view;
pub mod viewport;
pub mod workspace;

pub use cache::BoundaryCache;
pub use config::{ConfigError, EditorConfig};
pub use cursor::{Cursor, EditKind, EditSpan, adjust_for_deletion, adjust_for_insertion};
pub use error::{CoreError, Outcome};
pub use history::{ActionClass, EditAction, History};
pub use layout::{Boundary, CharClass, RowLayout, compute_boundaries};
pub use line_ending::{LineEnding, split_lines};
pub use mark::{Mark, MarkRing};
pub use rows::{EOF_MARK, Row, RowStore};
pub use search::{
    CancelToken, SearchError, SearchHandle, SearchHit, SearchOptions, SearchPoll, SearchQuery,
    SearchReport, SearchResults, search_rows, spawn_search,
};
pub use snapshot::{Cell, CellStyle, HeadlessGrid, HeadlessLine};
pub use view::{Meta, Movement, View};
pub use viewport::{ScreenPos, ScrollState, Viewport};
pub use workspace::{Buffer, BufferId, Removed, ViewId, Workspace, WorkspaceError};
