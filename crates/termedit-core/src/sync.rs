//! Cursor synchronization.
//!
//! After a committed edit every position bound to the buffer is moved with the same
//! [`EditSpan::adjust`] rule: each view's cursor, each parked [`Meta`], each [`Mark`] and each
//! search hit. Boundary caches of the other views are shifted; the view that performed the edit
//! re-measures the edited row itself in [`commit_origin`].
//!
//! A pass runs to completion and never triggers another edit.

use std::collections::BTreeMap;

use tracing::trace;

use crate::cursor::{Cursor, EditSpan};
use crate::mark::Mark;
use crate::rows::RowStore;
use crate::view::{Meta, View};
use crate::workspace::{BufferId, ViewId};

/// Place the performing view after its own edit.
///
/// The cache is shifted like everyone else's, then the edited row is measured right away so the
/// next redraw of this view finds it warm.
pub fn commit_origin(view: &mut View, rows: &RowStore, span: &EditSpan, cursor: Cursor) {
    let cache = view.cache_mut();
    cache.apply_edit(span);
    cache.get(rows, span.start.row);
    view.set_cursor(cursor);
    view.overlay_follow_edit(span);
}

/// Rebase every dependent of `buffer` other than `origin` across `span`.
pub fn synchronize<'a>(
    span: &EditSpan,
    buffer: BufferId,
    origin: Option<ViewId>,
    views: &mut BTreeMap<ViewId, View>,
    metas: &mut [Meta],
    marks: impl IntoIterator<Item = &'a mut Mark>,
) {
    let mut followed = 0;
    for (id, view) in views.iter_mut() {
        if view.buffer() != buffer || Some(*id) == origin {
            continue;
        }
        view.follow_edit(span);
        followed += 1;
    }
    for meta in metas.iter_mut() {
        meta.rebase(span);
    }
    let mut rebased_marks = 0;
    for mark in marks {
        mark.rebase(span);
        rebased_marks += 1;
    }
    trace!(
        kind = ?span.kind,
        start = %span.start,
        end = %span.end,
        views = followed,
        metas = metas.len(),
        marks = rebased_marks,
        "synchronized dependents"
    );
}
