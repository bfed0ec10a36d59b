//! Interval fitting.
//!
//! Sub-timings recovered from compiler output are measured by the compiler
//! itself and drift from the wall-clock bounds of the enclosing task. When a
//! subtree's children end after their parent, the children are rescaled
//! proportionally into the parent's span:
//!
//! ```text
//! parent   [0 ─────── 2)
//! children [0 ───────────────────── 5)     scale = 2 / 5
//!       →  [0 ─────── 2)
//! ```
//!
//! Each child's offset from the parent start is multiplied by the scale
//! (truncating to whole ticks). Grandchildren are absolute timestamps, so
//! they are shifted by the child's start delta before the child itself is
//! fitted. A subtree that already fits is left untouched.

use log::{debug, warn};

use crate::domain::{Duration, EntryId, Timestamp};
use crate::timeline::Timeline;

/// Fit every forest of the timeline.
///
/// Returns the number of entries whose children were rescaled.
pub fn fit_timeline(timeline: &mut Timeline) -> usize {
    let roots: Vec<EntryId> = timeline.roots().iter().flatten().copied().collect();
    roots.into_iter().map(|root| fit_entry(timeline, root)).sum()
}

/// Fit `id` and its whole subtree, parent before children.
pub fn fit_entry(timeline: &mut Timeline, id: EntryId) -> usize {
    let mut rescaled = 0;
    let mut stack = vec![id];
    while let Some(next) = stack.pop() {
        if rescale_children(timeline, next) {
            rescaled += 1;
        }
        stack.extend(timeline.entry(next).children.iter().rev().copied());
    }
    rescaled
}

/// Squeeze the children of `id` into its span if they overflow it.
fn rescale_children(timeline: &mut Timeline, id: EntryId) -> bool {
    let entry = timeline.entry(id);
    let Some(max_end) = entry.children.iter().map(|&c| timeline.entry(c).end).max() else {
        return false;
    };
    let min_start = entry
        .children
        .iter()
        .map(|&c| timeline.entry(c).start)
        .min()
        .unwrap_or(entry.start);

    debug_assert!(
        min_start >= entry.start,
        "{} starts before its parent {}",
        min_start,
        entry.start
    );
    if min_start < entry.start {
        warn!("Child of {:?} starts before its parent; fitting anyway", entry.name);
    }

    if max_end <= entry.end {
        return false;
    }

    let origin = entry.start;
    let span = entry.end - origin;
    let children_span = max_end - origin;
    debug!(
        "Rescaling children of {:?} by {}/{}",
        entry.name, span.0, children_span.0
    );

    for child in entry.children.clone() {
        let (old_start, old_end) = {
            let c = timeline.entry(child);
            (c.start, c.end)
        };
        let new_start = scale(old_start, origin, span, children_span);
        let new_end = scale(old_end, origin, span, children_span);

        timeline.shift_descendants(child, new_start - old_start);
        let c = timeline.entry_mut(child);
        c.start = new_start;
        c.end = new_end;
    }
    true
}

/// `origin + (t - origin) * span / children_span`, truncated to whole ticks
fn scale(t: Timestamp, origin: Timestamp, span: Duration, children_span: Duration) -> Timestamp {
    let offset = i128::from((t - origin).0);
    let scaled = offset * i128::from(span.0) / i128::from(children_span.0);
    // |scaled| <= |offset| because span < children_span
    origin + Duration(i64::try_from(scaled).unwrap_or(i64::MAX))
}
