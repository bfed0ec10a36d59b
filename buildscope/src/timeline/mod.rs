//! Trace forest and its projection from the entry tree
//!
//! - `model`: arena-backed [`Timeline`] of [`TimelineEntry`] values
//! - `projector`: pre-order projection of an [`EntryTree`](crate::building::EntryTree)

pub mod model;
pub mod projector;

pub use model::{Checkpoint, EntryKind, LaneAssignment, LogLine, Timeline, TimelineEntry};
pub use projector::{project, strip_common_prefix};
