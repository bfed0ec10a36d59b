//! Domain types providing compile-time safety and self-documentation
//!
//! Time and node identifiers come from the shared event model; the handles
//! below only exist inside the core.

use std::fmt;

pub use buildscope_common::{Duration, NodeId, Timestamp};

/// Stable handle of an entry inside an arena.
///
/// Handles are plain indices, so parent links never form ownership
/// cycles and ancestor walks stay O(depth).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(serde::Serialize)]
#[serde(transparent)]
pub struct EntryId(pub usize);

impl EntryId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Synthetic concurrency lane within one node (0-indexed).
///
/// Lanes are a visualization aid: two overlapping entries on the same node
/// never share one, but a lane is not an operating-system thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[derive(serde::Serialize)]
#[serde(transparent)]
pub struct Lane(pub u32);

impl fmt::Display for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Lane#{}", self.0)
    }
}
