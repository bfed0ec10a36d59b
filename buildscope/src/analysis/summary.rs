//! Trace statistics.
//!
//! One line per trace for the CLI, plus per-node counts:
//!
//! ```text
//! 42 entries (12 mined) on 3 nodes, span 12.50s
//!   Node#1: 1 root, 20 entries, 2 lanes
//! ```

use std::collections::BTreeMap;
use std::fmt;

use crate::domain::{Duration, NodeId, Timestamp};
use crate::timeline::{EntryKind, Timeline};

/// Counts for one execution node
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeSummary {
    pub roots: usize,
    pub entries: usize,
    pub lanes: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraceSummary {
    pub entries: usize,
    /// Entries synthesized by the diagnostic miners
    pub synthesized: usize,
    pub nodes: BTreeMap<NodeId, NodeSummary>,
    /// Wall-clock span from the earliest start to the latest end
    pub span: Duration,
}

impl TraceSummary {
    #[must_use]
    pub fn from_timeline(timeline: &Timeline) -> Self {
        let mut summary = TraceSummary {
            entries: timeline.len(),
            ..TraceSummary::default()
        };

        let mut first: Option<Timestamp> = None;
        let mut last: Option<Timestamp> = None;
        for (_, entry) in timeline.iter() {
            if entry.kind == EntryKind::Synthetic {
                summary.synthesized += 1;
            }
            let node = summary.nodes.entry(entry.node_id).or_default();
            node.entries += 1;
            node.lanes = node.lanes.max(entry.lane.lane.0 + 1);
            if entry.parent.is_none() {
                node.roots += 1;
            }
            first = Some(first.map_or(entry.start, |t| t.min(entry.start)));
            last = Some(last.map_or(entry.end, |t| t.max(entry.end)));
        }

        if let (Some(first), Some(last)) = (first, last) {
            summary.span = last - first;
        }
        summary
    }
}

impl fmt::Display for TraceSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} entries ({} mined) on {} nodes, span {}",
            self.entries,
            self.synthesized,
            self.nodes.len(),
            self.span
        )?;
        for (node, counts) in &self.nodes {
            writeln!(
                f,
                "  {node}: {} root{}, {} entries, {} lane{}",
                counts.roots,
                if counts.roots == 1 { "" } else { "s" },
                counts.entries,
                counts.lanes,
                if counts.lanes == 1 { "" } else { "s" },
            )?;
        }
        Ok(())
    }
}
