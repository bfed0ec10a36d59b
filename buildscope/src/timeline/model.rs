//! Timeline data model
//!
//! The externally visible trace: an arena of [`TimelineEntry`] values plus a
//! forest indexed by node. Parents are stored as arena handles, so the lane
//! resolver can walk ancestors without ownership cycles and the fitter can
//! mutate timestamps in place.

use std::collections::BTreeSet;

use serde::ser::{Serialize, Serializer};

use crate::domain::{Duration, EntryId, Lane, NodeId, Timestamp};

/// Where a timeline entry came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Build,
    Project,
    Target,
    Task,
    /// Sub-phase recovered from diagnostic text
    Synthetic,
}

/// Lane bookkeeping of one entry.
///
/// `lane` holds the inherited hint until `resolved` is set; `invalid_lanes`
/// only grows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaneAssignment {
    pub lane: Lane,
    pub invalid_lanes: BTreeSet<Lane>,
    pub resolved: bool,
}

/// One line of diagnostic text, stamped with the time of its message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub timestamp: Timestamp,
    pub text: String,
}

impl LogLine {
    pub fn new(timestamp: Timestamp, text: impl Into<String>) -> Self {
        Self {
            timestamp,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TimelineEntry {
    pub name: String,
    pub kind: EntryKind,
    pub node_id: NodeId,
    pub start: Timestamp,
    pub end: Timestamp,
    pub parent: Option<EntryId>,
    pub children: Vec<EntryId>,
    pub lane: LaneAssignment,
    /// Diagnostic lines of task entries, input for the miners
    pub messages: Vec<LogLine>,
}

impl TimelineEntry {
    pub fn new(
        name: impl Into<String>,
        kind: EntryKind,
        node_id: NodeId,
        start: Timestamp,
        end: Timestamp,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            node_id,
            start,
            end,
            parent: None,
            children: Vec::new(),
            lane: LaneAssignment::default(),
            messages: Vec::new(),
        }
    }

    #[must_use]
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Half-open interval intersection of `[start, end)`
    #[must_use]
    pub fn overlaps(&self, other: &TimelineEntry) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Arena length taken before mining, so a failed miner's contribution can
/// be discarded.
#[derive(Debug, Clone, Copy)]
pub struct Checkpoint {
    entries: usize,
}

/// Trace forest: roots per node, all entries in one arena.
#[derive(Debug, Default)]
pub struct Timeline {
    entries: Vec<TimelineEntry>,
    roots: Vec<Vec<EntryId>>,
}

impl Timeline {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn entry(&self, id: EntryId) -> &TimelineEntry {
        &self.entries[id.index()]
    }

    pub fn entry_mut(&mut self, id: EntryId) -> &mut TimelineEntry {
        &mut self.entries[id.index()]
    }

    /// All entries with their handles, in creation order
    pub fn iter(&self) -> impl Iterator<Item = (EntryId, &TimelineEntry)> {
        self.entries.iter().enumerate().map(|(i, e)| (EntryId(i), e))
    }

    /// Root lists indexed by node
    #[must_use]
    pub fn roots(&self) -> &[Vec<EntryId>] {
        &self.roots
    }

    #[must_use]
    pub fn roots_on(&self, node: NodeId) -> &[EntryId] {
        self.roots
            .get(node.index())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Add a forest root under its own node
    pub fn add_root(&mut self, entry: TimelineEntry) -> EntryId {
        let node = entry.node_id.index();
        if self.roots.len() <= node {
            self.roots.resize_with(node + 1, Vec::new);
        }
        let id = self.push(entry);
        self.roots[node].push(id);
        id
    }

    /// Append `entry` as the last child of `parent`
    pub fn add_child(&mut self, parent: EntryId, mut entry: TimelineEntry) -> EntryId {
        entry.parent = Some(parent);
        let id = self.push(entry);
        self.entries[parent.index()].children.push(id);
        id
    }

    /// Synthesize a sub-phase under `parent`, on the parent's node
    pub fn add_synthetic(
        &mut self,
        parent: EntryId,
        name: impl Into<String>,
        start: Timestamp,
        end: Timestamp,
    ) -> EntryId {
        let node = self.entry(parent).node_id;
        self.add_child(
            parent,
            TimelineEntry::new(name, EntryKind::Synthetic, node, start, end),
        )
    }

    fn push(&mut self, entry: TimelineEntry) -> EntryId {
        let id = EntryId(self.entries.len());
        self.entries.push(entry);
        id
    }

    /// Last child of `id`, if any
    #[must_use]
    pub fn last_child(&self, id: EntryId) -> Option<EntryId> {
        self.entry(id).children.last().copied()
    }

    /// True if `ancestor` is a strict ancestor of `id`
    #[must_use]
    pub fn is_ancestor(&self, ancestor: EntryId, id: EntryId) -> bool {
        let mut current = self.entry(id).parent;
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = self.entry(parent).parent;
        }
        false
    }

    /// Every descendant of `id` (not including `id`), pre-order
    #[must_use]
    pub fn descendants(&self, id: EntryId) -> Vec<EntryId> {
        let mut out = Vec::new();
        let mut stack: Vec<EntryId> = self.entry(id).children.iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.entry(next).children.iter().rev().copied());
        }
        out
    }

    /// Move every descendant of `id` by `delta` without rescaling
    pub fn shift_descendants(&mut self, id: EntryId, delta: Duration) {
        if delta == Duration::ZERO {
            return;
        }
        for descendant in self.descendants(id) {
            let entry = self.entry_mut(descendant);
            entry.start = entry.start + delta;
            entry.end = entry.end + delta;
        }
    }

    /// Extend the end of `id` so it covers `end`
    pub fn extend_end(&mut self, id: EntryId, end: Timestamp) {
        let entry = self.entry_mut(id);
        entry.end = entry.end.max(end);
    }

    #[must_use]
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            entries: self.entries.len(),
        }
    }

    /// Drop every entry created since `checkpoint` and unlink it from the
    /// subtree of `id`.
    ///
    /// Only valid while new entries were attached inside `id`'s subtree.
    pub fn rollback(&mut self, id: EntryId, checkpoint: Checkpoint) {
        self.entries.truncate(checkpoint.entries);
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            let children = &mut self.entry_mut(next).children;
            children.retain(|child| child.index() < checkpoint.entries);
            stack.extend(children.iter().copied());
        }
    }

    /// Entries with children whose `[start, end)` is not contained in the
    /// parent's
    #[must_use]
    pub fn containment_violations(&self) -> Vec<EntryId> {
        self.iter()
            .filter(|(_, entry)| {
                entry.children.iter().any(|&child| {
                    let child = self.entry(child);
                    child.start < entry.start || child.end > entry.end
                })
            })
            .map(|(id, _)| id)
            .collect()
    }

    /// Pairs of non-nested entries on one node that overlap in time and
    /// still share a lane
    #[must_use]
    pub fn lane_conflicts(&self) -> Vec<(EntryId, EntryId)> {
        let mut conflicts = Vec::new();
        for (a_id, a) in self.iter() {
            for (b_id, b) in self.iter().skip(a_id.index() + 1) {
                if a.node_id == b.node_id
                    && a.lane.lane == b.lane.lane
                    && a.overlaps(b)
                    && !self.is_ancestor(a_id, b_id)
                    && !self.is_ancestor(b_id, a_id)
                {
                    conflicts.push((a_id, b_id));
                }
            }
        }
        conflicts
    }

    /// Highest lane in use plus one, per node
    #[must_use]
    pub fn lane_count(&self, node: NodeId) -> u32 {
        self.iter()
            .filter(|(_, e)| e.node_id == node)
            .map(|(_, e)| e.lane.lane.0 + 1)
            .max()
            .unwrap_or(0)
    }
}

// Serialization: nested per-node trees, the shape trace exporters consume

#[derive(serde::Serialize)]
struct SerializedNode<'a> {
    node_id: NodeId,
    roots: Vec<SerializedEntry<'a>>,
}

#[derive(serde::Serialize)]
struct SerializedEntry<'a> {
    name: &'a str,
    kind: EntryKind,
    lane: Lane,
    start: Timestamp,
    end: Timestamp,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    children: Vec<SerializedEntry<'a>>,
}

impl Timeline {
    fn serialized_entry(&self, id: EntryId) -> SerializedEntry<'_> {
        let entry = self.entry(id);
        SerializedEntry {
            name: &entry.name,
            kind: entry.kind,
            lane: entry.lane.lane,
            start: entry.start,
            end: entry.end,
            children: entry
                .children
                .iter()
                .map(|&child| self.serialized_entry(child))
                .collect(),
        }
    }
}

impl Serialize for Timeline {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let nodes: Vec<SerializedNode<'_>> = self
            .roots
            .iter()
            .enumerate()
            .filter(|(_, roots)| !roots.is_empty())
            .map(|(node, roots)| SerializedNode {
                node_id: NodeId(u32::try_from(node).unwrap_or(u32::MAX)),
                roots: roots.iter().map(|&id| self.serialized_entry(id)).collect(),
            })
            .collect();
        nodes.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> Timestamp {
        Timestamp::from_secs(secs)
    }

    fn sample() -> (Timeline, EntryId, EntryId, EntryId) {
        let mut timeline = Timeline::new();
        let root = timeline.add_root(TimelineEntry::new(
            "build",
            EntryKind::Build,
            NodeId(0),
            at(0),
            at(10),
        ));
        let child = timeline.add_synthetic(root, "child", at(1), at(5));
        let grandchild = timeline.add_synthetic(child, "grandchild", at(2), at(3));
        (timeline, root, child, grandchild)
    }

    #[test]
    fn test_overlap_is_half_open() {
        let a = TimelineEntry::new("a", EntryKind::Task, NodeId(1), at(0), at(5));
        let b = TimelineEntry::new("b", EntryKind::Task, NodeId(1), at(5), at(9));
        let c = TimelineEntry::new("c", EntryKind::Task, NodeId(1), at(4), at(6));
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&c));
        assert!(c.overlaps(&b));
    }

    #[test]
    fn test_ancestry_and_descendants() {
        let (timeline, root, child, grandchild) = sample();
        assert!(timeline.is_ancestor(root, grandchild));
        assert!(timeline.is_ancestor(child, grandchild));
        assert!(!timeline.is_ancestor(grandchild, child));
        assert!(!timeline.is_ancestor(root, root));
        assert_eq!(timeline.descendants(root), vec![child, grandchild]);
    }

    #[test]
    fn test_shift_descendants_moves_only_subtree() {
        let (mut timeline, root, child, grandchild) = sample();
        timeline.shift_descendants(child, Duration::from_secs(2));
        assert_eq!(timeline.entry(grandchild).start, at(4));
        assert_eq!(timeline.entry(grandchild).end, at(5));
        assert_eq!(timeline.entry(child).start, at(1));
        assert_eq!(timeline.entry(root).start, at(0));
    }

    #[test]
    fn test_rollback_discards_new_children() {
        let (mut timeline, root, _, _) = sample();
        let (child, grandchild) = (EntryId(1), EntryId(2));
        let checkpoint = timeline.checkpoint();
        let extra = timeline.add_synthetic(root, "extra", at(6), at(7));
        timeline.add_synthetic(extra, "nested", at(6), at(7));
        timeline.add_synthetic(grandchild, "deep", at(2), at(3));
        timeline.rollback(root, checkpoint);

        assert_eq!(timeline.len(), 3);
        assert_eq!(timeline.entry(root).children, vec![child]);
        assert!(timeline.entry(grandchild).children.is_empty());
    }

    #[test]
    fn test_synthetic_inherits_node() {
        let mut timeline = Timeline::new();
        let task = timeline.add_root(TimelineEntry::new(
            "CL",
            EntryKind::Task,
            NodeId(3),
            at(0),
            at(1),
        ));
        let phase = timeline.add_synthetic(task, "c1xx.dll", at(0), at(1));
        assert_eq!(timeline.entry(phase).node_id, NodeId(3));
        assert_eq!(timeline.roots_on(NodeId(3)), &[task]);
        assert!(timeline.roots_on(NodeId(1)).is_empty());
    }

    #[test]
    fn test_serialize_nested_forest() {
        let (timeline, _, _, _) = sample();
        let json = serde_json::to_value(&timeline).unwrap();
        assert_eq!(json[0]["node_id"], 0);
        assert_eq!(json[0]["roots"][0]["name"], "build");
        assert_eq!(json[0]["roots"][0]["children"][0]["children"][0]["name"], "grandchild");
        assert_eq!(json[0]["roots"][0]["start"], 0);
    }
}
