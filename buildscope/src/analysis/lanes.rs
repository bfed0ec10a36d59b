//! Lane inference for timeline entries.
//!
//! The event stream carries no thread identity below node granularity, so
//! lanes are inferred from the time intervals alone: a first-fit
//! interval-graph coloring, done in one top-down pass per forest.
//!
//! # Algorithm (per entry)
//!
//! 1. Lanes of already-resolved siblings of the entry, or of any of its
//!    ancestors, that overlap the entry are invalid.
//! 2. Lanes of registered lane owners on the same node that overlap the
//!    entry and are not its ancestors are invalid.
//! 3. The inherited lane (the parent's) is kept if still valid, otherwise
//!    the smallest valid lane is taken.
//! 4. Parentless entries, and entries that left their parent's lane, become
//!    lane owners under `(node, lane)`.
//! 5. Children inherit the lane as their starting candidate.
//!
//! Parents are resolved before their children and earlier siblings before
//! later ones, so every entry sees all overlapping entries resolved before
//! it.
//!
//! Lanes are a visualization aid; they do not recover operating-system
//! threads.

use std::collections::{BTreeMap, BTreeSet};

use log::debug;

use crate::domain::{EntryId, Lane, NodeId};
use crate::timeline::Timeline;

/// Registry of lane-owning entries, scoped to a single resolution pass
#[derive(Debug, Default)]
struct LaneOwners {
    owners: BTreeMap<(NodeId, Lane), Vec<EntryId>>,
}

impl LaneOwners {
    fn register(&mut self, node: NodeId, lane: Lane, id: EntryId) {
        self.owners.entry((node, lane)).or_default().push(id);
    }

    /// Every owner on `node`, with its lane
    fn on_node(&self, node: NodeId) -> impl Iterator<Item = (Lane, EntryId)> + '_ {
        self.owners
            .range((node, Lane(0))..=(node, Lane(u32::MAX)))
            .flat_map(|(&(_, lane), ids)| ids.iter().map(move |&id| (lane, id)))
    }
}

/// Resolve lanes for every entry of the forest.
///
/// Returns the number of lanes used per node.
pub fn resolve_lanes(timeline: &mut Timeline) -> BTreeMap<NodeId, u32> {
    let mut owners = LaneOwners::default();

    let roots: Vec<EntryId> = timeline.roots().iter().flatten().copied().collect();
    for root in roots {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let lane = resolve_entry(timeline, &mut owners, id);

            let children = timeline.entry(id).children.clone();
            for &child in &children {
                timeline.entry_mut(child).lane.lane = lane;
            }
            stack.extend(children.into_iter().rev());
        }
    }

    let mut lanes_per_node = BTreeMap::new();
    for (_, entry) in timeline.iter() {
        let count = lanes_per_node.entry(entry.node_id).or_insert(0);
        *count = (*count).max(entry.lane.lane.0 + 1);
    }
    for (node, count) in &lanes_per_node {
        debug!("{node}: {count} lane(s)");
    }
    lanes_per_node
}

fn resolve_entry(timeline: &mut Timeline, owners: &mut LaneOwners, id: EntryId) -> Lane {
    let entry = timeline.entry(id);
    let mut invalid: BTreeSet<Lane> = entry.lane.invalid_lanes.clone();

    // Overlapping resolved siblings of the entry and of each ancestor
    let mut level = id;
    while let Some(parent) = timeline.entry(level).parent {
        for &sibling in &timeline.entry(parent).children {
            let other = timeline.entry(sibling);
            if sibling != level && other.lane.resolved && other.overlaps(entry) {
                invalid.insert(other.lane.lane);
            }
        }
        level = parent;
    }

    // Independent subtrees on the same node
    for (lane, owner) in owners.on_node(entry.node_id) {
        if owner != id && !timeline.is_ancestor(owner, id) && timeline.entry(owner).overlaps(entry)
        {
            invalid.insert(lane);
        }
    }

    let hint = entry.lane.lane;
    let lane = if invalid.contains(&hint) {
        first_free_lane(&invalid)
    } else {
        hint
    };

    let parent_lane = entry.parent.map(|parent| timeline.entry(parent).lane.lane);
    let node = entry.node_id;

    let assignment = &mut timeline.entry_mut(id).lane;
    assignment.invalid_lanes = invalid;
    assignment.lane = lane;
    assignment.resolved = true;

    if parent_lane != Some(lane) {
        owners.register(node, lane, id);
    }
    lane
}

/// Smallest lane not in `invalid`
fn first_free_lane(invalid: &BTreeSet<Lane>) -> Lane {
    let mut candidate = 0u32;
    for lane in invalid {
        if lane.0 != candidate {
            break;
        }
        candidate += 1;
    }
    Lane(candidate)
}
