//! Compiler report-time sections.
//!
//! The front-end can report where its time went, as tab-indented trees
//! under three section headers:
//!
//! ```text
//! Include Headers:
//! 	Count: 2
//! 	c:\include\vector: 0.5s
//! 		c:\include\xmemory: 0.2s
//! 	c:\include\string: 0.3s
//!
//! 	Total: 1.0s
//! ```
//!
//! Each section becomes a child of the front-end node of the file being
//! compiled (falling back to the per-file node, then the task itself) and
//! starts with it. Items are laid out back to back under their parent; the
//! `Total` line fixes the section's end.

use log::trace;

use super::patterns::{self, TimedStep};
use super::{end_after, is_task_named, DiagnosticMiner};
use crate::domain::{EntryId, MiningError};
use crate::timeline::{Timeline, TimelineEntry};

#[derive(Debug, Clone, Copy, Default)]
pub struct ReportTimeMiner;

/// An open section and the indentation path to the current item
#[derive(Debug)]
struct Section {
    id: EntryId,
    /// `path[0]` is the section; `path[d - 1]` is the parent of depth-`d` items
    path: Vec<EntryId>,
}

impl Section {
    fn open(timeline: &mut Timeline, anchor: EntryId, header: &str) -> Self {
        let start = timeline.entry(anchor).start;
        let name = header.trim().trim_end_matches(':');
        let id = timeline.add_synthetic(anchor, name, start, start);
        Self { id, path: vec![id] }
    }

    fn parent(&self) -> EntryId {
        self.path.last().copied().unwrap_or(self.id)
    }

    /// Back to the section's base depth
    fn reset(&mut self) {
        self.path.truncate(1);
    }

    fn add_item(
        &mut self,
        timeline: &mut Timeline,
        depth: usize,
        item: &TimedStep,
        line: &str,
    ) -> Result<(), MiningError> {
        // Deeper: descend into the most recent item
        while depth > self.path.len() {
            match timeline.last_child(self.parent()) {
                Some(child) => self.path.push(child),
                None => break,
            }
        }
        // Shallower: back up to the matching ancestor
        if depth < self.path.len() {
            self.path.truncate(depth.max(1));
        }

        let parent = self.parent();
        let start = timeline
            .last_child(parent)
            .map_or(timeline.entry(parent).start, |sibling| timeline.entry(sibling).end);
        let end = end_after(start, item.elapsed, line)?;
        timeline.add_synthetic(parent, item.name.as_str(), start, end);
        Ok(())
    }

    /// Close without a `Total` line: cover the items
    fn close(self, timeline: &mut Timeline) {
        if let Some(end) = timeline
            .entry(self.id)
            .children
            .iter()
            .map(|&child| timeline.entry(child).end)
            .max()
        {
            timeline.extend_end(self.id, end);
        }
    }
}

/// Node the sections of `file` hang under
fn anchor_for(timeline: &Timeline, task: EntryId, file: Option<&str>) -> EntryId {
    let Some(file) = file else {
        return task;
    };
    let file = patterns::base_name(file);
    let Some(file_node) = timeline.entry(task).children.iter().rev().copied().find(|&child| {
        patterns::base_name(&timeline.entry(child).name).eq_ignore_ascii_case(file)
    }) else {
        return task;
    };
    timeline
        .entry(file_node)
        .children
        .iter()
        .copied()
        .find(|&child| patterns::is_front_end_stage(&timeline.entry(child).name))
        .unwrap_or(file_node)
}

impl DiagnosticMiner for ReportTimeMiner {
    fn name(&self) -> &'static str {
        "report time"
    }

    fn applies(&self, task: &TimelineEntry) -> bool {
        is_task_named(task, "CL")
            && task
                .messages
                .iter()
                .any(|line| patterns::is_report_section(&line.text))
    }

    fn mine(&self, timeline: &mut Timeline, task: EntryId) -> Result<usize, MiningError> {
        let lines = timeline.entry(task).messages.clone();
        let mut current_file: Option<&str> = None;
        let mut section: Option<Section> = None;
        let mut created = 0;

        for line in &lines {
            let text = line.text.as_str();

            if let Some(file) = patterns::source_file_name(text) {
                if let Some(open) = section.take() {
                    open.close(timeline);
                }
                current_file = Some(file);
                continue;
            }

            if patterns::is_report_section(text) {
                if let Some(open) = section.take() {
                    open.close(timeline);
                }
                let anchor = anchor_for(timeline, task, current_file);
                section = Some(Section::open(timeline, anchor, text));
                created += 1;
                continue;
            }

            let Some(open) = section.as_mut() else {
                continue;
            };

            if text.trim().is_empty() {
                open.reset();
            } else if let Some(total) = patterns::report_total_line(text)? {
                let end = end_after(timeline.entry(open.id).start, total, text)?;
                timeline.entry_mut(open.id).end = end;
                section = None;
            } else if let Some((depth, item)) = patterns::report_item_line(text)? {
                open.add_item(timeline, depth, &item, text)?;
                created += 1;
            } else {
                trace!("Unrecognized report-time line: {text:?}");
            }
        }

        if let Some(open) = section {
            open.close(timeline);
        }
        Ok(created)
    }
}
