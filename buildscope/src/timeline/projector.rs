//! Entry tree → timeline projection
//!
//! Pre-order walk over the entry tree. Each entry becomes a
//! [`TimelineEntry`] named after its start event; it hangs under its
//! parent's projection when both run on the same node, and otherwise opens
//! a new forest root on its own node (the point where work was handed to
//! another execution node).

use buildscope_common::{EventKind, NodeId};
use log::debug;

use super::model::{EntryKind, LogLine, Timeline, TimelineEntry};
use crate::building::{Entry, EntryTree};
use crate::config::BuildMetadata;
use crate::domain::EntryId;

/// Project a closed entry tree into the trace forest.
#[must_use]
pub fn project(tree: &EntryTree, metadata: &BuildMetadata) -> Timeline {
    let mut timeline = Timeline::new();

    // (entry in the tree, projection of its parent)
    let mut stack: Vec<(EntryId, Option<EntryId>)> = vec![(tree.root(), None)];
    while let Some((id, projected_parent)) = stack.pop() {
        let entry = tree.get(id);
        let projected = project_entry(entry, metadata);

        let same_node = projected_parent
            .is_some_and(|parent| timeline.entry(parent).node_id == projected.node_id);
        let projected_id = match projected_parent {
            Some(parent) if same_node => timeline.add_child(parent, projected),
            _ => timeline.add_root(projected),
        };

        stack.extend(
            entry
                .children
                .iter()
                .rev()
                .map(|&child| (child, Some(projected_id))),
        );
    }

    debug!(
        "Projected {} entries onto {} nodes",
        timeline.len(),
        timeline.roots().iter().filter(|roots| !roots.is_empty()).count()
    );
    timeline
}

fn project_entry(entry: &Entry, metadata: &BuildMetadata) -> TimelineEntry {
    let node = entry.context().map_or(NodeId::BUILD, |c| c.node_id);
    let start = entry.start.timestamp;
    let end = entry.end.as_ref().map_or(start, |e| e.timestamp);

    let (name, kind) = match &entry.start.kind {
        EventKind::ProjectStarted { project_file, .. } => (
            strip_common_prefix(project_file, &metadata.solution_path).to_string(),
            EntryKind::Project,
        ),
        EventKind::TargetStarted { target_name, .. } => (target_name.clone(), EntryKind::Target),
        EventKind::TaskStarted { task_name, .. } => (task_name.clone(), EntryKind::Task),
        // Only start events open entries; anything else is the build root
        _ => (metadata.display_name(), EntryKind::Build),
    };

    let mut projected = TimelineEntry::new(name, kind, node, start, end);
    if kind == EntryKind::Task {
        projected.messages = message_lines(entry);
    }
    projected
}

/// Diagnostic text of an entry, one [`LogLine`] per line of each message.
///
/// An empty message still counts as one (blank) line.
fn message_lines(entry: &Entry) -> Vec<LogLine> {
    let mut lines = Vec::new();
    for event in &entry.events {
        if !matches!(
            event.kind,
            EventKind::Message(_) | EventKind::Warning(_) | EventKind::Error(_)
        ) {
            continue;
        }
        if event.message.is_empty() {
            lines.push(LogLine::new(event.timestamp, ""));
            continue;
        }
        lines.extend(
            event
                .message
                .lines()
                .map(|line| LogLine::new(event.timestamp, line)),
        );
    }
    lines
}

/// Strip the longest common leading path (whole components, compared
/// ASCII-case-insensitively) that `path` shares with `base`.
///
/// The final component of `path` is always kept, and nothing is stripped
/// unless a named component matches.
///
/// ```
/// use buildscope::timeline::strip_common_prefix;
///
/// assert_eq!(
///     strip_common_prefix(r"C:\src\app\lib\lib.vcxproj", r"C:\src\app\app.sln"),
///     r"lib\lib.vcxproj"
/// );
/// assert_eq!(strip_common_prefix("/a/b.proj", ""), "/a/b.proj");
/// ```
#[must_use]
pub fn strip_common_prefix<'a>(path: &'a str, base: &str) -> &'a str {
    if base.is_empty() {
        return path;
    }

    let is_separator = |c: char| c == '\\' || c == '/';
    let mut base_parts = base.split(is_separator);
    let mut offset = 0;
    let mut named_match = false;

    for part in path.split(is_separator) {
        match base_parts.next() {
            Some(base_part) if base_part.eq_ignore_ascii_case(part) => {}
            _ => break,
        }
        let next = offset + part.len() + 1;
        if next > path.len() {
            break;
        }
        offset = next;
        named_match |= !part.is_empty();
    }

    if named_match {
        &path[offset..]
    } else {
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::building::build_entry_tree;
    use buildscope_common::{Event, EventContext, Timestamp};

    fn at(secs: i64) -> Timestamp {
        Timestamp::from_secs(secs)
    }

    fn metadata() -> BuildMetadata {
        BuildMetadata {
            solution_path: r"C:\src\app\app.sln".to_string(),
            target: "Build".to_string(),
            ..BuildMetadata::default()
        }
    }

    fn project_started(ctx: EventContext, file: &str, parent: Option<EventContext>, secs: i64) -> Event {
        let kind = EventKind::ProjectStarted {
            project_file: file.to_string(),
            parent_context: parent,
        };
        Event::new(kind, Some(ctx), at(secs))
    }

    fn project_finished(ctx: EventContext, secs: i64) -> Event {
        let kind = EventKind::ProjectFinished {
            project_file: String::new(),
            succeeded: true,
        };
        Event::new(kind, Some(ctx), at(secs))
    }

    #[test]
    fn test_strip_common_prefix() {
        assert_eq!(
            strip_common_prefix(r"C:\src\app\core\core.vcxproj", r"c:\SRC\app\app.sln"),
            r"core\core.vcxproj"
        );
        assert_eq!(strip_common_prefix("/work/a/a.proj", "/work/b/b.sln"), "a/a.proj");
        assert_eq!(strip_common_prefix("app.sln", "app.sln"), "app.sln");
        assert_eq!(strip_common_prefix(r"D:\x\y.proj", r"C:\x\z.sln"), r"D:\x\y.proj");
    }

    #[test]
    fn test_absolute_path_keeps_leading_separator() {
        assert_eq!(strip_common_prefix("/a/b.proj", ""), "/a/b.proj");
        assert_eq!(strip_common_prefix("/x/a.proj", "/y/b.sln"), "/x/a.proj");
        assert_eq!(strip_common_prefix(r"\x\a.proj", r"\y\b.sln"), r"\x\a.proj");
    }

    #[test]
    fn test_node_boundaries_create_forest_roots() {
        let outer = EventContext::project(1, 1, 1);
        let target = outer.with_target(1);
        let task = target.with_task(1);
        let inner = EventContext::project(2, 2, 2);
        let inner_target = inner.with_target(1);

        let events = vec![
            Event::new(EventKind::BuildStarted, None, at(0)),
            project_started(outer, r"C:\src\app\app.vcxproj", None, 1),
            Event::new(
                EventKind::TargetStarted {
                    target_name: "Build".to_string(),
                    project_file: String::new(),
                },
                Some(target),
                at(2),
            ),
            Event::new(
                EventKind::TaskStarted {
                    task_name: "MSBuild".to_string(),
                    project_file: String::new(),
                },
                Some(task),
                at(3),
            ),
            project_started(inner, r"C:\src\app\lib\lib.vcxproj", Some(task), 4),
            Event::new(
                EventKind::TargetStarted {
                    target_name: "ClCompile".to_string(),
                    project_file: String::new(),
                },
                Some(inner_target),
                at(5),
            ),
            Event::new(
                EventKind::TargetFinished {
                    target_name: "ClCompile".to_string(),
                    project_file: String::new(),
                    succeeded: true,
                },
                Some(inner_target),
                at(6),
            ),
            project_finished(inner, 7),
            Event::message(Some(task), at(7), "first\nsecond"),
            Event::new(
                EventKind::TaskFinished {
                    task_name: "MSBuild".to_string(),
                    succeeded: true,
                },
                Some(task),
                at(8),
            ),
            Event::new(
                EventKind::TargetFinished {
                    target_name: "Build".to_string(),
                    project_file: String::new(),
                    succeeded: true,
                },
                Some(target),
                at(9),
            ),
            project_finished(outer, 10),
            Event::new(EventKind::BuildFinished { succeeded: true }, None, at(11)),
        ];

        let tree = build_entry_tree(events).unwrap();
        let timeline = project(&tree, &metadata());

        // Build on node 0, outer project on node 1, inner project on node 2
        assert_eq!(timeline.roots_on(NodeId(0)).len(), 1);
        assert_eq!(timeline.roots_on(NodeId(1)).len(), 1);
        assert_eq!(timeline.roots_on(NodeId(2)).len(), 1);

        let build = timeline.entry(timeline.roots_on(NodeId(0))[0]);
        assert_eq!(build.name, "Build Build");
        assert_eq!(build.kind, EntryKind::Build);
        assert!(build.children.is_empty());

        let outer_root = timeline.entry(timeline.roots_on(NodeId(1))[0]);
        assert_eq!(outer_root.name, "app.vcxproj");
        assert_eq!(outer_root.parent, None);
        assert_eq!(outer_root.start, at(1));
        assert_eq!(outer_root.end, at(10));

        let inner_root = timeline.entry(timeline.roots_on(NodeId(2))[0]);
        assert_eq!(inner_root.name, r"lib\lib.vcxproj");
        assert_eq!(timeline.entry(inner_root.children[0]).name, "ClCompile");

        let (_, msbuild) = timeline
            .iter()
            .find(|(_, e)| e.kind == EntryKind::Task)
            .unwrap();
        assert_eq!(msbuild.name, "MSBuild");
        let texts: Vec<&str> = msbuild.messages.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second"]);
    }
}
