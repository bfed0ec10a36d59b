//! # Entry Tree Construction
//!
//! Consumes the ordered event stream and reconstructs the bracketed tree of
//! build → project → target → task entries, with free-text messages
//! attached at whatever level was open when they arrived.
//!
//! ## Event Routing
//!
//! - `*Started` → new [`Entry`], pushed onto the matching open set
//! - `*Finished` → closes the open entry with the exact same context; the
//!   finish event itself is attached to the entry's parent
//! - `Message` / `Warning` / `Error` → innermost open entry whose context
//!   is a prefix match
//!
//! ## Parent Resolution for Projects
//!
//! A project build may be requested by a task that has already finished
//! (the child project was scheduled on another node). Parentage therefore
//! degrades step by step:
//!
//! ```text
//! open task  (ContextId, ProjectId) of ParentEventContext
//!   └─▶ open project with the same (ContextId, ProjectId)
//!         └─▶ build root
//! ```
//!
//! Any other lookup that comes back empty is a protocol violation and
//! aborts construction with a [`TraceError`].

use buildscope_common::{Event, EventContext, EventKind};
use log::{debug, trace};

use crate::domain::{EntryId, TraceError};

/// Node of the intermediate build tree.
///
/// Owns its start event and, once closed, its end event. Child entries and
/// child events are kept in arrival order.
#[derive(Debug, Clone)]
pub struct Entry {
    pub start: Event,
    pub end: Option<Event>,
    pub parent: Option<EntryId>,
    pub children: Vec<EntryId>,
    /// Messages (and finish markers of child entries) that did not open an
    /// entry of their own
    pub events: Vec<Event>,
}

impl Entry {
    fn new(start: Event, parent: Option<EntryId>) -> Self {
        Self {
            start,
            end: None,
            parent,
            children: Vec::new(),
            events: Vec::new(),
        }
    }

    #[must_use]
    pub fn context(&self) -> Option<&EventContext> {
        self.start.context.as_ref()
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.end.is_none()
    }
}

/// Finished tree: every entry closed, rooted at the single build entry.
#[derive(Debug)]
pub struct EntryTree {
    entries: Vec<Entry>,
    root: EntryId,
}

impl EntryTree {
    #[must_use]
    pub fn root(&self) -> EntryId {
        self.root
    }

    #[must_use]
    pub fn get(&self, id: EntryId) -> &Entry {
        &self.entries[id.index()]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Which open set an entry lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    Build,
    Project,
    Target,
    Task,
}

impl Level {
    fn label(self) -> &'static str {
        match self {
            Level::Build => "build",
            Level::Project => "project",
            Level::Target => "target",
            Level::Task => "task",
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Route {
    Start(Level),
    Finish(Level),
    Message,
}

/// Incremental tree builder; feed events in order, then [`finish`](Self::finish).
#[derive(Debug, Default)]
pub struct EntryTreeBuilder {
    entries: Vec<Entry>,
    root: Option<EntryId>,
    open_builds: Vec<EntryId>,
    open_projects: Vec<EntryId>,
    open_targets: Vec<EntryId>,
    open_tasks: Vec<EntryId>,
}

/// Build the entry tree for a complete event stream.
///
/// # Errors
/// Returns a [`TraceError`] if the stream violates the nesting protocol.
pub fn build_entry_tree<I>(events: I) -> Result<EntryTree, TraceError>
where
    I: IntoIterator<Item = Event>,
{
    let mut builder = EntryTreeBuilder::new();
    for event in events {
        builder.push(event)?;
    }
    builder.finish()
}

impl EntryTreeBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Route a single event into the tree.
    ///
    /// # Errors
    /// Returns a [`TraceError`] naming `event` if it cannot be placed.
    pub fn push(&mut self, event: Event) -> Result<(), TraceError> {
        let route = match &event.kind {
            EventKind::BuildStarted => Route::Start(Level::Build),
            EventKind::ProjectStarted { .. } => Route::Start(Level::Project),
            EventKind::TargetStarted { .. } => Route::Start(Level::Target),
            EventKind::TaskStarted { .. } => Route::Start(Level::Task),
            EventKind::BuildFinished { .. } => Route::Finish(Level::Build),
            EventKind::ProjectFinished { .. } => Route::Finish(Level::Project),
            EventKind::TargetFinished { .. } => Route::Finish(Level::Target),
            EventKind::TaskFinished { .. } => Route::Finish(Level::Task),
            EventKind::Message(_) | EventKind::Warning(_) | EventKind::Error(_) => Route::Message,
        };

        match route {
            Route::Start(Level::Build) => self.start_build(event),
            Route::Start(Level::Project) => self.start_project(event),
            Route::Start(Level::Target) => self.start_target(event),
            Route::Start(Level::Task) => self.start_task(event),
            Route::Finish(level) => self.finish_entry(event, level),
            Route::Message => self.attach_message(event),
        }
    }

    /// Close construction and hand out the tree.
    ///
    /// # Errors
    /// Fails if no build was ever started or any entry is still open.
    pub fn finish(self) -> Result<EntryTree, TraceError> {
        let Some(root) = self.root else {
            return Err(TraceError::EmptyStream);
        };

        let still_open = self
            .open_builds
            .iter()
            .chain(&self.open_projects)
            .chain(&self.open_targets)
            .chain(&self.open_tasks)
            .copied()
            .min();
        if let Some(first) = still_open {
            let count = self.open_builds.len()
                + self.open_projects.len()
                + self.open_targets.len()
                + self.open_tasks.len();
            return Err(TraceError::UnclosedEntries {
                count,
                event: self.entries[first.index()].start.to_string(),
            });
        }

        debug!("Built entry tree with {} entries", self.entries.len());
        Ok(EntryTree {
            entries: self.entries,
            root,
        })
    }

    // Start events

    fn start_build(&mut self, event: Event) -> Result<(), TraceError> {
        if self.root.is_some() {
            return Err(TraceError::DuplicateBuild {
                event: event.to_string(),
            });
        }
        let id = self.insert(event, None);
        self.root = Some(id);
        self.open_builds.push(id);
        Ok(())
    }

    fn start_project(&mut self, event: Event) -> Result<(), TraceError> {
        let root = self.open_root(&event)?;
        Self::require_context(&event)?;

        let requested_by = match &event.kind {
            EventKind::ProjectStarted { parent_context, .. } => *parent_context,
            _ => None,
        };
        let parent = match requested_by {
            None => root,
            Some(requester) => {
                if let Some(task) = self.find_open(Level::Task, |c| c.same_project(&requester)) {
                    task
                } else if let Some(project) =
                    self.find_open(Level::Project, |c| c.same_project(&requester))
                {
                    debug!("Requesting task of {event} already closed, attaching to its project");
                    project
                } else {
                    debug!("No open requester for {event}, attaching to build root");
                    root
                }
            }
        };

        let id = self.insert(event, Some(parent));
        self.open_projects.push(id);
        Ok(())
    }

    fn start_target(&mut self, event: Event) -> Result<(), TraceError> {
        self.open_root(&event)?;
        let context = Self::require_context(&event)?;
        let parent = self
            .find_open(Level::Project, |c| c.same_project(&context))
            .ok_or_else(|| TraceError::MissingParent {
                event: event.to_string(),
                expected: Level::Project.label(),
            })?;

        let id = self.insert(event, Some(parent));
        self.open_targets.push(id);
        Ok(())
    }

    fn start_task(&mut self, event: Event) -> Result<(), TraceError> {
        self.open_root(&event)?;
        let context = Self::require_context(&event)?;
        let parent = self
            .find_open(Level::Target, |c| c.same_target(&context))
            .ok_or_else(|| TraceError::MissingParent {
                event: event.to_string(),
                expected: Level::Target.label(),
            })?;

        let id = self.insert(event, Some(parent));
        self.open_tasks.push(id);
        Ok(())
    }

    // Finish events

    fn finish_entry(&mut self, event: Event, level: Level) -> Result<(), TraceError> {
        if level != Level::Build {
            self.open_root(&event)?;
        }
        let position = self
            .open_set(level)
            .iter()
            .rposition(|id| self.entries[id.index()].start.context == event.context)
            .ok_or_else(|| TraceError::UnmatchedFinish {
                event: event.to_string(),
            })?;
        let id = self.open_set_mut(level).remove(position);

        let entry = &mut self.entries[id.index()];
        if event.timestamp < entry.start.timestamp {
            return Err(TraceError::FinishedBeforeStart {
                event: event.to_string(),
                started: entry.start.timestamp.to_string(),
            });
        }
        entry.end = Some(event.clone());

        // Finish markers sit alongside the other messages of the enclosing level
        let holder = entry.parent.unwrap_or(id);
        self.entries[holder.index()].events.push(event);
        Ok(())
    }

    // Messages

    fn attach_message(&mut self, event: Event) -> Result<(), TraceError> {
        let root = self.open_root(&event)?;

        let holder = match event.context {
            None => root,
            Some(context) => {
                let task = context
                    .task_id
                    .and_then(|_| self.find_open(Level::Task, |c| c.same_task(&context)));
                let target = || {
                    context
                        .target_id
                        .and_then(|_| self.find_open(Level::Target, |c| c.same_target(&context)))
                };
                task.or_else(target)
                    .or_else(|| self.find_open(Level::Project, |c| c.same_project(&context)))
                    .unwrap_or(root)
            }
        };

        trace!("Attaching {event} to entry {holder}");
        self.entries[holder.index()].events.push(event);
        Ok(())
    }

    // Helpers

    fn insert(&mut self, event: Event, parent: Option<EntryId>) -> EntryId {
        let id = EntryId(self.entries.len());
        self.entries.push(Entry::new(event, parent));
        if let Some(parent) = parent {
            self.entries[parent.index()].children.push(id);
        }
        id
    }

    /// The single open build, or a protocol violation naming `event`
    fn open_root(&self, event: &Event) -> Result<EntryId, TraceError> {
        self.open_builds
            .last()
            .copied()
            .ok_or_else(|| TraceError::NoOpenBuild {
                event: event.to_string(),
            })
    }

    fn require_context(event: &Event) -> Result<EventContext, TraceError> {
        event.context.ok_or_else(|| TraceError::MissingContext {
            event: event.to_string(),
        })
    }

    /// Most recently opened entry at `level` whose context satisfies `matches`
    fn find_open(&self, level: Level, matches: impl Fn(&EventContext) -> bool) -> Option<EntryId> {
        self.open_set(level)
            .iter()
            .rev()
            .copied()
            .find(|id| self.entries[id.index()].context().is_some_and(&matches))
    }

    fn open_set(&self, level: Level) -> &Vec<EntryId> {
        match level {
            Level::Build => &self.open_builds,
            Level::Project => &self.open_projects,
            Level::Target => &self.open_targets,
            Level::Task => &self.open_tasks,
        }
    }

    fn open_set_mut(&mut self, level: Level) -> &mut Vec<EntryId> {
        match level {
            Level::Build => &mut self.open_builds,
            Level::Project => &mut self.open_projects,
            Level::Target => &mut self.open_targets,
            Level::Task => &mut self.open_tasks,
        }
    }
}
