//! Per-file compile phases from compiler timing output.
//!
//! With stage timing enabled the compiler prints, per source file, the file
//! name when it starts, then one `time(...)` line per compiler stage when
//! that stage is done with the file:
//!
//! ```text
//! CL task
//! ├── a.cpp            per-file node, opened by the bare file name line
//! │   ├── c1xx.dll     front-end:  [finish - elapsed, finish)
//! │   └── c2.dll       back-end
//! └── b.cpp
//!     └── ...
//! ```
//!
//! Two modes, told apart by the `Generating Code...` line the compiler
//! prints once every front-end is done:
//!
//! - [`CompileMode::Sequential`] (line present): back-ends run strictly one
//!   after another, so each back-end starts where the previous one ended.
//! - [`CompileMode::Concurrent`] (line absent): files compile in parallel
//!   processes; a back-end can only be placed after its own front-end.

use log::trace;

use super::patterns::{self, Stage, StageTime};
use super::{end_after, is_task_named, start_before, DiagnosticMiner};
use crate::domain::{EntryId, MiningError, Timestamp};
use crate::timeline::{Timeline, TimelineEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileMode {
    Sequential,
    Concurrent,
}

#[derive(Debug, Clone, Copy)]
pub struct CompileMiner {
    mode: CompileMode,
}

impl CompileMiner {
    #[must_use]
    pub fn new(mode: CompileMode) -> Self {
        Self { mode }
    }

    #[must_use]
    pub fn mode(&self) -> CompileMode {
        self.mode
    }
}

/// A per-file node synthesized so far
#[derive(Debug)]
struct FileNode {
    name: String,
    id: EntryId,
    front_end: Option<EntryId>,
}

#[derive(Debug)]
struct CompileState {
    task: EntryId,
    files: Vec<FileNode>,
    /// End of the previous back-end, once the front-ends are all done
    back_end_cursor: Option<Timestamp>,
    created: usize,
}

impl CompileState {
    fn new(task: EntryId) -> Self {
        Self {
            task,
            files: Vec::new(),
            back_end_cursor: None,
            created: 0,
        }
    }

    fn open_file(&mut self, timeline: &mut Timeline, name: &str, at: Timestamp) {
        let start = at.max(timeline.entry(self.task).start);
        let id = timeline.add_synthetic(self.task, name, start, start);
        self.files.push(FileNode {
            name: name.to_string(),
            id,
            front_end: None,
        });
        self.created += 1;
    }

    /// Most recent per-file node for `file`, compared by base name
    fn find_file(&self, file: &str) -> Option<usize> {
        let wanted = patterns::base_name(file);
        self.files
            .iter()
            .rposition(|node| patterns::base_name(&node.name).eq_ignore_ascii_case(wanted))
    }

    fn front_ends_done(&mut self, timeline: &Timeline, at: Timestamp) {
        let last_front_end = self
            .files
            .iter()
            .filter_map(|node| node.front_end)
            .map(|id| timeline.entry(id).end)
            .max();
        self.back_end_cursor = Some(last_front_end.unwrap_or(at));
    }

    fn record_stage(
        &mut self,
        timeline: &mut Timeline,
        mode: CompileMode,
        time: &StageTime,
        at: Timestamp,
        line: &str,
    ) -> Result<(), MiningError> {
        let Some(index) = self.find_file(&time.file) else {
            trace!("No per-file node for {}, skipping", time.file);
            return Ok(());
        };
        let file = &self.files[index];
        let file_start = timeline.entry(file.id).start;

        let (start, end) = match time.stage {
            Stage::FrontEnd => {
                let start = start_before(at, time.elapsed, line)?.max(file_start).min(at);
                (start, at)
            }
            Stage::BackEnd => match (mode, self.back_end_cursor) {
                (CompileMode::Sequential, Some(cursor)) => {
                    let start = cursor.max(file_start);
                    (start, end_after(start, time.elapsed, line)?)
                }
                _ => {
                    let earliest = file
                        .front_end
                        .map_or(file_start, |id| timeline.entry(id).end);
                    let start = start_before(at, time.elapsed, line)?.max(earliest).min(at);
                    (start, at)
                }
            },
        };

        let file_id = file.id;
        let id = timeline.add_synthetic(file_id, time.stage_name.as_str(), start, end);
        timeline.extend_end(file_id, end);
        self.created += 1;

        match time.stage {
            Stage::FrontEnd => self.files[index].front_end = Some(id),
            Stage::BackEnd => {
                if self.back_end_cursor.is_some() {
                    self.back_end_cursor = Some(end);
                }
            }
        }
        Ok(())
    }
}

impl DiagnosticMiner for CompileMiner {
    fn name(&self) -> &'static str {
        match self.mode {
            CompileMode::Sequential => "compile (sequential)",
            CompileMode::Concurrent => "compile (concurrent)",
        }
    }

    fn applies(&self, task: &TimelineEntry) -> bool {
        if !is_task_named(task, "CL") {
            return false;
        }
        let sentinel = task
            .messages
            .iter()
            .any(|line| patterns::is_front_ends_done(&line.text));
        match self.mode {
            CompileMode::Sequential => sentinel,
            CompileMode::Concurrent => !sentinel,
        }
    }

    fn mine(&self, timeline: &mut Timeline, task: EntryId) -> Result<usize, MiningError> {
        let lines = timeline.entry(task).messages.clone();
        let mut state = CompileState::new(task);

        for line in &lines {
            if let Some(file) = patterns::source_file_name(&line.text) {
                state.open_file(timeline, file, line.timestamp);
            } else if patterns::is_front_ends_done(&line.text) {
                state.front_ends_done(timeline, line.timestamp);
            } else if let Some(time) = patterns::stage_time_line(&line.text)? {
                state.record_stage(timeline, self.mode, &time, line.timestamp, &line.text)?;
            }
        }

        Ok(state.created)
    }
}
