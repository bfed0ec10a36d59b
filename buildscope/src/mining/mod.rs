//! Diagnostic miners
//!
//! Compiler and linker output carries timings the event stream never
//! exposes. A miner looks at the diagnostic lines of one task entry and
//! synthesizes nested entries for the sub-phases it recognizes.
//!
//! # Dispatch
//!
//! Miners are registered once in a [`MinerRegistry`], an open dispatch
//! table keyed by each miner's own precondition ([`DiagnosticMiner::applies`]).
//! Every task entry is offered to every miner in registration order:
//!
//! | Miner                    | Task   | Precondition                      |
//! |--------------------------|--------|-----------------------------------|
//! | compile (sequential)     | `CL`   | `Generating Code...` present      |
//! | compile (concurrent)     | `CL`   | `Generating Code...` absent       |
//! | report time              | `CL`   | a report-time section header      |
//! | link                     | `Link` | a `Pass n:` marker                |
//!
//! # Failure
//!
//! Mining is best-effort. Lines that match no pattern are skipped. A
//! [`MiningError`] (e.g. unparsable elapsed seconds) discards everything
//! that miner synthesized for that task; the task keeps its coarse timing.

pub mod compile;
pub mod link;
pub mod patterns;
pub mod report_time;

use log::{debug, warn};

pub use compile::{CompileMiner, CompileMode};
pub use link::LinkMiner;
pub use report_time::ReportTimeMiner;

use crate::domain::{Duration, EntryId, MiningError, Timestamp};
use crate::timeline::{EntryKind, Timeline, TimelineEntry};

/// A line-oriented parser over the diagnostic text of task entries
pub trait DiagnosticMiner {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Whether this miner understands `task`'s output
    fn applies(&self, task: &TimelineEntry) -> bool;

    /// Append synthesized children under `task`.
    ///
    /// Returns the number of entries created.
    ///
    /// # Errors
    ///
    /// Returns a [`MiningError`] when the output cannot be interpreted;
    /// whatever was added before the error is rolled back by the caller.
    fn mine(&self, timeline: &mut Timeline, task: EntryId) -> Result<usize, MiningError>;
}

/// Totals of one mining pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MiningStats {
    /// Tasks at least one miner contributed to
    pub tasks: usize,
    /// Entries synthesized
    pub entries: usize,
    /// Miner runs rolled back
    pub failures: usize,
}

pub struct MinerRegistry {
    miners: Vec<Box<dyn DiagnosticMiner>>,
}

impl MinerRegistry {
    /// No miners: the trace keeps task-level granularity
    #[must_use]
    pub fn empty() -> Self {
        Self { miners: Vec::new() }
    }

    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register(CompileMiner::new(CompileMode::Sequential));
        registry.register(CompileMiner::new(CompileMode::Concurrent));
        registry.register(ReportTimeMiner);
        registry.register(LinkMiner);
        registry
    }

    pub fn register(&mut self, miner: impl DiagnosticMiner + 'static) {
        self.miners.push(Box::new(miner));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.miners.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.miners.is_empty()
    }

    /// Names of the registered miners, in dispatch order
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.miners.iter().map(|miner| miner.name())
    }

    /// Run every applicable miner on every task entry of `timeline`
    pub fn mine_all(&self, timeline: &mut Timeline) -> MiningStats {
        let mut stats = MiningStats::default();
        if self.miners.is_empty() {
            return stats;
        }

        let tasks: Vec<EntryId> = timeline
            .iter()
            .filter(|(_, entry)| entry.kind == EntryKind::Task)
            .map(|(id, _)| id)
            .collect();

        for task in tasks {
            let mut contributed = false;
            for miner in &self.miners {
                if !miner.applies(timeline.entry(task)) {
                    continue;
                }
                let checkpoint = timeline.checkpoint();
                match miner.mine(timeline, task) {
                    Ok(created) => {
                        debug!(
                            "{} miner added {created} entries under {:?}",
                            miner.name(),
                            timeline.entry(task).name
                        );
                        stats.entries += created;
                        contributed |= created > 0;
                    }
                    Err(e) => {
                        timeline.rollback(task, checkpoint);
                        warn!(
                            "{} miner failed on {:?} ({}): {e}",
                            miner.name(),
                            timeline.entry(task).name,
                            timeline.entry(task).node_id
                        );
                        stats.failures += 1;
                    }
                }
            }
            if contributed {
                stats.tasks += 1;
            }
        }
        stats
    }
}

impl Default for MinerRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl std::fmt::Debug for MinerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// Task entry whose task name is `name`, ignoring ASCII case
pub(crate) fn is_task_named(task: &TimelineEntry, name: &str) -> bool {
    task.kind == EntryKind::Task && task.name.eq_ignore_ascii_case(name)
}

/// `start + elapsed`, failing the miner on overflow
pub(crate) fn end_after(
    start: Timestamp,
    elapsed: Duration,
    line: &str,
) -> Result<Timestamp, MiningError> {
    start
        .checked_add(elapsed)
        .ok_or_else(|| MiningError::ElapsedOutOfRange {
            line: line.to_string(),
        })
}

/// `end - elapsed`, failing the miner on overflow
pub(crate) fn start_before(
    end: Timestamp,
    elapsed: Duration,
    line: &str,
) -> Result<Timestamp, MiningError> {
    end.checked_sub(elapsed)
        .ok_or_else(|| MiningError::ElapsedOutOfRange {
            line: line.to_string(),
        })
}
