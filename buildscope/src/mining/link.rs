//! Linker pass timings.
//!
//! With timing enabled the linker reports its two passes, each preceded by
//! the sub-steps that ran inside it:
//!
//! ```text
//!   OptRef: Total time = 0.016s        ─┐ sub-steps of pass 1
//!   OptIcf: Total time = 0.047s        ─┘
//! Pass 1: Interval #1, time = 0.250s
//!   Wait PDB close: Total time = 0.031s
//! Pass 2: Interval #2, time = 0.078s
//! Final: Total time = 0.328s           ignored
//! ```
//!
//! Pass 1 starts at the task start and pass 2 where pass 1 ends. Sub-steps
//! are laid out back to back from the start of their pass.

use log::trace;

use super::patterns::{self, TimedStep};
use super::{end_after, is_task_named, DiagnosticMiner};
use crate::domain::{EntryId, MiningError, Timestamp};
use crate::timeline::{Timeline, TimelineEntry};

#[derive(Debug, Clone, Copy, Default)]
pub struct LinkMiner;

impl DiagnosticMiner for LinkMiner {
    fn name(&self) -> &'static str {
        "link"
    }

    fn applies(&self, task: &TimelineEntry) -> bool {
        is_task_named(task, "Link")
            && task
                .messages
                .iter()
                .any(|line| matches!(patterns::link_pass_line(&line.text), Ok(Some(_))))
    }

    fn mine(&self, timeline: &mut Timeline, task: EntryId) -> Result<usize, MiningError> {
        let lines = timeline.entry(task).messages.clone();
        let mut phase_start = timeline.entry(task).start;
        let mut last_pass = 0u8;
        let mut pending: Vec<TimedStep> = Vec::new();
        let mut created = 0;

        for line in &lines {
            if let Some((pass, elapsed)) = patterns::link_pass_line(&line.text)? {
                if pass <= last_pass {
                    trace!("Repeated link pass marker: {}", line.text);
                    continue;
                }
                if pass == 2 && last_pass == 0 {
                    return Err(MiningError::MissingPhase {
                        phase: "Pass 1".to_string(),
                    });
                }

                let phase_end = end_after(phase_start, elapsed, &line.text)?;
                let phase =
                    timeline.add_synthetic(task, format!("Pass {pass}"), phase_start, phase_end);
                created += 1 + add_steps(timeline, phase, phase_start, &pending)?;
                pending.clear();

                phase_start = phase_end;
                last_pass = pass;
                if pass == 2 {
                    break;
                }
            } else if let Some(step) = patterns::timed_step_line(&line.text)? {
                pending.push(step);
            }
        }

        if !pending.is_empty() {
            trace!("{} link sub-steps without a pass marker", pending.len());
        }
        Ok(created)
    }
}

/// Lay `steps` out one after another from `start` under `phase`
fn add_steps(
    timeline: &mut Timeline,
    phase: EntryId,
    start: Timestamp,
    steps: &[TimedStep],
) -> Result<usize, MiningError> {
    let mut cursor = start;
    for step in steps {
        let end = end_after(cursor, step.elapsed, &step.name)?;
        timeline.add_synthetic(phase, step.name.as_str(), cursor, end);
        cursor = end;
    }
    Ok(steps.len())
}
