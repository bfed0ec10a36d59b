//! Structured error types for buildscope
//!
//! Using thiserror for automatic Display implementation and error chaining.

use thiserror::Error;

/// Protocol violation in the input event stream.
///
/// Always fatal for the whole session: no partial trace is produced.
/// Every variant names the offending event.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TraceError {
    #[error("malformed build log: event stream is empty")]
    EmptyStream,

    #[error("malformed build log: {event} opened a second top-level build")]
    DuplicateBuild { event: String },

    #[error("malformed build log: {event} arrived outside an open build")]
    NoOpenBuild { event: String },

    #[error("malformed build log: {event} carries no context")]
    MissingContext { event: String },

    #[error("malformed build log: {event} has no open {expected} to attach to")]
    MissingParent { event: String, expected: &'static str },

    #[error("malformed build log: {event} has no matching open entry")]
    UnmatchedFinish { event: String },

    #[error("malformed build log: {event} finishes before its start at {started}")]
    FinishedBeforeStart { event: String, started: String },

    #[error("malformed build log: {count} entries never finished, first opened by {event}")]
    UnclosedEntries { count: usize, event: String },
}

/// Failure of one diagnostic miner on one task entry.
///
/// Mining is best-effort: the pipeline discards the miner's contribution
/// for that task and keeps the coarse task timing.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum MiningError {
    #[error("invalid elapsed time {text:?} in line {line:?}")]
    InvalidElapsed { text: String, line: String },

    #[error("elapsed time in line {line:?} runs past the representable range")]
    ElapsedOutOfRange { line: String },

    #[error("{phase} finished but was never recorded")]
    MissingPhase { phase: String },
}

#[derive(Error, Debug)]
pub enum EventLogError {
    #[error("Failed to read event log: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse event log: {0}")]
    Json(#[from] serde_json::Error),
}
