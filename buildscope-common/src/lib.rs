//! # Build Event Model (Adapter ↔ Core)
//!
//! Defines the typed lifecycle events a build produces and the context
//! identifiers that address a point in the build's logical nesting. An
//! adapter converts a build tool's native events into these types; the
//! `buildscope` core consumes them to reconstruct the execution trace.
//!
//! ## Key Types
//!
//! - [`Event`] - One immutable record of the event stream
//! - [`EventKind`] - Which lifecycle point (or free-text message) it is
//! - [`EventContext`] - Node / project / target / task address of an event
//! - [`Timestamp`], [`Duration`] - Fixed-point time in 100ns ticks
//!
//! With the `serde` feature enabled every type derives `Serialize` and
//! `Deserialize`, so recorded event logs can be replayed.

use std::fmt;
use std::ops::{Add, Sub};

// ============================================================================
// Time
// ============================================================================

/// Number of ticks in one second. One tick is 100 nanoseconds.
pub const TICKS_PER_SECOND: i64 = 10_000_000;

/// Number of fractional-second digits representable in ticks.
const TICK_DIGITS: usize = 7;

/// Absolute point in time, in 100ns ticks.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// Timestamp from whole seconds (handy for tests and fixtures)
    #[must_use]
    pub fn from_secs(secs: i64) -> Self {
        Self(secs * TICKS_PER_SECOND)
    }

    /// Timestamp from milliseconds
    #[must_use]
    pub fn from_millis(millis: i64) -> Self {
        Self(millis * (TICKS_PER_SECOND / 1_000))
    }

    /// Ticks as fractional seconds
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn as_seconds(self) -> f64 {
        self.0 as f64 / TICKS_PER_SECOND as f64
    }

    /// Ticks as microseconds (truncating)
    #[must_use]
    pub fn as_micros(self) -> i64 {
        self.0 / 10
    }

    /// `self + span`, or `None` if the result leaves the tick range
    #[must_use]
    pub fn checked_add(self, span: Duration) -> Option<Self> {
        self.0.checked_add(span.0).map(Self)
    }

    /// `self - span`, or `None` if the result leaves the tick range
    #[must_use]
    pub fn checked_sub(self, span: Duration) -> Option<Self> {
        self.0.checked_sub(span.0).map(Self)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}s", self.as_seconds())
    }
}

/// Time span, in 100ns ticks.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Duration(pub i64);

impl Duration {
    pub const ZERO: Duration = Duration(0);

    #[must_use]
    pub fn from_secs(secs: i64) -> Self {
        Self(secs * TICKS_PER_SECOND)
    }

    #[must_use]
    pub fn from_millis(millis: i64) -> Self {
        Self(millis * (TICKS_PER_SECOND / 1_000))
    }

    /// Parse a decimal seconds value such as `"1.25"` or `"0.0000153"`.
    ///
    /// The conversion is exact: integer and fractional digits are scaled
    /// separately, and fractional digits beyond tick resolution are
    /// truncated. Returns `None` for anything that is not a plain
    /// non-negative decimal number.
    #[must_use]
    pub fn parse_seconds(text: &str) -> Option<Self> {
        let text = text.trim();
        let (whole, frac) = match text.split_once('.') {
            Some((whole, frac)) => (whole, frac),
            None => (text, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return None;
        }
        if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit())
        {
            return None;
        }

        let whole_ticks = if whole.is_empty() {
            0
        } else {
            whole.parse::<i64>().ok()?.checked_mul(TICKS_PER_SECOND)?
        };

        let mut frac_ticks = 0i64;
        let mut scale = TICKS_PER_SECOND / 10;
        for digit in frac.bytes().take(TICK_DIGITS) {
            frac_ticks += i64::from(digit - b'0') * scale;
            scale /= 10;
        }

        whole_ticks.checked_add(frac_ticks).map(Self)
    }

    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn as_seconds(self) -> f64 {
        self.0 as f64 / TICKS_PER_SECOND as f64
    }

    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn as_millis(self) -> f64 {
        self.0 as f64 / (TICKS_PER_SECOND / 1_000) as f64
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ms = self.as_millis();
        if ms >= 1000.0 {
            write!(f, "{:.2}s", self.as_seconds())
        } else {
            write!(f, "{ms:.2}ms")
        }
    }
}

impl Add<Duration> for Timestamp {
    type Output = Timestamp;

    fn add(self, rhs: Duration) -> Timestamp {
        Timestamp(self.0 + rhs.0)
    }
}

impl Sub<Duration> for Timestamp {
    type Output = Timestamp;

    fn sub(self, rhs: Duration) -> Timestamp {
        Timestamp(self.0 - rhs.0)
    }
}

impl Sub for Timestamp {
    type Output = Duration;

    fn sub(self, rhs: Timestamp) -> Duration {
        Duration(self.0 - rhs.0)
    }
}

// ============================================================================
// Context identifiers
// ============================================================================

/// Independent execution stream (e.g. a parallel build worker process).
///
/// Node 0 is reserved for the top-level build itself.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Node of the top-level build entry
    pub const BUILD: NodeId = NodeId(0);

    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node#{}", self.0)
    }
}

/// Distinguishes concurrently-open instances of the same project.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(pub i32);

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProjectId(pub i32);

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetId(pub i32);

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(pub i32);

/// How deep into the project/target/task nesting a context reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ContextScope {
    Project,
    Target,
    Task,
}

/// Logical location of an event.
///
/// Two contexts are equal iff all populated fields match; an unpopulated
/// target or task id never equals a populated one.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventContext {
    pub node_id: NodeId,
    pub context_id: ContextId,
    pub project_id: ProjectId,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub target_id: Option<TargetId>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub task_id: Option<TaskId>,
}

impl EventContext {
    /// Context of a project instance
    #[must_use]
    pub fn project(node_id: u32, context_id: i32, project_id: i32) -> Self {
        Self {
            node_id: NodeId(node_id),
            context_id: ContextId(context_id),
            project_id: ProjectId(project_id),
            target_id: None,
            task_id: None,
        }
    }

    /// Narrow this context to a target
    #[must_use]
    pub fn with_target(mut self, target_id: i32) -> Self {
        self.target_id = Some(TargetId(target_id));
        self
    }

    /// Narrow this context to a task
    #[must_use]
    pub fn with_task(mut self, task_id: i32) -> Self {
        self.task_id = Some(TaskId(task_id));
        self
    }

    #[must_use]
    pub fn scope(&self) -> ContextScope {
        match (self.target_id, self.task_id) {
            (_, Some(_)) => ContextScope::Task,
            (Some(_), None) => ContextScope::Target,
            (None, None) => ContextScope::Project,
        }
    }

    /// Same project instance: `(ContextId, ProjectId)` match
    #[must_use]
    pub fn same_project(&self, other: &EventContext) -> bool {
        self.context_id == other.context_id && self.project_id == other.project_id
    }

    /// Same target within the same project instance
    #[must_use]
    pub fn same_target(&self, other: &EventContext) -> bool {
        self.same_project(other) && self.target_id.is_some() && self.target_id == other.target_id
    }

    /// Same task within the same target
    #[must_use]
    pub fn same_task(&self, other: &EventContext) -> bool {
        self.same_target(other) && self.task_id.is_some() && self.task_id == other.task_id
    }
}

impl fmt::Display for EventContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ctx={} project={}",
            self.node_id, self.context_id.0, self.project_id.0
        )?;
        if let Some(target) = self.target_id {
            write!(f, " target={}", target.0)?;
        }
        if let Some(task) = self.task_id {
            write!(f, " task={}", task.0)?;
        }
        Ok(())
    }
}

// ============================================================================
// Events
// ============================================================================

/// Source location attached to free-text messages, warnings and errors.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SourceLocation {
    pub code: Option<String>,
    pub file: Option<String>,
    pub line: u32,
    pub column: u32,
}

/// Variant-specific payload of an [`Event`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type"))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    BuildStarted,
    BuildFinished {
        succeeded: bool,
    },
    ProjectStarted {
        project_file: String,
        /// Context of the task that requested this project build, if any.
        /// May reference an entry that has already closed.
        #[cfg_attr(feature = "serde", serde(default))]
        parent_context: Option<EventContext>,
    },
    ProjectFinished {
        project_file: String,
        succeeded: bool,
    },
    TargetStarted {
        target_name: String,
        project_file: String,
    },
    TargetFinished {
        target_name: String,
        project_file: String,
        succeeded: bool,
    },
    TaskStarted {
        task_name: String,
        project_file: String,
    },
    TaskFinished {
        task_name: String,
        succeeded: bool,
    },
    Message(SourceLocation),
    Warning(SourceLocation),
    Error(SourceLocation),
}

impl EventKind {
    /// Short variant name for diagnostics
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::BuildStarted => "BuildStarted",
            EventKind::BuildFinished { .. } => "BuildFinished",
            EventKind::ProjectStarted { .. } => "ProjectStarted",
            EventKind::ProjectFinished { .. } => "ProjectFinished",
            EventKind::TargetStarted { .. } => "TargetStarted",
            EventKind::TargetFinished { .. } => "TargetFinished",
            EventKind::TaskStarted { .. } => "TaskStarted",
            EventKind::TaskFinished { .. } => "TaskFinished",
            EventKind::Message(_) => "Message",
            EventKind::Warning(_) => "Warning",
            EventKind::Error(_) => "Error",
        }
    }
}

/// One immutable record of the build's event stream.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub context: Option<EventContext>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub message: String,
    pub timestamp: Timestamp,
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub kind: EventKind,
}

impl Event {
    #[must_use]
    pub fn new(kind: EventKind, context: Option<EventContext>, timestamp: Timestamp) -> Self {
        Self {
            context,
            message: String::new(),
            timestamp,
            kind,
        }
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Free-text message at `context`
    #[must_use]
    pub fn message(context: Option<EventContext>, timestamp: Timestamp, text: &str) -> Self {
        Self::new(EventKind::Message(SourceLocation::default()), context, timestamp)
            .with_message(text)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.kind.name(), self.timestamp)?;
        match &self.context {
            Some(context) => write!(f, " ({context})"),
            None => write!(f, " (no context)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_seconds_exact() {
        assert_eq!(Duration::parse_seconds("1.0"), Some(Duration(10_000_000)));
        assert_eq!(Duration::parse_seconds("0.0000001"), Some(Duration(1)));
        assert_eq!(Duration::parse_seconds("2"), Some(Duration::from_secs(2)));
        assert_eq!(Duration::parse_seconds(".5"), Some(Duration(5_000_000)));
    }

    #[test]
    fn test_parse_seconds_truncates_sub_tick_digits() {
        assert_eq!(Duration::parse_seconds("0.00000019"), Some(Duration(1)));
        assert_eq!(Duration::parse_seconds("1.23456789"), Some(Duration(12_345_678)));
    }

    #[test]
    fn test_parse_seconds_rejects_garbage() {
        assert_eq!(Duration::parse_seconds(""), None);
        assert_eq!(Duration::parse_seconds("."), None);
        assert_eq!(Duration::parse_seconds("1.2.3"), None);
        assert_eq!(Duration::parse_seconds("-1.0"), None);
        assert_eq!(Duration::parse_seconds("abc"), None);
    }

    #[test]
    fn test_timestamp_arithmetic() {
        let start = Timestamp::from_secs(3);
        let later = start + Duration::from_millis(500);
        assert_eq!(later - start, Duration(5_000_000));
        assert_eq!(later - Duration::from_millis(500), start);
    }

    #[test]
    fn test_checked_timestamp_arithmetic() {
        let start = Timestamp::from_secs(3);
        assert_eq!(
            start.checked_add(Duration::from_secs(1)),
            Some(Timestamp::from_secs(4))
        );
        assert_eq!(start.checked_add(Duration(i64::MAX)), None);
        assert_eq!(Timestamp(i64::MIN).checked_sub(Duration(1)), None);
    }

    #[test]
    fn test_duration_display() {
        assert_eq!(Duration::from_millis(5).to_string(), "5.00ms");
        assert_eq!(Duration::from_millis(1500).to_string(), "1.50s");
    }

    #[test]
    fn test_context_matching() {
        let project = EventContext::project(1, 7, 3);
        let target = project.with_target(2);
        let task = target.with_task(9);

        assert!(task.same_project(&project));
        assert!(task.same_target(&target));
        assert!(!project.same_target(&target));
        assert!(task.same_task(&task));
        assert_ne!(project, target);
        assert_eq!(task.scope(), ContextScope::Task);
        assert_eq!(target.scope(), ContextScope::Target);
        assert_eq!(project.scope(), ContextScope::Project);
    }

    #[test]
    fn test_context_match_ignores_node() {
        let requester = EventContext::project(1, 7, 3).with_target(2).with_task(4);
        let elsewhere = EventContext::project(2, 7, 3);
        assert!(requester.same_project(&elsewhere));
    }
}
