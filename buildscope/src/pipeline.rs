//! End-to-end trace construction
//!
//! ```text
//! events ─► entry tree ─► timeline ─► miners ─► fitting ─► lanes ─► trace
//! ```
//!
//! Only the entry tree can fail; every later stage works on a well-formed
//! tree and is infallible (miner failures are contained per task).

use buildscope_common::Event;
use log::info;

use crate::analysis::{fit_timeline, resolve_lanes};
use crate::building::build_entry_tree;
use crate::config::BuildMetadata;
use crate::domain::TraceError;
use crate::mining::MinerRegistry;
use crate::timeline::{project, Timeline};

/// Builds a finished trace from one build session's events.
///
/// ```
/// use buildscope::config::BuildMetadata;
/// use buildscope::pipeline::TraceBuilder;
/// use buildscope_common::{Event, EventKind, Timestamp};
///
/// let events = vec![
///     Event::new(EventKind::BuildStarted, None, Timestamp::from_secs(0)),
///     Event::new(EventKind::BuildFinished { succeeded: true }, None, Timestamp::from_secs(1)),
/// ];
/// let trace = TraceBuilder::new(BuildMetadata::default()).build(events).unwrap();
/// assert_eq!(trace.len(), 1);
/// ```
#[derive(Debug)]
pub struct TraceBuilder {
    metadata: BuildMetadata,
    miners: MinerRegistry,
}

impl TraceBuilder {
    /// Builder with the default miners
    #[must_use]
    pub fn new(metadata: BuildMetadata) -> Self {
        Self {
            metadata,
            miners: MinerRegistry::with_defaults(),
        }
    }

    #[must_use]
    pub fn with_miners(mut self, miners: MinerRegistry) -> Self {
        self.miners = miners;
        self
    }

    #[must_use]
    pub fn metadata(&self) -> &BuildMetadata {
        &self.metadata
    }

    /// Run the whole pipeline.
    ///
    /// # Errors
    ///
    /// Returns a [`TraceError`] if the event stream violates the build
    /// protocol; no partial trace is produced.
    pub fn build(&self, events: impl IntoIterator<Item = Event>) -> Result<Timeline, TraceError> {
        let tree = build_entry_tree(events)?;
        info!("Built entry tree with {} entries", tree.len());

        let mut timeline = project(&tree, &self.metadata);
        drop(tree);

        let stats = self.miners.mine_all(&mut timeline);
        info!(
            "Mined {} entries from {} tasks ({} miner runs rolled back)",
            stats.entries, stats.tasks, stats.failures
        );

        // Rescaling moves subtrees independently, so lanes are resolved
        // on the fitted intervals
        let rescaled = fit_timeline(&mut timeline);
        info!("Fitted intervals, {rescaled} subtrees rescaled");

        let lanes = resolve_lanes(&mut timeline);
        info!(
            "Resolved lanes: {}",
            lanes
                .iter()
                .map(|(node, count)| format!("{node}={count}"))
                .collect::<Vec<_>>()
                .join(", ")
        );

        Ok(timeline)
    }
}
