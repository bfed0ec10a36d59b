//! Analysis passes over a projected timeline
//!
//! Pure business logic on the trace forest, separated from the input and
//! presentation layers.

pub mod fitting;
pub mod lanes;
pub mod summary;

pub use fitting::{fit_entry, fit_timeline};
pub use lanes::resolve_lanes;
pub use summary::{NodeSummary, TraceSummary};
