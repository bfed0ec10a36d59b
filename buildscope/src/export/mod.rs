//! Trace export functionality
//!
//! The finished forest can be written as nested JSON, one object per node
//! with its root entries. Flattening into a trace-event viewer format is
//! left to downstream tools.

pub mod trace_dump;

pub use trace_dump::TraceDumpExporter;
