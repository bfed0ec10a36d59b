//! # buildscope - Build Execution Trace Reconstruction
//!
//! buildscope turns the flat, time-ordered lifecycle event stream of a
//! finished build (build/project/target/task start and finish, plus free
//! text diagnostics) into a hierarchical trace: one forest per execution
//! node, every entry placed on a lane so that concurrent work never shares
//! one, with compiler and linker sub-phases recovered from their timing
//! output.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │            Build tool adapter / recorded event log              │
//! └───────────────────────┬─────────────────────────────────────────┘
//!                         │ Vec<Event>  (buildscope-common)
//!                         ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    buildscope (This Crate)                      │
//! │                                                                 │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐         │
//! │  │  Entry Tree  │──▶│   Timeline   │──▶│  Diagnostic  │         │
//! │  │   Builder    │   │  Projector   │   │    Miners    │         │
//! │  └──────────────┘   └──────────────┘   └──────┬───────┘         │
//! │                                               │                 │
//! │                     ┌──────────────┐   ┌──────▼───────┐         │
//! │                     │   Interval   │◀──│     Lane     │         │
//! │                     │    Fitter    │   │   Resolver   │         │
//! │                     └──────┬───────┘   └──────────────┘         │
//! │                            ▼                                    │
//! │              ┌──────────────┐   ┌──────────────┐                │
//! │              │   Display    │   │    Export    │                │
//! │              │  (headless)  │   │ (trace JSON) │                │
//! │              └──────────────┘   └──────────────┘                │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Structure
//!
//! ### Core Pipeline Modules
//!
//! - [`building`]: Entry tree reconstruction from the event stream
//!   - Four open sets (build/project/target/task), context-id matching
//!   - Project parents fall back from open task to open project to root
//!
//! - [`timeline`]: The externally visible trace forest
//!   - Arena of entries addressed by [`domain::EntryId`], roots per node
//!   - Pre-order projection with display names from the start events
//!
//! - [`mining`]: Sub-phases recovered from diagnostic text
//!   - Per-file compile front-end/back-end, report-time trees, link passes
//!   - Best-effort: a failing miner is rolled back for that task only
//!
//! - [`analysis`]: Passes over the projected forest
//!   - `lanes`: first-fit lane inference per node
//!   - `fitting`: proportional rescaling of overflowing children
//!   - `summary`: entry, lane and span statistics
//!
//! - [`pipeline`]: Runs the stages above in order
//!
//! ### Input and Output Modules
//!
//! - [`event_log`]: Recorded JSON event logs (replay input)
//! - [`config`]: Build metadata used to label the trace
//! - [`display`]: Indented tree print of the trace
//! - [`export`]: Nested JSON dump of the finished trace
//! - [`cli`]: Command-line argument parsing
//! - [`domain`]: Core types (`EntryId`, `Lane`) and error enums
//!
//! ## Guarantees
//!
//! For every finished trace:
//!
//! 1. **Containment**: every child's `[start, end)` lies within its parent's
//! 2. **Lanes**: entries on one node that overlap in time and are not
//!    nested never share a lane
//! 3. **All or nothing**: a stream that breaks the build protocol (an
//!    unmatched finish, a second build, a missing parent) yields a
//!    [`domain::TraceError`], never a partial trace
//!
//! Lanes are a visualization aid inferred from time intervals alone. They
//! do not recover operating-system threads.
//!
//! ## Typical Usage
//!
//! ```bash
//! # Print the trace of a recorded build
//! buildscope build-events.json
//!
//! # Write the finished trace for other tools
//! buildscope build-events.json --output trace.json
//!
//! # Debug logging
//! RUST_LOG=buildscope=debug buildscope build-events.json
//! ```

// Expose modules for testing
pub mod analysis;
pub mod building;
pub mod cli;
pub mod config;
pub mod display;
pub mod domain;
pub mod event_log;
pub mod export;
pub mod mining;
pub mod pipeline;
pub mod timeline;
