//! Event-to-tree reconstruction
//!
//! Turns the flat, time-ordered event stream into a tree of open/close
//! bracketed entries. Entries only live until the timeline projection is
//! built from them.

pub mod entry_tree;

pub use entry_tree::{build_entry_tree, Entry, EntryTree, EntryTreeBuilder};
