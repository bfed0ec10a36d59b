//! Headless trace printing
//!
//! ```text
//! Node#0
//!   Build Rebuild Debug|x64          lane 0  0.000s  +12.50s
//! Node#1
//!   app.vcxproj                      lane 0  0.100s  +12.30s
//!     Build                          lane 0  0.120s  +12.20s
//! ```

use std::io::{self, Write};

use crate::domain::{EntryId, NodeId};
use crate::timeline::Timeline;

const NAME_WIDTH: usize = 48;

/// Print the forest as an indented tree, one node at a time
///
/// # Errors
///
/// Propagates write failures.
pub fn print_trace<W: Write>(timeline: &Timeline, mut out: W) -> io::Result<()> {
    for (node, roots) in timeline.roots().iter().enumerate() {
        if roots.is_empty() {
            continue;
        }
        writeln!(out, "{}", NodeId(u32::try_from(node).unwrap_or(u32::MAX)))?;

        let mut stack: Vec<(EntryId, usize)> = roots.iter().rev().map(|&id| (id, 1)).collect();
        while let Some((id, depth)) = stack.pop() {
            let entry = timeline.entry(id);
            let name = format!("{:indent$}{}", "", entry.name, indent = depth * 2);
            writeln!(
                out,
                "{name:NAME_WIDTH$} lane {:<2} {}  +{}",
                entry.lane.lane.0,
                entry.start,
                entry.duration()
            )?;
            stack.extend(entry.children.iter().rev().map(|&child| (child, depth + 1)));
        }
    }
    Ok(())
}
