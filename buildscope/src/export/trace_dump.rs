use std::io::Write;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::config::BuildMetadata;
use crate::timeline::Timeline;

/// Dump container: the metadata the trace was built with plus the forest
#[derive(Serialize)]
struct TraceDump<'a> {
    /// Time unit of every `start`/`end` value
    time_unit: &'static str,
    metadata: &'a BuildMetadata,
    nodes: &'a Timeline,
}

/// Writes a finished [`Timeline`] as pretty-printed JSON
pub struct TraceDumpExporter<'a> {
    timeline: &'a Timeline,
    metadata: &'a BuildMetadata,
}

impl<'a> TraceDumpExporter<'a> {
    #[must_use]
    pub fn new(timeline: &'a Timeline, metadata: &'a BuildMetadata) -> Self {
        Self { timeline, metadata }
    }

    /// Export to any writer (file, buffer, stdout)
    ///
    /// # Errors
    ///
    /// Fails if serialization or the write fails.
    pub fn export<W: Write>(&self, mut writer: W) -> Result<()> {
        let dump = TraceDump {
            time_unit: "100ns",
            metadata: self.metadata,
            nodes: self.timeline,
        };
        serde_json::to_writer_pretty(&mut writer, &dump).context("Failed to serialize trace")?;
        writeln!(writer).context("Failed to write trace")?;
        writer.flush().context("Failed to flush trace")?;
        Ok(())
    }
}
