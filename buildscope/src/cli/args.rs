//! CLI argument definitions

use clap::Parser;
use std::path::PathBuf;

use crate::config::BuildMetadata;

#[derive(Parser, Debug)]
#[command(
    name = "buildscope",
    about = "Reconstruct a lane-annotated execution trace from a recorded build",
    after_help = "\
EXAMPLES:
    buildscope build-events.json                     Print the trace tree
    buildscope build-events.json --output trace.json Also write the trace as JSON
    buildscope build-events.json --no-mining         Task-level timing only"
)]
pub struct Args {
    /// Recorded event log (JSON)
    #[arg(value_name = "EVENT_LOG")]
    pub event_log: PathBuf,

    /// Write the finished trace to file
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Solution path (overrides the event log's metadata)
    #[arg(long, value_name = "PATH")]
    pub solution: Option<String>,

    /// Build configuration, e.g. Debug
    #[arg(long)]
    pub configuration: Option<String>,

    /// Build platform, e.g. x64
    #[arg(long)]
    pub platform: Option<String>,

    /// Requested build target, e.g. Rebuild
    #[arg(long)]
    pub target: Option<String>,

    /// Maximum number of projects built in parallel
    #[arg(long, value_name = "N")]
    pub max_parallel_projects: Option<u32>,

    /// Maximum number of parallel compiles per project
    #[arg(long, value_name = "N")]
    pub max_parallel_compiles: Option<u32>,

    /// Skip mining sub-phases out of compiler and linker output
    #[arg(long)]
    pub no_mining: bool,

    /// Suppress the trace tree, print only the summary
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Apply command-line overrides on top of recorded metadata
    pub fn apply_overrides(&self, metadata: &mut BuildMetadata) {
        if let Some(solution) = &self.solution {
            metadata.solution_path.clone_from(solution);
        }
        if let Some(configuration) = &self.configuration {
            metadata.configuration.clone_from(configuration);
        }
        if let Some(platform) = &self.platform {
            metadata.platform.clone_from(platform);
        }
        if let Some(target) = &self.target {
            metadata.target.clone_from(target);
        }
        if let Some(n) = self.max_parallel_projects {
            metadata.max_parallel_projects = n;
        }
        if let Some(n) = self.max_parallel_compiles {
            metadata.max_parallel_compiles = n;
        }
    }
}
