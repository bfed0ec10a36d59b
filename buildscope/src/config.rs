//! Build session metadata
//!
//! Configuration of the analyzed build: where the solution lives, what was
//! requested, and how much parallelism the build was allowed. Only used to
//! label the trace.

use serde::{Deserialize, Serialize};

/// Metadata record supplied alongside the event stream.
///
/// Every field has a default so partial records (or none at all) can be
/// embedded in an event log and completed from the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildMetadata {
    /// Path of the solution file; project paths are shown relative to it
    pub solution_path: String,
    pub configuration: String,
    pub platform: String,
    /// Requested build target (e.g. `Build`, `Rebuild`)
    pub target: String,
    /// Maximum number of projects built in parallel
    pub max_parallel_projects: u32,
    /// Maximum number of parallel sub-tasks (compiler processes) per project
    pub max_parallel_compiles: u32,
}

impl BuildMetadata {
    /// Display name of the top-level build entry.
    ///
    /// ```
    /// use buildscope::config::BuildMetadata;
    ///
    /// let metadata = BuildMetadata {
    ///     target: "Rebuild".to_string(),
    ///     configuration: "Debug".to_string(),
    ///     platform: "x64".to_string(),
    ///     max_parallel_projects: 8,
    ///     max_parallel_compiles: 4,
    ///     ..BuildMetadata::default()
    /// };
    /// assert_eq!(
    ///     metadata.display_name(),
    ///     "Build Rebuild Debug|x64 (parallel projects: 8, parallel compiles: 4)"
    /// );
    /// ```
    #[must_use]
    pub fn display_name(&self) -> String {
        let mut name = String::from("Build");
        if !self.target.is_empty() {
            name.push(' ');
            name.push_str(&self.target);
        }
        if !self.configuration.is_empty() || !self.platform.is_empty() {
            name.push_str(&format!(" {}|{}", self.configuration, self.platform));
        }
        if self.max_parallel_projects > 0 || self.max_parallel_compiles > 0 {
            name.push_str(&format!(
                " (parallel projects: {}, parallel compiles: {})",
                self.max_parallel_projects, self.max_parallel_compiles
            ));
        }
        name
    }
}
