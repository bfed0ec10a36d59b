//! Recorded event logs
//!
//! A neutral JSON recording of one build session, as emitted by an adapter:
//!
//! ```json
//! {
//!   "metadata": { "solution_path": "C:\\src\\app.sln", "target": "Build" },
//!   "events": [
//!     { "type": "BuildStarted", "context": null, "message": "", "timestamp": 0 },
//!     { "type": "BuildFinished", "succeeded": true, "context": null, "message": "", "timestamp": 10 }
//!   ]
//! }
//! ```
//!
//! Timestamps are 100ns ticks. `metadata` may be omitted.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use buildscope_common::Event;
use serde::{Deserialize, Serialize};

use crate::config::BuildMetadata;
use crate::domain::EventLogError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventLog {
    #[serde(default)]
    pub metadata: BuildMetadata,
    pub events: Vec<Event>,
}

impl EventLog {
    /// Load an event log from disk
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or is not a valid event log.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, EventLogError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    /// # Errors
    ///
    /// Fails if the input is not a valid event log.
    pub fn from_reader(reader: impl Read) -> Result<Self, EventLogError> {
        Ok(serde_json::from_reader(reader)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use buildscope_common::EventKind;

    #[test]
    fn test_metadata_is_optional() {
        let json = r#"{"events": [
            {"type": "BuildStarted", "context": null, "message": "", "timestamp": 0}
        ]}"#;
        let log = EventLog::from_reader(json.as_bytes()).unwrap();
        assert_eq!(log.metadata, BuildMetadata::default());
        assert_eq!(log.events.len(), 1);
        assert!(matches!(log.events[0].kind, EventKind::BuildStarted));
    }

    #[test]
    fn test_invalid_json_is_reported() {
        let err = EventLog::from_reader("{".as_bytes()).unwrap_err();
        assert!(matches!(err, EventLogError::Json(_)));
        assert!(err.to_string().starts_with("Failed to parse event log"));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = EventLog::from_file("/nonexistent/events.json").unwrap_err();
        assert!(matches!(err, EventLogError::Io(_)));
    }
}
