//! Line patterns recognized in compiler and linker diagnostic output.
//!
//! ```text
//! a.cpp                                                     source file
//! time(C:\VC\bin\c1xx.dll)=0.52s < 12 - 34 > BB [C:\a.cpp]  stage time
//! Generating Code...                                        sentinel
//!   OptRef: Total time = 0.016s                             link sub-step
//! Pass 1: Interval #1, time = 0.25s                         link pass
//! Include Headers:                                          report section
//! 	c:\include\vector: 0.012s                             report item
//! 	Total: 0.05s                                          report total
//! ```
//!
//! Regexes are compiled once on first use.

use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::domain::{Duration, MiningError};

/// Printed once after every front-end has finished, when files are
/// compiled one after the other
pub const FRONT_ENDS_DONE: &str = "Generating Code...";

/// Section headers of the compiler's report-time output
pub const REPORT_SECTIONS: [&str; 3] = [
    "Include Headers:",
    "Class Definitions:",
    "Function Definitions:",
];

fn source_file() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"^\s*(?P<file>[^\s\\/:*?"<>|]+\.(?i:c|cc|cpp|cxx|c\+\+))\s*$"#)
            .expect("valid regex")
    })
}

fn stage_time() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*time\((?P<stage>[^)]*)\)=(?P<secs>\S*?)s\b.*\[(?P<file>[^\]]+)\]\s*$")
            .expect("valid regex")
    })
}

fn link_pass() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*Pass (?P<pass>[12]):.*?(?P<secs>\d[\d.]*)s\s*$").expect("valid regex")
    })
}

fn trailing_elapsed() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(?P<name>[^:]+?):.*?(?P<secs>\d[\d.]*)s\s*$").expect("valid regex")
    })
}

fn report_total() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*Total:\s*(?P<secs>\S+?)s\s*$").expect("valid regex"))
}

fn report_item() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?P<tabs>\t+)(?P<name>.+):\s*(?P<secs>\d[\d.]*)s\s*$").expect("valid regex")
    })
}

/// Compiler stage that reported a time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// `c1.dll` / `c1xx.dll`
    FrontEnd,
    /// `c2.dll`
    BackEnd,
}

/// A `time(<stage>)=<secs>s ... [<file>]` line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageTime {
    pub stage: Stage,
    /// File name of the stage binary, e.g. `c1xx.dll`
    pub stage_name: String,
    pub elapsed: Duration,
    pub file: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimedStep {
    pub name: String,
    pub elapsed: Duration,
}

/// Whole-line bare source file name, as printed when a file starts compiling
pub fn source_file_name(line: &str) -> Option<&str> {
    source_file()
        .captures(line)
        .and_then(|caps| caps.name("file"))
        .map(|m| m.as_str())
}

pub fn is_front_ends_done(line: &str) -> bool {
    line.trim() == FRONT_ENDS_DONE
}

/// Parse a stage time line; stages other than the two compiler halves
/// yield `Ok(None)`.
pub fn stage_time_line(line: &str) -> Result<Option<StageTime>, MiningError> {
    let Some(caps) = stage_time().captures(line) else {
        return Ok(None);
    };
    let stage_name = base_name(&caps["stage"]).to_string();
    let stage = if is_front_end_stage(&stage_name) {
        Stage::FrontEnd
    } else if starts_with_ignore_case(&stage_name, "c2") {
        Stage::BackEnd
    } else {
        return Ok(None);
    };
    Ok(Some(StageTime {
        stage,
        stage_name,
        elapsed: elapsed(&caps, line)?,
        file: caps["file"].trim().to_string(),
    }))
}

/// `Pass <n>: ... <secs>s`, returning the pass number
pub fn link_pass_line(line: &str) -> Result<Option<(u8, Duration)>, MiningError> {
    let Some(caps) = link_pass().captures(line) else {
        return Ok(None);
    };
    let pass = if &caps["pass"] == "1" { 1 } else { 2 };
    Ok(Some((pass, elapsed(&caps, line)?)))
}

/// Generic `<name>: ... <secs>s` line
pub fn timed_step_line(line: &str) -> Result<Option<TimedStep>, MiningError> {
    let Some(caps) = trailing_elapsed().captures(line) else {
        return Ok(None);
    };
    Ok(Some(TimedStep {
        name: caps["name"].trim().to_string(),
        elapsed: elapsed(&caps, line)?,
    }))
}

pub fn is_report_section(line: &str) -> bool {
    let line = line.trim();
    REPORT_SECTIONS.iter().any(|header| *header == line)
}

pub fn report_total_line(line: &str) -> Result<Option<Duration>, MiningError> {
    match report_total().captures(line) {
        Some(caps) => elapsed(&caps, line).map(Some),
        None => Ok(None),
    }
}

/// `\t...<name>: <secs>s`, returning the tab depth
pub fn report_item_line(line: &str) -> Result<Option<(usize, TimedStep)>, MiningError> {
    let Some(caps) = report_item().captures(line) else {
        return Ok(None);
    };
    let depth = caps["tabs"].len();
    Ok(Some((
        depth,
        TimedStep {
            name: caps["name"].trim().to_string(),
            elapsed: elapsed(&caps, line)?,
        },
    )))
}

/// `c1.dll` (C) and `c1xx.dll` (C++) are the compiler front-ends
pub fn is_front_end_stage(stage_name: &str) -> bool {
    starts_with_ignore_case(stage_name, "c1")
}

/// Last path component, for either separator
pub fn base_name(path: &str) -> &str {
    path.rsplit(['\\', '/']).next().unwrap_or(path)
}

fn starts_with_ignore_case(text: &str, prefix: &str) -> bool {
    text.get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

fn elapsed(caps: &Captures<'_>, line: &str) -> Result<Duration, MiningError> {
    let text = &caps["secs"];
    Duration::parse_seconds(text).ok_or_else(|| MiningError::InvalidElapsed {
        text: text.to_string(),
        line: line.to_string(),
    })
}
