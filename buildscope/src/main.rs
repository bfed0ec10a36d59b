//! # buildscope - Main Entry Point
//!
//! Loads a recorded event log, reconstructs the trace and prints it; with
//! `--output` the finished trace is also written as JSON.

use std::fs::File;
use std::io::{self, BufWriter};

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use buildscope::analysis::TraceSummary;
use buildscope::cli::Args;
use buildscope::display::print_trace;
use buildscope::domain::TraceError;
use buildscope::event_log::EventLog;
use buildscope::export::TraceDumpExporter;
use buildscope::mining::MinerRegistry;
use buildscope::pipeline::TraceBuilder;

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_MALFORMED: i32 = 2;

fn main() {
    env_logger::init();
    std::process::exit(match run() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            let code = exit_code_for(&e);
            eprintln!("error: {e:#}");
            code
        }
    });
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    if err.downcast_ref::<TraceError>().is_some() {
        EXIT_MALFORMED
    } else {
        EXIT_ERROR
    }
}

fn run() -> Result<()> {
    let args = Args::parse();

    let log = EventLog::from_file(&args.event_log)
        .with_context(|| format!("Failed to load {}", args.event_log.display()))?;
    info!("Loaded {} events from {}", log.events.len(), args.event_log.display());

    let mut metadata = log.metadata;
    args.apply_overrides(&mut metadata);

    let miners = if args.no_mining {
        MinerRegistry::empty()
    } else {
        MinerRegistry::with_defaults()
    };
    let builder = TraceBuilder::new(metadata).with_miners(miners);
    let timeline = builder.build(log.events)?;

    if !args.quiet {
        print_trace(&timeline, io::stdout().lock()).context("Failed to print trace")?;
        println!();
    }
    print!("{}", TraceSummary::from_timeline(&timeline));

    if let Some(path) = &args.output {
        let file = File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        TraceDumpExporter::new(&timeline, builder.metadata()).export(BufWriter::new(file))?;
        println!("output: {}", path.display());
    }

    Ok(())
}
