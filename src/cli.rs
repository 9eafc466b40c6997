// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{ArgGroup, Parser, ValueEnum};

use crate::types::QueueSystem;

/// Command-line arguments for `ngwf`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "ngwf",
    version,
    about = "Run a multi-stage job workflow over a set of samples.",
    long_about = None
)]
#[command(group(ArgGroup::new("samples").required(true).args(["sample_file", "sample_name"])))]
pub struct CliArgs {
    /// Workflow description (TOML).
    #[arg(short = 'i', long = "input", value_name = "PATH")]
    pub input: PathBuf,

    /// Sample file: one `SampleID data0 data1 ...` per line.
    #[arg(short = 's', long, value_name = "PATH")]
    pub sample_file: Option<PathBuf>,

    /// Inline samples: `S1:data0:data1,S2:data0`.
    #[arg(short = 'S', long, value_name = "LIST")]
    pub sample_name: Option<String>,

    /// Parameter file: one `JobID opt0 opt1 ...` per line.
    #[arg(short = 't', long, value_name = "PATH", conflicts_with = "parameter_name")]
    pub parameter_file: Option<PathBuf>,

    /// Inline parameters: `JobA:opt0:opt1,JobB:opt0`.
    #[arg(short = 'T', long, value_name = "LIST")]
    pub parameter_name: Option<String>,

    /// Comma-separated job subset; upstream jobs are added automatically.
    #[arg(short = 'j', long, value_name = "JOBS", value_delimiter = ',')]
    pub jobs: Vec<String>,

    /// Run a one-shot task instead of the dispatch loop.
    #[arg(short = 'J', long, value_enum, value_name = "TASK")]
    pub task: Option<Task>,

    /// Task argument, e.g. `jobids:a,b` or `run_after:<file>` for delete-jobs.
    #[arg(short = 'Z', long, value_name = "ARG")]
    pub second_parameter: Option<String>,

    /// Batch queueing system; overrides the workflow file.
    #[arg(short = 'Q', long, value_enum, ignore_case = true, value_name = "SYSTEM")]
    pub queue_system: Option<QueueSystem>,

    /// Directory holding sample directories and scripts.
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub work_dir: PathBuf,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `NGWF_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Fail when nothing is ready or running instead of polling forever.
    #[arg(long)]
    pub exit_when_stalled: bool,
}

/// One-shot tasks.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum Task {
    /// Write job scripts and stop.
    WriteSh,
    /// Write per-sample CPU and wall time reports.
    LogCpu,
    /// Print jobs with their inputs and levels.
    ListJobs,
    /// Print the status grid.
    Snapshot,
    /// Write a script deleting jobs and everything depending on them.
    DeleteJobs,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
