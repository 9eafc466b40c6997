// src/report.rs

//! Human-readable output: job list, status grid and CPU accounting.
//!
//! Everything here renders to a `String`; printing and writing files is left
//! to the caller.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::Context;
use tracing::{debug, info};

use crate::config::model::WorkflowSpec;
use crate::dag::table::JobTable;
use crate::errors::Result;
use crate::fs::{FileSystem, WorkLayout};
use crate::types::JobStatus;

/// `3725` -> `1h2m5s`.
pub fn format_duration(secs: u64) -> String {
    format!("{}h{}m{}s", secs / 3600, (secs % 3600) / 60, secs % 60)
}

/// One line per active job: `id  In_jobs:[ a,b ]  Job_level:n`.
pub fn render_job_list(spec: &WorkflowSpec, jobs: &[String]) -> String {
    let mut out = String::new();
    for id in jobs {
        let Some(job) = spec.job(id) else {
            continue;
        };
        let _ = writeln!(
            out,
            "{}\tIn_jobs:[ {} ]\tJob_level:{}",
            job.id,
            job.injobs.join(","),
            job.job_level
        );
    }
    out
}

/// Status grid: one row per sample, one column per job, with job names
/// written vertically above their column.
pub fn render_snapshot(table: &JobTable) -> String {
    let mut out = String::from("Job status:\n");
    for status in [
        JobStatus::Wait,
        JobStatus::Ready,
        JobStatus::Submitted,
        JobStatus::Completed,
        JobStatus::Error,
    ] {
        let _ = writeln!(out, "{}\t{}", status.symbol(), status.as_str());
    }
    out.push('\n');

    let sample_width = table.samples().iter().map(|s| s.len()).max().unwrap_or(0);
    let job_chars: Vec<Vec<char>> = table.jobs().iter().map(|j| j.chars().collect()).collect();
    let job_height = job_chars.iter().map(Vec::len).max().unwrap_or(0);

    // Names are bottom-aligned so the last letters share the last header row.
    for row in 0..job_height {
        let _ = write!(out, "{:width$}\t", "", width = sample_width);
        for chars in job_chars.iter() {
            let pad = job_height - chars.len();
            let c = if row >= pad { chars[row - pad] } else { ' ' };
            let _ = write!(out, " {c}");
        }
        out.push('\n');
    }

    for sample in table.samples() {
        let _ = write!(out, "{:width$}\t", sample, width = sample_width);
        for job in table.jobs() {
            let symbol = table
                .status_of(job, sample)
                .map_or('_', JobStatus::symbol);
            let _ = write!(out, " {symbol}");
        }
        out.push('\n');
    }
    out
}

/// CPU seconds recorded in a `WF.cpu` log: the sum over lines of
/// `time_spent × cores`.
pub fn parse_cpu_log(contents: &str) -> u64 {
    contents
        .lines()
        .map(|line| {
            let mut cores = 1u64;
            let mut spent = 0u64;
            for field in line.split_whitespace() {
                match field.split_once('=') {
                    Some(("cores", v)) => cores = v.parse().unwrap_or(1),
                    Some(("time_spent", v)) => spent = v.parse().unwrap_or(0),
                    _ => {}
                }
            }
            spent.saturating_mul(cores)
        })
        .sum()
}

/// Accounting for one job of one sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobCpu {
    pub job: String,
    pub cores: u32,
    pub start: Option<u64>,
    pub end: Option<u64>,
    pub cpu_secs: u64,
}

impl JobCpu {
    pub fn wall_secs(&self) -> u64 {
        match (self.start, self.end) {
            (Some(s), Some(e)) => e.saturating_sub(s),
            _ => 0,
        }
    }
}

fn read_epoch(fs: &dyn FileSystem, path: &Path) -> Option<u64> {
    if !fs.is_file(path) {
        return None;
    }
    fs.read_to_string(path).ok()?.trim().parse().ok()
}

/// Collect accounting rows for `sample`, jobs in table order.
pub fn collect_cpu(table: &JobTable, spec: &WorkflowSpec, sample: &str, fs: &dyn FileSystem) -> Vec<JobCpu> {
    table
        .jobs()
        .iter()
        .filter_map(|job| {
            let info = table.get(job, sample)?;
            let cores = spec.job(job).map_or(0, |j| j.cores_total());
            let cpu_secs = if fs.is_file(&info.cpu_file) {
                fs.read_to_string(&info.cpu_file)
                    .map(|c| parse_cpu_log(&c))
                    .unwrap_or(0)
            } else {
                0
            };
            Some(JobCpu {
                job: job.clone(),
                cores,
                start: read_epoch(fs, &info.start_file),
                end: read_epoch(fs, &info.complete_file),
                cpu_secs,
            })
        })
        .collect()
}

/// Tab-separated report with a trailing `total` row. Total wall time spans
/// from the earliest start to the latest completion.
pub fn render_cpu_report(rows: &[JobCpu]) -> String {
    let mut out = String::from("#job_name\tCores\tWall(s)\tWall_time\tCPU(s)\tCPU_time\n");

    for row in rows {
        let wall = row.wall_secs();
        let _ = writeln!(
            out,
            "{}\t{}\t{}\t{}\t{}\t{}",
            row.job,
            row.cores,
            wall,
            format_duration(wall),
            row.cpu_secs,
            format_duration(row.cpu_secs)
        );
    }

    let min_start = rows.iter().filter_map(|r| r.start).min();
    let max_end = rows.iter().filter_map(|r| r.end).max();
    let total_wall = match (min_start, max_end) {
        (Some(s), Some(e)) => e.saturating_sub(s),
        _ => 0,
    };
    let total_cpu: u64 = rows.iter().map(|r| r.cpu_secs).sum();
    let _ = writeln!(
        out,
        "total\t-\t{}\t{}\t{}\t{}",
        total_wall,
        format_duration(total_wall),
        total_cpu,
        format_duration(total_cpu)
    );
    out
}

/// Write `<sample>/WF.cpu` for every sample in the table.
pub fn write_cpu_reports(
    table: &JobTable,
    spec: &WorkflowSpec,
    layout: &WorkLayout,
    fs: &dyn FileSystem,
) -> Result<()> {
    for sample in table.samples() {
        let rows = collect_cpu(table, spec, sample, fs);
        let path = layout.sample_cpu_report(sample);
        fs.write(&path, render_cpu_report(&rows).as_bytes())
            .with_context(|| format!("writing CPU report {:?}", path))?;
        debug!(sample = %sample, path = ?path, "CPU report written");
    }
    info!(samples = table.samples().len(), "CPU reports written");
    Ok(())
}
