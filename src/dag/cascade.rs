// src/dag/cascade.rs

//! Cascade deletion planning.
//!
//! Given a seed set of jobs, find every job of the same sample that consumed
//! their output (directly or transitively) and has been submitted, then emit
//! a shell script that removes their work directories and handle files and
//! cancels anything still running. The script is only written, never run.

use std::collections::HashSet;
use std::fmt::Write as _;
use std::path::PathBuf;
use std::str::FromStr;

use tracing::{debug, info};

use crate::dag::graph::DagGraph;
use crate::dag::table::JobTable;
use crate::errors::{Result, WorkflowError};
use crate::exec::handle::{read_handle_file, JobHandle};
use crate::exec::script::shell_quote;
use crate::fs::{FileSystem, WorkLayout};
use crate::types::ExecutionType;

/// How the seed set is chosen (`-Z` argument of `delete-jobs`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteSelector {
    /// `jobids:a,b,c`
    JobIds(Vec<String>),
    /// `run_after:<file>`: every job whose handle file is at least as new as
    /// the reference file.
    RunAfter(PathBuf),
}

impl FromStr for DeleteSelector {
    type Err = WorkflowError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (mode, value) = s.split_once(':').ok_or_else(|| {
            WorkflowError::ConfigError(format!(
                "delete selector '{s}' must look like jobids:a,b or run_after:<file>"
            ))
        })?;

        match mode.trim() {
            "jobids" => {
                let ids: Vec<String> = value
                    .split(',')
                    .map(str::trim)
                    .filter(|id| !id.is_empty())
                    .map(str::to_string)
                    .collect();
                if ids.is_empty() {
                    return Err(WorkflowError::ConfigError(
                        "jobids selector names no jobs".to_string(),
                    ));
                }
                Ok(DeleteSelector::JobIds(ids))
            }
            "run_after" if !value.trim().is_empty() => {
                Ok(DeleteSelector::RunAfter(PathBuf::from(value.trim())))
            }
            "run_after" => Err(WorkflowError::ConfigError(
                "run_after selector needs a reference file".to_string(),
            )),
            other => Err(WorkflowError::ConfigError(format!(
                "unknown delete mode '{other}' (expected jobids or run_after)"
            ))),
        }
    }
}

/// One job instance scheduled for deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionEntry {
    pub job: String,
    pub work_dir: PathBuf,
    pub script: PathBuf,
    pub handle_file: PathBuf,
    pub execution_kind: ExecutionType,
    pub handles: Vec<JobHandle>,
}

/// All deletions for one sample, jobs in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleDeletion {
    pub sample: String,
    pub entries: Vec<DeletionEntry>,
}

impl SampleDeletion {
    pub fn job_ids(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.job.as_str()).collect()
    }
}

/// Seed jobs for one sample.
pub fn seed_jobs(
    table: &JobTable,
    sample: &str,
    selector: &DeleteSelector,
    fs: &dyn FileSystem,
) -> Result<HashSet<String>> {
    match selector {
        DeleteSelector::JobIds(ids) => {
            for id in ids {
                if !table.jobs().iter().any(|j| j == id) {
                    return Err(WorkflowError::JobNotFound(id.clone()));
                }
            }
            Ok(ids.iter().cloned().collect())
        }
        DeleteSelector::RunAfter(reference) => {
            let reference_time = fs.modified(reference).ok_or_else(|| {
                WorkflowError::ConfigError(format!(
                    "reference file {:?} does not exist",
                    reference
                ))
            })?;

            let seeds = table
                .iter()
                .filter(|info| info.sample() == sample)
                .filter(|info| {
                    fs.modified(&info.handle_file())
                        .is_some_and(|t| t >= reference_time)
                })
                .map(|info| info.job().to_string())
                .collect();
            Ok(seeds)
        }
    }
}

/// Grow `set` with every submitted job of `sample` that lists a member among
/// its injobs, following dependents until nothing changes.
pub fn cascade_closure(
    graph: &DagGraph,
    table: &JobTable,
    sample: &str,
    mut set: HashSet<String>,
    fs: &dyn FileSystem,
) -> HashSet<String> {
    let mut stack: Vec<String> = set.iter().cloned().collect();

    while let Some(job) = stack.pop() {
        for dependent in graph.dependents_of(&job) {
            if set.contains(dependent) {
                continue;
            }
            // Jobs outside the active subset have no instance.
            let Some(info) = table.get(dependent, sample) else {
                continue;
            };
            if info.has_submission_evidence(fs) {
                set.insert(dependent.clone());
                stack.push(dependent.clone());
            }
        }
    }
    set
}

/// Compute the per-sample deletion plan. Samples with nothing to delete are
/// left out.
pub fn plan_deletion(
    graph: &DagGraph,
    table: &JobTable,
    layout: &WorkLayout,
    fs: &dyn FileSystem,
    selector: &DeleteSelector,
) -> Result<Vec<SampleDeletion>> {
    let mut plan = Vec::new();

    for sample in table.samples() {
        let seeds = seed_jobs(table, sample, selector, fs)?;
        let closed = cascade_closure(graph, table, sample, seeds, fs);
        if closed.is_empty() {
            continue;
        }

        let mut entries = Vec::new();
        for job in table.jobs() {
            if !closed.contains(job) {
                continue;
            }
            let Some(info) = table.get(job, sample) else {
                continue;
            };
            let handle_file = info.handle_file();
            let handles = read_handle_file(fs, &handle_file)?.unwrap_or_default();
            entries.push(DeletionEntry {
                job: job.clone(),
                work_dir: layout.instance_dir(sample, job),
                script: info.script.clone(),
                handle_file,
                execution_kind: info.execution_kind,
                handles,
            });
        }

        let deletion = SampleDeletion {
            sample: sample.clone(),
            entries,
        };
        info!(
            sample = %deletion.sample,
            jobs = ?deletion.job_ids(),
            "jobs to be deleted"
        );
        plan.push(deletion);
    }

    debug!(samples = plan.len(), "deletion plan computed");
    Ok(plan)
}

/// Render the cleanup script for a plan.
pub fn render_delete_script(plan: &[SampleDeletion]) -> String {
    let mut out = String::from("#Please execute the following commands\n");

    for deletion in plan {
        let _ = writeln!(
            out,
            "#jobs to be deleted for {}: {}",
            deletion.sample,
            deletion.job_ids().join(",")
        );
        for entry in deletion.entries.iter() {
            let _ = writeln!(out, "\\rm -rf {}", shell_quote(&entry.work_dir));
            let _ = writeln!(out, "\\rm {}", shell_quote(&entry.handle_file));
            let _ = writeln!(out, "\\rm {}.*.std*", shell_quote(&entry.script));

            if entry.handles.is_empty() {
                continue;
            }
            let ids: Vec<&str> = entry.handles.iter().map(JobHandle::as_str).collect();
            let cancel = if entry.execution_kind.is_queue() {
                "qdel"
            } else {
                "kill"
            };
            let _ = writeln!(out, "{cancel} {}", ids.join(" "));
        }
    }
    out
}
