// src/dag/level.rs

//! Dependency leveling.
//!
//! A job with no `injobs` is level 1; any other job is one more than the
//! highest level among its `injobs`. Levels only order presentation; the
//! dispatch loop never looks at them.

use std::collections::HashMap;

use tracing::debug;

use crate::config::model::JobSpec;
use crate::errors::{Result, WorkflowError};

/// Compute levels by fixed-point relaxation.
///
/// Each pass assigns a level to every job whose inputs are all levelled.
/// A level, once assigned, is final (its inputs were final), so every pass
/// either resolves at least one job or changes nothing. A pass that changes
/// nothing while jobs remain unresolved means those jobs sit on a cycle.
pub fn compute_levels(jobs: &[JobSpec]) -> Result<HashMap<String, u32>> {
    let mut levels: HashMap<String, u32> = HashMap::with_capacity(jobs.len());
    let mut passes = 0usize;

    loop {
        passes += 1;
        let mut changed = false;

        for job in jobs {
            let level = if job.injobs.is_empty() {
                Some(1)
            } else {
                job.injobs
                    .iter()
                    .map(|dep| levels.get(dep).copied())
                    .collect::<Option<Vec<u32>>>()
                    .and_then(|deps| deps.into_iter().max())
                    .map(|max| max + 1)
            };

            if let Some(level) = level {
                if levels.get(&job.id) != Some(&level) {
                    levels.insert(job.id.clone(), level);
                    changed = true;
                }
            }
        }

        if !changed || passes > jobs.len() + 1 {
            break;
        }
    }

    let unresolved: Vec<&str> = jobs
        .iter()
        .filter(|j| !levels.contains_key(&j.id))
        .map(|j| j.id.as_str())
        .collect();

    if !unresolved.is_empty() {
        for job in jobs.iter().filter(|j| !levels.contains_key(&j.id)) {
            if let Some(dep) = job.injobs.iter().find(|d| !jobs.iter().any(|j| &j.id == *d)) {
                return Err(WorkflowError::ConfigError(format!(
                    "job '{}' has unknown dependency '{}' in `injobs`",
                    job.id, dep
                )));
            }
        }
        return Err(WorkflowError::DagCycle(format!(
            "cannot level jobs [{}]; their injobs form a cycle",
            unresolved.join(", ")
        )));
    }

    debug!(passes, jobs = jobs.len(), "job levels computed");
    Ok(levels)
}

/// Compute levels and store them in each job's `job_level`.
pub fn assign_levels(jobs: &mut [JobSpec]) -> Result<()> {
    let levels = compute_levels(jobs)?;
    for job in jobs.iter_mut() {
        job.job_level = levels[&job.id];
    }
    Ok(())
}
