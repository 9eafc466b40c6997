// src/config/validate.rs

use std::collections::HashSet;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{ExecutionSpec, JobSpec, RawWorkflowFile, WorkflowSpec};
use crate::dag::level::assign_levels;
use crate::errors::{Result, WorkflowError};
use crate::types::ExecutionType;

impl TryFrom<RawWorkflowFile> for WorkflowSpec {
    type Error = crate::errors::WorkflowError;

    fn try_from(raw: RawWorkflowFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_workflow(&raw)?;

        let executions = raw
            .execution
            .into_iter()
            .map(|e| {
                let kind = parse_execution_type(&e.id, &e.kind)?;
                Ok(ExecutionSpec::from((e, kind)))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut jobs: Vec<JobSpec> = raw.job.into_iter().map(JobSpec::from).collect();

        validate_capacity(&executions, &jobs)?;
        assign_levels(&mut jobs)?;

        Ok(WorkflowSpec::new_unchecked(raw.config, executions, jobs))
    }
}

fn validate_raw_workflow(cfg: &RawWorkflowFile) -> Result<()> {
    ensure_has_jobs(cfg)?;
    validate_global_config(cfg)?;
    validate_unique_ids(cfg)?;
    validate_executions(cfg)?;
    validate_job_references(cfg)?;
    validate_dag(cfg)?;
    Ok(())
}

fn ensure_has_jobs(cfg: &RawWorkflowFile) -> Result<()> {
    if cfg.job.is_empty() {
        return Err(WorkflowError::ConfigError(
            "workflow must contain at least one [[job]] entry".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawWorkflowFile) -> Result<()> {
    let c = &cfg.config;

    if c.sleep_min_secs == 0 {
        return Err(WorkflowError::ConfigError(
            "[config].sleep_min_secs must be >= 1 (got 0)".to_string(),
        ));
    }
    if c.sleep_max_secs < c.sleep_min_secs {
        return Err(WorkflowError::ConfigError(format!(
            "[config].sleep_max_secs ({}) must be >= sleep_min_secs ({})",
            c.sleep_max_secs, c.sleep_min_secs
        )));
    }
    if c.call_timeout_secs == 0 {
        return Err(WorkflowError::ConfigError(
            "[config].call_timeout_secs must be >= 1 (got 0)".to_string(),
        ));
    }
    if c.scripts_dir.trim().is_empty() {
        return Err(WorkflowError::ConfigError(
            "[config].scripts_dir must not be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_unique_ids(cfg: &RawWorkflowFile) -> Result<()> {
    let mut seen = HashSet::new();
    for e in cfg.execution.iter() {
        if !seen.insert(e.id.as_str()) {
            return Err(WorkflowError::ConfigError(format!(
                "execution '{}' is declared more than once",
                e.id
            )));
        }
    }

    let mut seen = HashSet::new();
    for j in cfg.job.iter() {
        if !seen.insert(j.id.as_str()) {
            return Err(WorkflowError::ConfigError(format!(
                "job '{}' is declared more than once",
                j.id
            )));
        }
    }
    Ok(())
}

fn parse_execution_type(id: &str, kind: &str) -> Result<ExecutionType> {
    kind.parse::<ExecutionType>()
        .map_err(|_| WorkflowError::UnknownExecutionType {
            execution: id.to_string(),
            kind: kind.to_string(),
        })
}

fn validate_executions(cfg: &RawWorkflowFile) -> Result<()> {
    for e in cfg.execution.iter() {
        parse_execution_type(&e.id, &e.kind)?;

        if e.cores_per_node == 0 {
            return Err(WorkflowError::ConfigError(format!(
                "execution '{}' must have cores_per_node >= 1",
                e.id
            )));
        }
        if e.number_nodes == 0 {
            return Err(WorkflowError::ConfigError(format!(
                "execution '{}' must have number_nodes >= 1",
                e.id
            )));
        }
    }
    Ok(())
}

fn validate_job_references(cfg: &RawWorkflowFile) -> Result<()> {
    let job_ids: HashSet<&str> = cfg.job.iter().map(|j| j.id.as_str()).collect();

    for job in cfg.job.iter() {
        if job.cores_per_cmd == 0 || job.no_parallel == 0 {
            return Err(WorkflowError::ConfigError(format!(
                "job '{}' must have cores_per_cmd >= 1 and no_parallel >= 1",
                job.id
            )));
        }

        if !cfg.execution.iter().any(|e| e.id == job.execution) {
            return Err(WorkflowError::ConfigError(format!(
                "job '{}' refers to unknown execution '{}'",
                job.id, job.execution
            )));
        }

        for dep in job.injobs.iter() {
            if !job_ids.contains(dep.as_str()) {
                return Err(WorkflowError::ConfigError(format!(
                    "job '{}' has unknown dependency '{}' in `injobs`",
                    job.id, dep
                )));
            }
            if dep == &job.id {
                return Err(WorkflowError::ConfigError(format!(
                    "job '{}' cannot depend on itself in `injobs`",
                    job.id
                )));
            }
        }
    }
    Ok(())
}

fn validate_dag(cfg: &RawWorkflowFile) -> Result<()> {
    // Edge direction: injob -> job.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for job in cfg.job.iter() {
        graph.add_node(job.id.as_str());
    }

    for job in cfg.job.iter() {
        for dep in job.injobs.iter() {
            graph.add_edge(dep.as_str(), job.id.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => {
            let node = cycle.node_id();
            Err(WorkflowError::DagCycle(format!(
                "cycle detected in job graph involving job '{}'",
                node
            )))
        }
    }
}

/// Every job must fit in its pool, otherwise it could never be dispatched.
fn validate_capacity(executions: &[ExecutionSpec], jobs: &[JobSpec]) -> Result<()> {
    for job in jobs {
        let Some(exec) = executions.iter().find(|e| e.id == job.execution) else {
            return Err(WorkflowError::ConfigError(format!(
                "job '{}' refers to unknown execution '{}'",
                job.id, job.execution
            )));
        };

        if job.cores_per_cmd > exec.cores_per_node {
            return Err(WorkflowError::InsufficientCores(format!(
                "job '{}' needs {} cores per command, but execution '{}' only has {} cores per node",
                job.id, job.cores_per_cmd, exec.id, exec.cores_per_node
            )));
        }

        let cost = exec.cost_of(job);
        let capacity = exec.capacity();
        if cost > capacity {
            return Err(match exec.kind {
                ExecutionType::QueueSharedNode => WorkflowError::InsufficientNodes(format!(
                    "job '{}' needs {} nodes, but execution '{}' only has {} nodes",
                    job.id, cost, exec.id, capacity
                )),
                ExecutionType::Local | ExecutionType::Queue => {
                    WorkflowError::InsufficientCores(format!(
                        "job '{}' needs {} cores ({} x {}), but execution '{}' only has {} cores",
                        job.id, cost, job.cores_per_cmd, job.no_parallel, exec.id, capacity
                    ))
                }
            });
        }
    }
    Ok(())
}
