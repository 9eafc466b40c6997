// src/dag/graph.rs

use std::collections::{HashMap, HashSet};

use crate::config::model::JobSpec;
use crate::errors::{Result, WorkflowError};

/// Internal node structure: stores immediate deps and dependents.
#[derive(Debug, Clone)]
struct DagNode {
    /// Direct upstream jobs (`injobs`).
    deps: Vec<String>,
    /// Direct downstream jobs: jobs listing this one in their `injobs`.
    dependents: Vec<String>,
}

/// In-memory job graph keyed by job id, remembering declaration order.
///
/// Acyclicity is checked in `config::validate`; here we just keep adjacency
/// information. Dependencies drive subset selection, dependents drive
/// cascade deletion.
#[derive(Debug, Clone)]
pub struct DagGraph {
    order: Vec<String>,
    nodes: HashMap<String, DagNode>,
}

impl DagGraph {
    pub fn from_jobs(jobs: &[JobSpec]) -> Self {
        let mut nodes: HashMap<String, DagNode> = HashMap::new();
        let order: Vec<String> = jobs.iter().map(|j| j.id.clone()).collect();

        for job in jobs {
            nodes.insert(
                job.id.clone(),
                DagNode {
                    deps: job.injobs.clone(),
                    dependents: Vec::new(),
                },
            );
        }

        // Populate dependents in declaration order.
        for job in jobs {
            for dep in job.injobs.iter() {
                if let Some(dep_node) = nodes.get_mut(dep) {
                    dep_node.dependents.push(job.id.clone());
                }
            }
        }

        Self { order, nodes }
    }

    /// Job ids in declaration order.
    pub fn jobs(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|s| s.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    pub fn dependencies_of(&self, name: &str) -> &[String] {
        self.nodes
            .get(name)
            .map(|n| n.deps.as_slice())
            .unwrap_or(&[])
    }

    pub fn dependents_of(&self, name: &str) -> &[String] {
        self.nodes
            .get(name)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }

    /// The requested jobs plus everything they transitively depend on.
    ///
    /// Running a subset must also run its upstream jobs, otherwise the subset
    /// would wait forever on instances that are never dispatched.
    pub fn upstream_closure<S: AsRef<str>>(&self, requested: &[S]) -> Result<HashSet<String>> {
        let mut closure: HashSet<String> = HashSet::new();
        let mut stack: Vec<String> = Vec::new();

        for name in requested {
            let name = name.as_ref();
            if !self.contains(name) {
                return Err(WorkflowError::JobNotFound(format!(
                    "job subset names unknown job '{name}'"
                )));
            }
            stack.push(name.to_string());
        }

        while let Some(name) = stack.pop() {
            if !closure.insert(name.clone()) {
                continue;
            }
            stack.extend(self.dependencies_of(&name).iter().cloned());
        }

        Ok(closure)
    }
}
