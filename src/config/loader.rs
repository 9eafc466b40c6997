// src/config/loader.rs

use std::fs;
use std::path::Path;

use crate::config::model::{RawWorkflowFile, WorkflowSpec};
use crate::errors::Result;

/// Load a workflow file from a given path and return the raw `RawWorkflowFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation (references, capacity, cycles). Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawWorkflowFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let workflow: RawWorkflowFile = toml::from_str(&contents)?;

    Ok(workflow)
}

/// Load a workflow file from path and run validation.
///
/// - Reads TOML.
/// - Applies defaults (handled by `serde` default functions).
/// - Checks for:
///   - unknown execution types and references,
///   - jobs that can never fit in their execution pool,
///   - cycles in the `injobs` graph,
///   - basic global config sanity.
/// - Computes job levels.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<WorkflowSpec> {
    let raw = load_from_path(&path)?;
    let spec = WorkflowSpec::try_from(raw)?;
    Ok(spec)
}

/// Parse and validate a workflow from an in-memory TOML string.
pub fn parse_and_validate(contents: &str) -> Result<WorkflowSpec> {
    let raw: RawWorkflowFile = toml::from_str(contents)?;
    WorkflowSpec::try_from(raw)
}
