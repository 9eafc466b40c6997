// src/config/params.rs

//! Per-job `\CMDOPTS.n` overrides.
//!
//! File format, one job per line:
//!
//! ```text
//! #job       opt0  opt1
//! assemble   --careful  -k21,33,55
//! ```
//!
//! Inline form: `assemble:--careful:-k21,qc:--quiet`. An override replaces
//! the job's default `cmd_opts` entirely.

use std::collections::HashMap;
use std::path::Path;

use crate::config::model::WorkflowSpec;
use crate::config::samples::{parse_inline_records, parse_records};
use crate::errors::{Result, WorkflowError};
use crate::fs::FileSystem;

pub type CmdOpts = HashMap<String, Vec<String>>;

pub fn load_parameter_file(fs: &dyn FileSystem, path: &Path) -> Result<CmdOpts> {
    let contents = fs
        .read_to_string(path)
        .map_err(|e| WorkflowError::ConfigError(format!("cannot open {:?}: {e:#}", path)))?;
    Ok(parse_records(&contents).into_iter().collect())
}

pub fn parse_parameter_names(spec: &str) -> CmdOpts {
    parse_inline_records(spec).into_iter().collect()
}

/// Reject overrides for jobs the workflow does not declare.
pub fn check_known_jobs(opts: &CmdOpts, spec: &WorkflowSpec) -> Result<()> {
    for job in opts.keys() {
        if spec.job(job).is_none() {
            return Err(WorkflowError::JobNotFound(format!(
                "parameter override for unknown job '{job}'"
            )));
        }
    }
    Ok(())
}
