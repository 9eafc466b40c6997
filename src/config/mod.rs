// src/config/mod.rs

//! Workflow, sample and parameter loading for ngwf.
//!
//! Responsibilities:
//! - Define the TOML-backed workflow model (`model.rs`).
//! - Load a workflow file from disk (`loader.rs`).
//! - Validate references, capacity and acyclicity (`validate.rs`).
//! - Read the sample list and per-job option overrides (`samples.rs`,
//!   `params.rs`).

pub mod loader;
pub mod model;
pub mod params;
pub mod samples;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, parse_and_validate};
pub use model::{
    ConfigSection, ExecutionSpec, JobSpec, RawExecution, RawJob, RawWorkflowFile, WorkflowSpec,
};
pub use params::CmdOpts;
pub use samples::Sample;
