// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Unknown execution type '{kind}' for execution '{execution}'")]
    UnknownExecutionType { execution: String, kind: String },

    #[error("Not enough cores: {0}")]
    InsufficientCores(String),

    #[error("Not enough nodes: {0}")]
    InsufficientNodes(String),

    #[error("Cycle detected in job graph: {0}")]
    DagCycle(String),

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Sample error: {0}")]
    SampleError(String),

    #[error("Batch status query failed {attempts} times in a row: {reason}")]
    StatusQuery { attempts: u32, reason: String },

    #[error("Workflow stalled: {0}")]
    Stalled(String),

    #[error("Interrupted before all jobs completed")]
    Interrupted,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, WorkflowError>;
