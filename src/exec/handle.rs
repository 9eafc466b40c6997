// src/exec/handle.rs

//! Opaque job handles and the `.pids` handle file.
//!
//! A handle is whatever a backend needs to find its work again: an OS pid
//! for local jobs, a batch job id for queue jobs. The handle file holds one
//! per line, and its mere existence marks the instance as submitted.

use std::fmt;
use std::path::Path;

use anyhow::Context;

use crate::errors::Result;
use crate::fs::FileSystem;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobHandle(String);

impl JobHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u32> for JobHandle {
    fn from(pid: u32) -> Self {
        Self(pid.to_string())
    }
}

/// Read a handle file. `Ok(None)` means the instance was never submitted.
pub fn read_handle_file(fs: &dyn FileSystem, path: &Path) -> Result<Option<Vec<JobHandle>>> {
    if !fs.exists(path) {
        return Ok(None);
    }
    let contents = fs.read_to_string(path)?;
    let handles = contents
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(JobHandle::new)
        .collect();
    Ok(Some(handles))
}

/// Persist handles. Failing here is fatal for the run: without the file a
/// restart could submit the same instance twice.
pub fn write_handle_file(fs: &dyn FileSystem, path: &Path, handles: &[JobHandle]) -> Result<()> {
    let mut contents = String::new();
    for handle in handles {
        contents.push_str(handle.as_str());
        contents.push('\n');
    }
    fs.write(path, contents.as_bytes())
        .with_context(|| format!("recording job handles in {:?}", path))?;
    Ok(())
}
