// src/config/samples.rs

//! Sample list loading.
//!
//! A sample file has one sample per line, whitespace separated:
//!
//! ```text
//! #sample   reads_1            reads_2
//! S1        /data/S1_R1.fq.gz  /data/S1_R2.fq.gz
//! S2        /data/S2_R1.fq.gz  /data/S2_R2.fq.gz
//! ```
//!
//! The same list can be given inline as `S1:r1:r2,S2:r1:r2`.

use std::path::Path;

use tracing::{debug, info};

use crate::errors::{Result, WorkflowError};
use crate::fs::{FileSystem, WorkLayout};

/// One sample: its id (also its directory name) and its data fields, which
/// are substituted for `\DATA.n` in command templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    pub id: String,
    pub data: Vec<String>,
}

impl Sample {
    pub fn new(id: impl Into<String>, data: Vec<String>) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }
}

/// Parse whitespace-delimited records, skipping comments and lines that do
/// not start with a word character. Shared with the parameter file format.
pub(crate) fn parse_records(contents: &str) -> Vec<(String, Vec<String>)> {
    contents
        .lines()
        .filter(|line| {
            line.chars()
                .next()
                .is_some_and(|c| c.is_alphanumeric() || c == '_')
        })
        .filter_map(|line| {
            let mut fields = line.split_whitespace().map(str::to_string);
            let id = fields.next()?;
            Some((id, fields.collect()))
        })
        .collect()
}

/// Parse `id:field:field,id:field` records. Shared with `-T`.
pub(crate) fn parse_inline_records(spec: &str) -> Vec<(String, Vec<String>)> {
    spec.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|record| {
            let mut fields = record.split(':').map(str::to_string);
            let id = fields.next().filter(|id| !id.is_empty())?;
            Some((id, fields.collect()))
        })
        .collect()
}

pub fn load_sample_file(fs: &dyn FileSystem, path: &Path) -> Result<Vec<Sample>> {
    let contents = fs
        .read_to_string(path)
        .map_err(|e| WorkflowError::SampleError(format!("cannot open {:?}: {e:#}", path)))?;
    let samples = into_samples(parse_records(&contents))?;
    debug!(path = ?path, count = samples.len(), "loaded sample file");
    Ok(samples)
}

pub fn parse_sample_names(spec: &str) -> Result<Vec<Sample>> {
    into_samples(parse_inline_records(spec))
}

fn into_samples(records: Vec<(String, Vec<String>)>) -> Result<Vec<Sample>> {
    let mut samples: Vec<Sample> = Vec::with_capacity(records.len());
    for (id, data) in records {
        if samples.iter().any(|s| s.id == id) {
            return Err(WorkflowError::SampleError(format!(
                "sample '{id}' is listed more than once"
            )));
        }
        samples.push(Sample::new(id, data));
    }

    if samples.is_empty() {
        return Err(WorkflowError::SampleError("no input sample".to_string()));
    }
    Ok(samples)
}

/// Make sure every sample has a directory under the work root.
///
/// An existing non-directory with a sample's name is fatal.
pub fn ensure_sample_dirs(
    fs: &dyn FileSystem,
    layout: &WorkLayout,
    samples: &[Sample],
) -> Result<()> {
    for sample in samples {
        let dir = layout.sample_dir(&sample.id);
        if fs.exists(&dir) {
            if !fs.is_dir(&dir) {
                return Err(WorkflowError::SampleError(format!(
                    "file exists: {:?} (sample directories must be directories)",
                    dir
                )));
            }
            continue;
        }

        fs.create_dir_all(&dir)
            .map_err(|e| WorkflowError::SampleError(format!("can not mkdir {:?}: {e:#}", dir)))?;
        info!(sample = %sample.id, dir = ?dir, "created sample directory");
    }
    Ok(())
}
