// src/exec/script.rs

//! Per-instance shell scripts.
//!
//! A script is written once and then left alone, so hand edits survive
//! restarts. It records the start marker (first run only), runs the command,
//! refuses to mark completion if a required output is empty, then writes the
//! completion marker and appends one CPU log line.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::Context;
use tracing::{debug, info};

use crate::config::model::{ExecutionSpec, JobSpec, WorkflowSpec};
use crate::dag::instance::JobInstance;
use crate::dag::table::JobTable;
use crate::errors::{Result, WorkflowError};
use crate::fs::{FileSystem, WorkLayout};
use crate::types::ExecutionType;

/// Single-quote `path` for the shell. Embedded quotes become `'\''`.
pub fn shell_quote(path: &Path) -> String {
    format!("'{}'", path.display().to_string().replace('\'', r"'\''"))
}

/// Render the script text for one instance.
pub fn render_script(
    instance: &JobInstance,
    job: &JobSpec,
    exec: &ExecutionSpec,
    layout: &WorkLayout,
) -> String {
    let sample = instance.sample();
    let job_id = instance.job();
    let mut out = String::new();

    let _ = writeln!(out, "{}", exec.template);
    if exec.kind == ExecutionType::QueueSharedNode {
        let _ = writeln!(out, "#$ -pe {} {}", exec.parallel_env, job.cores_per_cmd);
    }
    out.push('\n');

    let _ = writeln!(out, "my_host=`hostname`");
    let _ = writeln!(out, "my_pid=$$");
    let _ = writeln!(out, "my_core={}", job.cores_per_cmd);
    let _ = writeln!(out, "my_queue={}", exec.id);
    let _ = writeln!(out, "my_time_start=`date +%s`");
    out.push('\n');

    let start = shell_quote(&instance.start_file);
    let _ = writeln!(out, "cd {}", shell_quote(&layout.sample_dir(sample)));
    let _ = writeln!(out, "mkdir -p {job_id}");
    let _ = writeln!(out, "if ! [ -f {start} ]; then date +%s > {start}; fi");
    let _ = writeln!(out, "{}", instance.command);

    for file in job.non_zero_files.iter() {
        let _ = writeln!(
            out,
            "if ! [ -s {job_id}/{file} ]; then echo \"zero size {job_id}/{file}\"; exit; fi"
        );
    }

    let _ = writeln!(out, "date +%s > {}", shell_quote(&instance.complete_file));
    let _ = writeln!(out, "my_time_end=`date +%s`;");
    let _ = writeln!(out, "my_time_spent=$((my_time_end-my_time_start))");
    let _ = writeln!(
        out,
        "echo \"sample={sample} job={job_id} host=$my_host pid=$my_pid queue=$my_queue \
         cores=$my_core time_start=$my_time_start time_end=$my_time_end \
         time_spent=$my_time_spent\" >> {}",
        shell_quote(&instance.cpu_file)
    );
    out
}

/// Write every missing script of the table. Returns how many were written.
///
/// Any write failure aborts: an instance without its script can never run.
pub fn write_scripts(
    table: &JobTable,
    spec: &WorkflowSpec,
    layout: &WorkLayout,
    fs: &dyn FileSystem,
) -> Result<usize> {
    fs.create_dir_all(layout.scripts_dir())
        .with_context(|| format!("creating scripts dir {:?}", layout.scripts_dir()))?;

    let mut written = 0;
    for instance in table.iter() {
        if fs.exists(&instance.script) {
            continue;
        }
        let job = spec
            .job(instance.job())
            .ok_or_else(|| WorkflowError::JobNotFound(instance.job().to_string()))?;
        let exec = spec
            .execution_of(job)
            .ok_or_else(|| WorkflowError::ConfigError(format!("job '{}' has no execution", job.id)))?;

        let text = render_script(instance, job, exec, layout);
        fs.write(&instance.script, text.as_bytes())
            .with_context(|| format!("writing script {:?}", instance.script))?;
        debug!(job = %instance.job(), sample = %instance.sample(), script = ?instance.script, "script written");
        written += 1;
    }

    info!(written, total = table.len(), "job scripts ready");
    Ok(written)
}
