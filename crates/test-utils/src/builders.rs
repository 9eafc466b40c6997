#![allow(dead_code)]

use std::path::Path;

use ngwf::config::samples::Sample;
use ngwf::config::{ConfigSection, RawExecution, RawJob, RawWorkflowFile, WorkflowSpec};
use ngwf::errors::Result;
use ngwf::fs::{FileSystem, WorkLayout};

/// Builder for `WorkflowSpec` to simplify test setup.
pub struct WorkflowBuilder {
    raw: RawWorkflowFile,
}

impl WorkflowBuilder {
    pub fn new() -> Self {
        Self {
            raw: RawWorkflowFile {
                config: ConfigSection::default(),
                execution: Vec::new(),
                job: Vec::new(),
            },
        }
    }

    pub fn with_execution(mut self, exec: ExecutionBuilder) -> Self {
        self.raw.execution.push(exec.build());
        self
    }

    pub fn with_job(mut self, job: JobBuilder) -> Self {
        self.raw.job.push(job.build());
        self
    }

    pub fn with_config(mut self, f: impl FnOnce(&mut ConfigSection)) -> Self {
        f(&mut self.raw.config);
        self
    }

    pub fn build_raw(self) -> RawWorkflowFile {
        self.raw
    }

    pub fn try_build(self) -> Result<WorkflowSpec> {
        WorkflowSpec::try_from(self.raw)
    }

    pub fn build(self) -> WorkflowSpec {
        self.try_build()
            .expect("Failed to build valid workflow from builder")
    }
}

impl Default for WorkflowBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `RawExecution`.
pub struct ExecutionBuilder {
    exec: RawExecution,
}

impl ExecutionBuilder {
    pub fn new(id: &str, kind: &str, cores_per_node: u32) -> Self {
        Self {
            exec: RawExecution {
                id: id.to_string(),
                kind: kind.to_string(),
                cores_per_node,
                number_nodes: 1,
                template: "#!/bin/bash".to_string(),
                submit_command: "qsub".to_string(),
                name_opt: "-N".to_string(),
                stdout_opt: "-o".to_string(),
                stderr_opt: "-e".to_string(),
                parallel_env: "orte".to_string(),
            },
        }
    }

    pub fn local(id: &str, cores_per_node: u32) -> Self {
        Self::new(id, "local", cores_per_node)
    }

    pub fn queue(id: &str, cores_per_node: u32, number_nodes: u32) -> Self {
        Self::new(id, "queue", cores_per_node).nodes(number_nodes)
    }

    pub fn shared_node(id: &str, cores_per_node: u32, number_nodes: u32) -> Self {
        Self::new(id, "queue-shared-node", cores_per_node).nodes(number_nodes)
    }

    pub fn nodes(mut self, number_nodes: u32) -> Self {
        self.exec.number_nodes = number_nodes;
        self
    }

    pub fn template(mut self, template: &str) -> Self {
        self.exec.template = template.to_string();
        self
    }

    pub fn build(self) -> RawExecution {
        self.exec
    }
}

/// Builder for `RawJob`.
pub struct JobBuilder {
    job: RawJob,
}

impl JobBuilder {
    pub fn new(id: &str, execution: &str) -> Self {
        Self {
            job: RawJob {
                id: id.to_string(),
                command: r"echo \SELF \SAMPLE".to_string(),
                execution: execution.to_string(),
                cores_per_cmd: 1,
                no_parallel: 1,
                injobs: vec![],
                infiles: vec![],
                non_zero_files: vec![],
                cmd_opts: vec![],
            },
        }
    }

    pub fn command(mut self, command: &str) -> Self {
        self.job.command = command.to_string();
        self
    }

    pub fn cores(mut self, cores_per_cmd: u32) -> Self {
        self.job.cores_per_cmd = cores_per_cmd;
        self
    }

    pub fn parallel(mut self, no_parallel: u32) -> Self {
        self.job.no_parallel = no_parallel;
        self
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.job.injobs.push(dep.to_string());
        self
    }

    pub fn infile(mut self, file: &str) -> Self {
        self.job.infiles.push(file.to_string());
        self
    }

    pub fn non_zero(mut self, file: &str) -> Self {
        self.job.non_zero_files.push(file.to_string());
        self
    }

    pub fn opts(mut self, opts: &[&str]) -> Self {
        self.job.cmd_opts = opts.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn build(self) -> RawJob {
        self.job
    }
}

/// Samples without data fields.
pub fn samples(ids: &[&str]) -> Vec<Sample> {
    ids.iter().map(|id| Sample::new(*id, vec![])).collect()
}

/// Layout rooted at `/work` with the default scripts dir.
pub fn work_layout() -> WorkLayout {
    WorkLayout::new("/work", "WF-sh")
}

/// Write the three marker files a finished script leaves behind.
pub fn write_markers(fs: &dyn FileSystem, layout: &WorkLayout, sample: &str, job: &str) {
    write_file(fs, &layout.start_file(sample, job), "1700000000\n");
    write_file(fs, &layout.complete_file(sample, job), "1700000060\n");
    write_file(
        fs,
        &layout.cpu_file(sample, job),
        &format!("sample={sample} job={job} host=h pid=1 queue=q cores=1 time_start=1700000000 time_end=1700000060 time_spent=60\n"),
    );
}

pub fn write_file(fs: &dyn FileSystem, path: &Path, contents: &str) {
    fs.write(path, contents.as_bytes())
        .expect("mock write should succeed");
}
