// src/fs/layout.rs

//! On-disk layout of a workflow run.
//!
//! ```text
//! <root>/<sample>/<job>/WF.start.date      epoch seconds, written by the script
//! <root>/<sample>/<job>/WF.complete.date   epoch seconds, written by the script
//! <root>/<sample>/<job>/WF.cpu             one line appended per execution
//! <root>/<scripts>/<job>.<sample>.sh       rendered script
//! <root>/<scripts>/<job>.<sample>.sh.pids  one handle per line
//! ```

use std::path::{Path, PathBuf};

pub const START_MARKER: &str = "WF.start.date";
pub const COMPLETE_MARKER: &str = "WF.complete.date";
pub const CPU_LOG: &str = "WF.cpu";
pub const HANDLE_SUFFIX: &str = "pids";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkLayout {
    root: PathBuf,
    scripts_dir: PathBuf,
}

impl WorkLayout {
    /// `root` should already be absolute; scripts use it verbatim.
    pub fn new(root: impl Into<PathBuf>, scripts_dir: impl AsRef<Path>) -> Self {
        let root = root.into();
        let scripts_dir = root.join(scripts_dir);
        Self { root, scripts_dir }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn scripts_dir(&self) -> &Path {
        &self.scripts_dir
    }

    pub fn sample_dir(&self, sample: &str) -> PathBuf {
        self.root.join(sample)
    }

    pub fn instance_dir(&self, sample: &str, job: &str) -> PathBuf {
        self.sample_dir(sample).join(job)
    }

    pub fn start_file(&self, sample: &str, job: &str) -> PathBuf {
        self.instance_dir(sample, job).join(START_MARKER)
    }

    pub fn complete_file(&self, sample: &str, job: &str) -> PathBuf {
        self.instance_dir(sample, job).join(COMPLETE_MARKER)
    }

    pub fn cpu_file(&self, sample: &str, job: &str) -> PathBuf {
        self.instance_dir(sample, job).join(CPU_LOG)
    }

    /// Per-sample CPU summary written by the `log-cpu` task.
    pub fn sample_cpu_report(&self, sample: &str) -> PathBuf {
        self.sample_dir(sample).join(CPU_LOG)
    }

    pub fn script_file(&self, job: &str, sample: &str) -> PathBuf {
        self.scripts_dir.join(format!("{job}.{sample}.sh"))
    }

    /// Paths of a script's derived files (`<script>.<suffix>`).
    pub fn handle_file(script: &Path) -> PathBuf {
        with_suffix(script, HANDLE_SUFFIX)
    }

    pub fn stdout_file(script: &Path, index: u32) -> PathBuf {
        with_suffix(script, &format!("{index}.stdout"))
    }

    pub fn stderr_file(script: &Path, index: u32) -> PathBuf {
        with_suffix(script, &format!("{index}.stderr"))
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut s = path.as_os_str().to_owned();
    s.push(".");
    s.push(suffix);
    PathBuf::from(s)
}
