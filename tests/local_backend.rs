// tests/local_backend.rs

#![cfg(unix)]

use std::path::Path;
use std::time::Duration;

use ngwf::config::ExecutionSpec;
use ngwf::exec::{ExecutionBackend, JobHandle, Liveness, LocalBackend, QueueSnapshot, SubmitRequest};
use ngwf::fs::WorkLayout;
use ngwf_test_utils::builders::{ExecutionBuilder, JobBuilder, WorkflowBuilder};
use ngwf_test_utils::with_timeout;

fn local_spec() -> ExecutionSpec {
    let spec = WorkflowBuilder::new()
        .with_execution(ExecutionBuilder::local("local", 4))
        .with_job(JobBuilder::new("x", "local"))
        .build();
    spec.execution("local").cloned().unwrap()
}

fn write_script(dir: &Path, body: &str) -> std::path::PathBuf {
    let script = dir.join("job.S1.sh");
    std::fs::write(&script, format!("#!/bin/bash\n{body}\n")).unwrap();
    script
}

async fn wait_until_finished(backend: &mut LocalBackend, handles: &[JobHandle]) {
    let snapshot = QueueSnapshot::empty();
    loop {
        if backend.probe(handles, &snapshot) == Liveness::Finished {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn test_local_submit_runs_every_copy_with_own_output_files() {
    ngwf_test_utils::init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), "echo hello from $$\necho oops >&2");
    let mut backend = LocalBackend::new(local_spec());

    let req = SubmitRequest {
        job: "job".into(),
        sample: "S1".into(),
        script: script.clone(),
        no_parallel: 2,
    };
    let outcome = backend.submit(&req).await;
    assert!(outcome.failure.is_none(), "{:?}", outcome.failure);
    assert_eq!(outcome.handles.len(), 2);

    with_timeout(wait_until_finished(&mut backend, &outcome.handles)).await;

    for index in 0..2 {
        let stdout = std::fs::read_to_string(WorkLayout::stdout_file(&script, index)).unwrap();
        assert!(stdout.starts_with("hello from "));
        let stderr = std::fs::read_to_string(WorkLayout::stderr_file(&script, index)).unwrap();
        assert_eq!(stderr, "oops\n");
    }
}

#[tokio::test]
async fn test_running_child_is_alive() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), "sleep 0.3");
    let mut backend = LocalBackend::new(local_spec());

    let req = SubmitRequest {
        job: "job".into(),
        sample: "S1".into(),
        script,
        no_parallel: 1,
    };
    let outcome = backend.submit(&req).await;
    assert_eq!(
        backend.probe(&outcome.handles, &QueueSnapshot::empty()),
        Liveness::Alive
    );

    with_timeout(wait_until_finished(&mut backend, &outcome.handles)).await;
}

#[tokio::test]
async fn test_reaped_copies_stay_finished() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), "exit 0");
    let mut backend = LocalBackend::new(local_spec());

    let req = SubmitRequest {
        job: "job".into(),
        sample: "S1".into(),
        script,
        no_parallel: 2,
    };
    let outcome = backend.submit(&req).await;
    assert_eq!(outcome.handles.len(), 2);
    with_timeout(wait_until_finished(&mut backend, &outcome.handles)).await;

    // Each copy is answered from the reaped set, not by signalling its pid.
    let snapshot = QueueSnapshot::empty();
    for handle in &outcome.handles {
        assert!(backend.has_reaped(handle));
        assert_eq!(
            backend.probe(std::slice::from_ref(handle), &snapshot),
            Liveness::Finished
        );
    }
}

#[tokio::test]
async fn test_missing_output_directory_fails_submission() {
    let mut backend = LocalBackend::new(local_spec());
    let req = SubmitRequest {
        job: "job".into(),
        sample: "S1".into(),
        script: "/nonexistent/dir/job.S1.sh".into(),
        no_parallel: 1,
    };

    let outcome = backend.submit(&req).await;
    assert!(outcome.handles.is_empty());
    assert!(outcome.failure.is_some());
}

#[test]
fn test_foreign_pids_are_probed_by_signal() {
    let mut backend = LocalBackend::new(local_spec());
    let snapshot = QueueSnapshot::empty();

    let me = JobHandle::from(std::process::id());
    assert_eq!(backend.probe(&[me], &snapshot), Liveness::Alive);

    let mut child = std::process::Command::new("true").spawn().unwrap();
    let pid = child.id();
    child.wait().unwrap();
    assert_eq!(
        backend.probe(&[JobHandle::from(pid)], &snapshot),
        Liveness::Finished
    );

    assert_eq!(
        backend.probe(&[JobHandle::new("not-a-pid")], &snapshot),
        Liveness::Finished
    );
}
