// tests/queue_backend.rs

use std::path::PathBuf;
use std::time::Duration;

use ngwf::exec::backend::fold_liveness;
use ngwf::exec::queue::parse_submit_output;
use ngwf::exec::status::{parse_pbs_text, parse_sge_xml};
use ngwf::exec::{
    ExecutionBackend, JobHandle, Liveness, QueueBackend, QueueSnapshot, StatusPoller,
    SubmitRequest,
};
use ngwf_test_utils::builders::{ExecutionBuilder, JobBuilder, WorkflowBuilder};
use ngwf_test_utils::fake_backend::FakeStatusSource;

const SGE_XML: &str = r#"<?xml version='1.0'?>
<job_info  xmlns:xsd="http://arc.liv.ac.uk/repos/darcs/sge/source/dist/util/resources/schemas/qstat/qstat.xsd">
  <queue_info>
    <Queue-List>
      <name>all.q@node01</name>
      <job_list state="running">
        <JB_job_number>4242</JB_job_number>
        <JB_name>align</JB_name>
      </job_list>
    </Queue-List>
  </queue_info>
  <job_info>
    <job_list state="pending">
      <JB_job_number> 4243 </JB_job_number>
      <JB_name>call</JB_name>
    </job_list>
  </job_info>
</job_info>
"#;

const PBS_TEXT: &str = "\
Job id            Name             User              Time Use S Queue
----------------  ---------------- ----------------  -------- - -----
1201.headnode     align            ola               00:01:02 R batch
1202.headnode     call             ola                      0 Q batch
";

fn grid_backend() -> QueueBackend {
    let spec = WorkflowBuilder::new()
        .with_execution(ExecutionBuilder::queue("grid", 8, 2))
        .with_job(JobBuilder::new("align", "grid"))
        .build();
    let exec = spec.execution("grid").cloned().unwrap();
    QueueBackend::new(exec, Duration::from_secs(5))
}

fn ids(items: &[&str]) -> std::collections::HashSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_parse_sge_xml_collects_running_and_pending_jobs() {
    assert_eq!(parse_sge_xml(SGE_XML), ids(&["4242", "4243"]));
    assert!(parse_sge_xml("<job_info></job_info>").is_empty());
}

#[test]
fn test_parse_pbs_text_skips_header_rows() {
    assert_eq!(parse_pbs_text(PBS_TEXT), ids(&["1201", "1202"]));
    assert!(parse_pbs_text("").is_empty());
}

#[test]
fn test_submit_output_yields_first_number() {
    assert_eq!(
        parse_submit_output("Your job 4242 (\"align\") has been submitted"),
        Some(JobHandle::new("4242"))
    );
    assert_eq!(parse_submit_output("1201.headnode\n"), Some(JobHandle::new("1201")));
    assert_eq!(parse_submit_output("qsub: submit error"), None);
}

#[test]
fn test_snapshot_lookup() {
    let snapshot = QueueSnapshot::from_ids(["1", "2"]);
    assert_eq!(snapshot.contains(&JobHandle::new("1")), Some(true));
    assert_eq!(snapshot.contains(&JobHandle::new("3")), Some(false));
    assert_eq!(snapshot.len(), 2);
    assert!(snapshot.is_available());

    assert_eq!(QueueSnapshot::Unavailable.contains(&JobHandle::new("1")), None);
    assert!(QueueSnapshot::empty().is_empty());
}

#[test]
fn test_liveness_fold() {
    use Liveness::*;
    assert_eq!(fold_liveness([Finished, Alive, Unknown]), Alive);
    assert_eq!(fold_liveness([Finished, Unknown]), Unknown);
    assert_eq!(fold_liveness([Finished, Finished]), Finished);
}

#[test]
fn test_queue_probe_reads_snapshot() {
    let mut backend = grid_backend();
    let handles = vec![JobHandle::new("10"), JobHandle::new("11")];

    let running = QueueSnapshot::from_ids(["11"]);
    assert_eq!(backend.probe(&handles, &running), Liveness::Alive);

    let gone = QueueSnapshot::from_ids(["99"]);
    assert_eq!(backend.probe(&handles, &gone), Liveness::Finished);

    assert_eq!(
        backend.probe(&handles, &QueueSnapshot::Unavailable),
        Liveness::Unknown
    );
}

#[test]
fn test_submit_args_name_and_redirect_each_copy() {
    let backend = grid_backend();
    let req = SubmitRequest {
        job: "align".into(),
        sample: "S1".into(),
        script: PathBuf::from("/work/WF-sh/align.S1.sh"),
        no_parallel: 2,
    };

    assert_eq!(
        backend.submit_args(&req, 1),
        vec![
            "-N",
            "align",
            "-e",
            "/work/WF-sh/align.S1.sh.1.stderr",
            "-o",
            "/work/WF-sh/align.S1.sh.1.stdout",
            "/work/WF-sh/align.S1.sh",
        ]
    );
}

#[cfg(unix)]
#[tokio::test]
async fn test_submit_runs_submit_command_once_per_copy() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let fake_qsub = dir.path().join("fake_qsub");
    std::fs::write(&fake_qsub, "#!/bin/sh\necho \"Your job $$ has been submitted\"\n").unwrap();
    std::fs::set_permissions(&fake_qsub, std::fs::Permissions::from_mode(0o755)).unwrap();

    let spec = WorkflowBuilder::new()
        .with_execution(ExecutionBuilder::queue("grid", 8, 2))
        .with_job(JobBuilder::new("align", "grid"))
        .build();
    let mut exec = spec.execution("grid").cloned().unwrap();
    exec.submit_command = fake_qsub.display().to_string();
    let mut backend = QueueBackend::new(exec, Duration::from_secs(5));

    let req = SubmitRequest {
        job: "align".into(),
        sample: "S1".into(),
        script: dir.path().join("align.S1.sh"),
        no_parallel: 3,
    };
    let outcome = ngwf_test_utils::with_timeout(backend.submit(&req)).await;

    assert!(outcome.failure.is_none(), "{:?}", outcome.failure);
    assert_eq!(outcome.handles.len(), 3);
    assert!(outcome
        .handles
        .iter()
        .all(|h| h.as_str().chars().all(|c| c.is_ascii_digit())));
}

#[cfg(unix)]
#[tokio::test]
async fn test_failing_submit_command_reports_failure() {
    let spec = WorkflowBuilder::new()
        .with_execution(ExecutionBuilder::queue("grid", 8, 2))
        .with_job(JobBuilder::new("align", "grid"))
        .build();
    let mut exec = spec.execution("grid").cloned().unwrap();
    exec.submit_command = "false".to_string();
    let mut backend = QueueBackend::new(exec, Duration::from_secs(5));

    let req = SubmitRequest {
        job: "align".into(),
        sample: "S1".into(),
        script: PathBuf::from("/nonexistent/align.S1.sh"),
        no_parallel: 1,
    };
    let outcome = ngwf_test_utils::with_timeout(backend.submit(&req)).await;

    assert!(outcome.handles.is_empty());
    assert!(outcome.failure.unwrap().contains("exited with"));
}

#[tokio::test]
async fn test_poller_tolerates_failures_within_budget() {
    let source = FakeStatusSource::new();
    source.push_err("timed out");
    source.push_err("timed out");
    source.push_ok(&["7"]);
    let mut poller = StatusPoller::new(Box::new(source.clone()), 2);

    assert_eq!(poller.poll().await.unwrap(), QueueSnapshot::Unavailable);
    assert_eq!(poller.poll().await.unwrap(), QueueSnapshot::Unavailable);
    assert_eq!(poller.consecutive_failures(), 2);
    assert_eq!(poller.poll().await.unwrap(), QueueSnapshot::from_ids(["7"]));
    assert_eq!(poller.consecutive_failures(), 0);
}
