// tests/reports.rs

use ngwf::config::WorkflowSpec;
use ngwf::dag::{InstanceKey, JobTable};
use ngwf::fs::mock::MockFileSystem;
use ngwf::fs::FileSystem;
use ngwf::report::{
    collect_cpu, format_duration, parse_cpu_log, render_cpu_report, render_job_list,
    render_snapshot, write_cpu_reports, JobCpu,
};
use ngwf::types::JobStatus;
use ngwf_test_utils::builders::{
    samples, work_layout, write_file, write_markers, ExecutionBuilder, JobBuilder,
    WorkflowBuilder,
};

fn workflow() -> WorkflowSpec {
    WorkflowBuilder::new()
        .with_execution(ExecutionBuilder::local("local", 8))
        .with_job(JobBuilder::new("qc", "local"))
        .with_job(JobBuilder::new("map", "local").after("qc").cores(2).parallel(2))
        .build()
}

#[test]
fn test_format_duration() {
    assert_eq!(format_duration(0), "0h0m0s");
    assert_eq!(format_duration(59), "0h0m59s");
    assert_eq!(format_duration(3725), "1h2m5s");
    assert_eq!(format_duration(90_000), "25h0m0s");
}

#[test]
fn test_job_list_shows_dependencies_and_levels() {
    let spec = workflow();
    let jobs = vec!["qc".to_string(), "map".to_string()];

    assert_eq!(
        render_job_list(&spec, &jobs),
        "qc\tIn_jobs:[  ]\tJob_level:1\nmap\tIn_jobs:[ qc ]\tJob_level:2\n"
    );
}

#[test]
fn test_snapshot_grid() {
    let spec = workflow();
    let mut table = JobTable::materialize(&spec, &samples(&["S1", "S22"]), &work_layout(), None);
    table.transition(&InstanceKey::new("qc", "S1"), JobStatus::Submitted);
    table.transition(&InstanceKey::new("qc", "S1"), JobStatus::Completed);
    table.transition(&InstanceKey::new("qc", "S22"), JobStatus::Submitted);
    table.transition(&InstanceKey::new("qc", "S22"), JobStatus::Error);
    table.transition(&InstanceKey::new("map", "S1"), JobStatus::Ready);

    let grid = render_snapshot(&table);
    let lines: Vec<&str> = grid.lines().collect();

    assert_eq!(lines[0], "Job status:");
    assert_eq!(lines[1], ".\twait");
    assert_eq!(lines[5], "!\terror");
    assert_eq!(lines[6], "");
    // Job names are bottom-aligned.
    assert_eq!(lines[7], "   \t   m");
    assert_eq!(lines[8], "   \t q a");
    assert_eq!(lines[9], "   \t c p");
    assert_eq!(lines[10], "S1 \t + r");
    assert_eq!(lines[11], "S22\t ! .");
}

#[test]
fn test_parse_cpu_log_sums_every_execution() {
    let log = "\
sample=S1 job=map host=n1 pid=11 queue=q cores=4 time_start=100 time_end=160 time_spent=60
sample=S1 job=map host=n1 pid=12 queue=q cores=2 time_start=100 time_end=130 time_spent=30
";
    assert_eq!(parse_cpu_log(log), 300);
    assert_eq!(parse_cpu_log(""), 0);
}

#[test]
fn test_cpu_report_rows_and_total() {
    let rows = vec![
        JobCpu {
            job: "qc".into(),
            cores: 1,
            start: Some(1000),
            end: Some(1060),
            cpu_secs: 60,
        },
        JobCpu {
            job: "map".into(),
            cores: 4,
            start: Some(1100),
            end: Some(4700),
            cpu_secs: 14_400,
        },
        JobCpu {
            job: "pending".into(),
            cores: 1,
            start: None,
            end: None,
            cpu_secs: 0,
        },
    ];

    let report = render_cpu_report(&rows);
    let lines: Vec<&str> = report.lines().collect();
    assert_eq!(lines[0], "#job_name\tCores\tWall(s)\tWall_time\tCPU(s)\tCPU_time");
    assert_eq!(lines[1], "qc\t1\t60\t0h1m0s\t60\t0h1m0s");
    assert_eq!(lines[2], "map\t4\t3600\t1h0m0s\t14400\t4h0m0s");
    assert_eq!(lines[3], "pending\t1\t0\t0h0m0s\t0\t0h0m0s");
    assert_eq!(lines[4], "total\t-\t3700\t1h1m40s\t14460\t4h1m0s");
}

#[test]
fn test_cpu_reports_are_written_per_sample() {
    let spec = workflow();
    let layout = work_layout();
    let fs = MockFileSystem::new();
    let table = JobTable::materialize(&spec, &samples(&["S1", "S2"]), &layout, None);

    write_markers(&fs, &layout, "S1", "qc");
    write_file(&fs, &layout.start_file("S1", "map"), "1700000100\n");
    write_file(&fs, &layout.complete_file("S1", "map"), "garbage\n");

    let rows = collect_cpu(&table, &spec, "S1", &fs);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].wall_secs(), 60);
    assert_eq!(rows[0].cpu_secs, 60);
    assert_eq!(rows[1].cores, 4);
    assert_eq!(rows[1].end, None);
    assert_eq!(rows[1].wall_secs(), 0);

    write_cpu_reports(&table, &spec, &layout, &fs).unwrap();
    let s1 = fs.read_to_string(&layout.sample_cpu_report("S1")).unwrap();
    assert!(s1.starts_with("#job_name"));
    assert!(s1.contains("qc\t1\t60\t"));
    let s2 = fs.read_to_string(&layout.sample_cpu_report("S2")).unwrap();
    assert!(s2.lines().last().unwrap().starts_with("total\t-\t0\t"));
}
