use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use ngwf::config::{ExecutionSpec, WorkflowSpec};
use ngwf::exec::backend::{BackendFuture, ExecutionBackend, Liveness, SubmitOutcome, SubmitRequest};
use ngwf::exec::{BackendMap, JobHandle, QueueSnapshot, StatusSource};

#[derive(Debug, Default)]
struct FakeState {
    submissions: Vec<SubmitRequest>,
    alive: HashSet<JobHandle>,
    next_id: u64,
    failures_left: usize,
    unknown: bool,
    auto_finish: bool,
}

/// Test-side view of a [`FakeBackend`]: inspect submissions and decide which
/// handles are still running.
#[derive(Debug, Clone, Default)]
pub struct FakeController {
    state: Arc<Mutex<FakeState>>,
}

impl FakeController {
    pub fn submissions(&self) -> Vec<SubmitRequest> {
        self.state.lock().unwrap().submissions.clone()
    }

    /// `job,sample` of each submission, in order.
    pub fn submitted_keys(&self) -> Vec<String> {
        self.submissions()
            .iter()
            .map(|r| format!("{},{}", r.job, r.sample))
            .collect()
    }

    pub fn alive_count(&self) -> usize {
        self.state.lock().unwrap().alive.len()
    }

    pub fn set_alive(&self, handle: &str) {
        self.state
            .lock()
            .unwrap()
            .alive
            .insert(JobHandle::new(handle));
    }

    /// Every running handle exits.
    pub fn finish_all(&self) {
        self.state.lock().unwrap().alive.clear();
    }

    /// The next `n` submissions start nothing.
    pub fn fail_next(&self, n: usize) {
        self.state.lock().unwrap().failures_left = n;
    }

    /// Handles handed out from now on are already finished when probed.
    pub fn set_auto_finish(&self, auto_finish: bool) {
        self.state.lock().unwrap().auto_finish = auto_finish;
    }

    /// Answer `Unknown` to every probe until reset.
    pub fn set_unknown(&self, unknown: bool) {
        self.state.lock().unwrap().unknown = unknown;
    }
}

/// A fake execution backend that:
/// - records which instances were submitted
/// - hands out synthetic handles that stay alive until the test finishes them.
pub struct FakeBackend {
    spec: ExecutionSpec,
    state: Arc<Mutex<FakeState>>,
}

impl FakeBackend {
    pub fn new(spec: ExecutionSpec) -> (Self, FakeController) {
        let controller = FakeController::default();
        let backend = Self {
            spec,
            state: Arc::clone(&controller.state),
        };
        (backend, controller)
    }
}

impl ExecutionBackend for FakeBackend {
    fn spec(&self) -> &ExecutionSpec {
        &self.spec
    }

    fn submit<'a>(&'a mut self, req: &'a SubmitRequest) -> BackendFuture<'a, SubmitOutcome> {
        let state = Arc::clone(&self.state);
        let prefix = self.spec.id.clone();

        Box::pin(async move {
            let mut guard = state.lock().unwrap();
            if guard.failures_left > 0 {
                guard.failures_left -= 1;
                return SubmitOutcome::failed(vec![], "scripted failure");
            }

            let mut handles = Vec::new();
            for _ in 0..req.no_parallel {
                guard.next_id += 1;
                let handle = JobHandle::new(format!("{prefix}-{}", guard.next_id));
                if !guard.auto_finish {
                    guard.alive.insert(handle.clone());
                }
                handles.push(handle);
            }
            guard.submissions.push(req.clone());
            SubmitOutcome::ok(handles)
        })
    }

    fn probe(&mut self, handles: &[JobHandle], _snapshot: &QueueSnapshot) -> Liveness {
        let guard = self.state.lock().unwrap();
        if guard.unknown {
            return Liveness::Unknown;
        }
        if handles.iter().any(|h| guard.alive.contains(h)) {
            Liveness::Alive
        } else {
            Liveness::Finished
        }
    }
}

/// One fake backend per execution of `spec`.
pub fn fake_backends(spec: &WorkflowSpec) -> (BackendMap, HashMap<String, FakeController>) {
    let mut backends: BackendMap = HashMap::new();
    let mut controllers = HashMap::new();
    for exec in spec.executions() {
        let (backend, controller) = FakeBackend::new(exec.clone());
        backends.insert(exec.id.clone(), Box::new(backend));
        controllers.insert(exec.id.clone(), controller);
    }
    (backends, controllers)
}

/// Scripted batch status source. Each query pops the next answer; once the
/// script runs out every query succeeds with no jobs.
#[derive(Debug, Clone, Default)]
pub struct FakeStatusSource {
    answers: Arc<Mutex<VecDeque<Result<Vec<String>, String>>>>,
    calls: Arc<Mutex<usize>>,
}

impl FakeStatusSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_ok(&self, ids: &[&str]) {
        self.answers
            .lock()
            .unwrap()
            .push_back(Ok(ids.iter().map(|s| s.to_string()).collect()));
    }

    pub fn push_err(&self, reason: &str) {
        self.answers
            .lock()
            .unwrap()
            .push_back(Err(reason.to_string()));
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

impl StatusSource for FakeStatusSource {
    fn query(&mut self) -> BackendFuture<'_, anyhow::Result<HashSet<String>>> {
        let answers = Arc::clone(&self.answers);
        let calls = Arc::clone(&self.calls);
        Box::pin(async move {
            *calls.lock().unwrap() += 1;
            match answers.lock().unwrap().pop_front() {
                Some(Ok(ids)) => Ok(ids.into_iter().collect()),
                Some(Err(reason)) => Err(anyhow::anyhow!(reason)),
                None => Ok(HashSet::new()),
            }
        })
    }
}
