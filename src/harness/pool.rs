// ============================================================
// Layer 5 — Worker Pool
// ============================================================
// Runs a batch of job plans on a bounded pool of workers and
// collects exactly one terminal JobResult per plan.
//
//   ┌──────────────┐  pop   ┌──────────┐  send  ┌────────────┐
//   │ SegQueue     │ ─────► │ worker N │ ─────► │ collector  │ ─► RunSummary
//   │ (plan order) │        └──────────┘        │ (caller's  │
//   └──────────────┘        ... × workers       │  thread)   │
//                                               └────────────┘
//
// Rules:
//   - At most `worker_count` jobs run at the same time.
//   - Dispatch follows enumeration order; results are recorded
//     in COMPLETION order.
//   - A plan whose construction failed becomes Failed without
//     touching the solver.
//   - A solver failure becomes Failed; the batch keeps going.
//   - Two flags stop dispatch. The caller's CancelToken (e.g.
//     raised on Ctrl-C) is never cleared by the harness. The
//     failure budget flag is created fresh for every run; with
//     `max_failures`, the worker that sees the N-th failure
//     raises it. Either way workers stop popping, in-flight
//     jobs finish, and every job still queued is recorded as
//     Skipped.
//
// Only the collector touches the RunSummary, so it needs no
// lock; workers share nothing mutable except the atomics in
// ProgressTracker and the two flags.

use std::{
    sync::Arc,
    thread,
    time::Instant,
};

use crossbeam::{channel, queue::SegQueue};

use crate::domain::error::ExecutionError;
use crate::domain::job::{JobPlan, JobResult, JobStatus, RunSummary};
use crate::domain::traits::Solver;
use crate::harness::progress::{CancelToken, ProgressSnapshot, ProgressTracker, RunPhase};
use crate::infra::script_store::ScriptStore;

/// Behaviour knobs for one run
#[derive(Debug, Clone)]
pub struct HarnessOptions {
    /// Solver attempts per job; 1 = no retry
    pub max_attempts:  u32,
    /// Skip jobs whose expected output already exists
    pub skip_existing: bool,
    /// Stop dispatching after this many failures
    pub max_failures:  Option<usize>,
}

impl Default for HarnessOptions {
    fn default() -> Self {
        Self { max_attempts: 1, skip_existing: false, max_failures: None }
    }
}

pub struct Harness<'a> {
    solver:   &'a dyn Solver,
    scripts:  &'a ScriptStore,
    options:  HarnessOptions,
    progress: Arc<ProgressTracker>,
    cancel:   CancelToken,
}

impl<'a> Harness<'a> {
    pub fn new(solver: &'a dyn Solver, scripts: &'a ScriptStore, options: HarnessOptions) -> Self {
        Self {
            solver,
            scripts,
            options,
            progress: Arc::new(ProgressTracker::new()),
            cancel:   CancelToken::new(),
        }
    }

    /// Stop dispatch when `cancel` is raised, from any thread
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Shared counters, readable from any thread while a run is going
    pub fn progress(&self) -> Arc<ProgressTracker> {
        Arc::clone(&self.progress)
    }

    /// Handle that stops dispatch for this harness when raised
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn run(&self, plans: Vec<JobPlan>, worker_count: usize) -> RunSummary {
        self.run_with(plans, worker_count, |_, _| {})
    }

    /// Run every plan, calling `on_result` on the caller's thread
    /// as each terminal result arrives.
    pub fn run_with<F>(&self, plans: Vec<JobPlan>, worker_count: usize, mut on_result: F) -> RunSummary
    where
        F: FnMut(&JobResult, &ProgressSnapshot),
    {
        let total   = plans.len();
        let workers = worker_count.clamp(1, total.max(1));
        let mut summary = RunSummary::new();
        let budget      = CancelToken::new();

        self.progress.reset(total);
        tracing::info!("Running {} jobs on {} workers", total, workers);

        // ── Step 1: Fill the queue in enumeration order ───────────────────────
        let queue = SegQueue::new();
        for plan in plans {
            queue.push(plan);
        }

        // ── Step 2: Workers pull, collector records ───────────────────────────
        self.progress.set_phase(RunPhase::Dispatching);
        let (tx, rx) = channel::unbounded::<JobResult>();

        thread::scope(|scope| {
            for worker_id in 0..workers {
                let tx    = tx.clone();
                let queue  = &queue;
                let budget = &budget;
                scope.spawn(move || self.worker_loop(worker_id, queue, budget, tx));
            }
            // Collector loop ends once every worker has dropped its sender
            drop(tx);

            for result in rx {
                let snapshot = self.progress.snapshot();
                log_result(&result, &snapshot);
                on_result(&result, &snapshot);
                summary.record(result);
            }
        });

        // ── Step 3: Anything left was never dispatched ────────────────────────
        let mut undispatched = 0usize;
        while let Some(plan) = queue.pop() {
            self.progress.skipped_undispatched();
            let result = JobResult::skipped(plan.id, None);
            on_result(&result, &self.progress.snapshot());
            summary.record(result);
            undispatched += 1;
        }
        if undispatched > 0 {
            tracing::warn!("Run cancelled: {} queued jobs skipped", undispatched);
        }

        self.progress.set_phase(RunPhase::Done);
        tracing::info!("Run finished: {}", self.progress.snapshot());
        summary
    }

    fn worker_loop(
        &self,
        worker_id: usize,
        queue:     &SegQueue<JobPlan>,
        budget:    &CancelToken,
        tx:        channel::Sender<JobResult>,
    ) {
        loop {
            if self.cancel.is_cancelled() || budget.is_cancelled() {
                tracing::debug!("worker {worker_id}: cancelled, not taking more jobs");
                self.progress.set_phase(RunPhase::Draining);
                break;
            }
            let Some(plan) = queue.pop() else { break };
            if queue.is_empty() {
                self.progress.set_phase(RunPhase::Draining);
            }

            self.progress.dispatched();
            tracing::debug!("worker {worker_id}: picked up {}", plan.id);

            let result = self.execute(plan);
            self.progress.finished(&result.status);

            if matches!(result.status, JobStatus::Failed(_)) {
                self.check_failure_budget(budget);
            }
            if tx.send(result).is_err() {
                break;
            }
        }
    }

    fn check_failure_budget(&self, budget: &CancelToken) {
        let Some(limit) = self.options.max_failures else { return };
        let failed = self.progress.failed_count();
        if failed >= limit && !budget.is_cancelled() {
            tracing::warn!("{failed} jobs failed (limit {limit}), cancelling remaining jobs");
            budget.cancel();
            self.progress.set_phase(RunPhase::Draining);
        }
    }

    /// Run one plan to its terminal status. Never panics on
    /// solver or IO failure; every error becomes a Failed result.
    fn execute(&self, plan: JobPlan) -> JobResult {
        let started = Instant::now();
        let id      = plan.id;

        let job = match plan.job {
            Ok(job) => job,
            Err(e)  => return JobResult::failed(id, started.elapsed(), e.to_string()),
        };

        if self.options.skip_existing {
            if let Some(out) = self.solver.expected_output(&id).filter(|p| p.exists()) {
                tracing::debug!("{id}: output exists, skipping");
                return JobResult::skipped(id, Some(out));
            }
        }

        let script_path = match self.scripts.write(&job.script) {
            Ok(p)  => p,
            Err(e) => return JobResult::failed(id, started.elapsed(), ExecutionError::Io(e).to_string()),
        };

        let attempts = self.options.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.solver.run(&id, &script_path) {
                Ok(output) => return JobResult::succeeded(id, started.elapsed(), output),
                Err(e) if attempt < attempts => {
                    tracing::warn!("{id}: attempt {attempt}/{attempts} failed: {e}; retrying");
                    attempt += 1;
                }
                Err(e) => return JobResult::failed(id, started.elapsed(), e.to_string()),
            }
        }
    }
}

fn log_result(result: &JobResult, progress: &ProgressSnapshot) {
    let done  = progress.done();
    let total = progress.total;
    match &result.status {
        JobStatus::Succeeded => tracing::info!(
            "[{done}/{total}] {} succeeded in {:.1}s", result.job_id, result.duration.as_secs_f64()
        ),
        JobStatus::Failed(reason) => tracing::warn!("[{done}/{total}] {} failed: {reason}", result.job_id),
        JobStatus::Skipped => tracing::info!("[{done}/{total}] {} skipped", result.job_id),
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{enumerator::enumerate, trajectory::LinearStrategy};
    use crate::domain::config::SimulationConfig;
    use crate::domain::error::ScenarioError;
    use crate::domain::job::JobId;
    use std::{
        collections::HashSet,
        fs,
        path::{Path, PathBuf},
        sync::{
            atomic::{AtomicUsize, Ordering},
            Barrier, Mutex,
        },
        time::Duration,
    };
    use tempfile::TempDir;

    /// In-process solver: writes `<stem>.out`, fails on request,
    /// and tracks how many calls overlap. Failing calls return
    /// at once; only successful ones sleep for `delay`.
    struct FakeSolver {
        dir:         PathBuf,
        fail:        HashSet<JobId>,
        fail_first:  HashSet<JobId>,
        attempts:    Mutex<Vec<JobId>>,
        in_flight:   AtomicUsize,
        peak:        AtomicUsize,
        delay:       Duration,
        /// Every call waits here before doing anything else
        gate:        Option<Barrier>,
        /// Each call announces its job, then blocks on `release`
        started:     Option<channel::Sender<JobId>>,
        release:     Option<channel::Receiver<()>>,
    }

    impl FakeSolver {
        fn new(dir: &Path) -> Self {
            Self {
                dir:        dir.to_path_buf(),
                fail:       HashSet::new(),
                fail_first: HashSet::new(),
                attempts:   Mutex::new(Vec::new()),
                in_flight:  AtomicUsize::new(0),
                peak:       AtomicUsize::new(0),
                delay:      Duration::ZERO,
                gate:       None,
                started:    None,
                release:    None,
            }
        }

        fn calls(&self) -> Vec<JobId> {
            self.attempts.lock().unwrap().clone()
        }
    }

    impl Solver for FakeSolver {
        fn expected_output(&self, job: &JobId) -> Option<PathBuf> {
            Some(self.dir.join(job.output_file_name()))
        }

        fn run(&self, job: &JobId, script_path: &Path) -> Result<Option<PathBuf>, ExecutionError> {
            assert!(script_path.exists(), "script must be written before the solver runs");
            if let Some(gate) = &self.gate {
                gate.wait();
            }
            if let Some(started) = &self.started {
                let _ = started.send(*job);
            }
            if let Some(release) = &self.release {
                let _ = release.recv();
            }

            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            let first_try = {
                let mut calls = self.attempts.lock().unwrap();
                let first = !calls.contains(job);
                calls.push(*job);
                first
            };

            if self.fail.contains(job) || (first_try && self.fail_first.contains(job)) {
                self.in_flight.fetch_sub(1, Ordering::SeqCst);
                return Err(ExecutionError::NonZeroExit { code: Some(1), log_tail: "boom".into() });
            }
            std::thread::sleep(self.delay);
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            let out = self.dir.join(job.output_file_name());
            fs::write(&out, "result")?;
            Ok(Some(out))
        }
    }

    fn plans(sequences: u32, stages: u32) -> Vec<JobPlan> {
        let mut cfg = SimulationConfig::default();
        cfg.generation.num_sequences       = sequences;
        cfg.generation.stages_per_sequence = stages;
        enumerate(&cfg, &LinearStrategy).unwrap()
    }

    #[test]
    fn test_every_job_gets_exactly_one_result() {
        let dir     = TempDir::new().unwrap();
        let scripts = ScriptStore::new(dir.path()).unwrap();
        let mut solver = FakeSolver::new(dir.path());
        solver.fail = [JobId::new(0, 1), JobId::new(2, 0), JobId::new(3, 2)].into();

        let summary = Harness::new(&solver, &scripts, HarnessOptions::default()).run(plans(4, 3), 3);

        assert_eq!(summary.len(), 12);
        assert_eq!(summary.failed(), 3);
        assert_eq!(summary.succeeded(), 9);

        let ids: HashSet<JobId> = summary.results().iter().map(|r| r.job_id).collect();
        assert_eq!(ids.len(), 12);

        let failed: HashSet<JobId> = summary.failures().map(|(id, _)| *id).collect();
        assert_eq!(failed, solver.fail);
        assert!(summary.failures().all(|(_, reason)| reason.contains("boom")));
    }

    #[test]
    fn test_concurrency_never_exceeds_worker_count() {
        let dir     = TempDir::new().unwrap();
        let scripts = ScriptStore::new(dir.path()).unwrap();
        let mut solver = FakeSolver::new(dir.path());
        solver.delay = Duration::from_millis(20);

        let harness = Harness::new(&solver, &scripts, HarnessOptions::default());
        let summary = harness.run(plans(3, 4), 2);

        assert_eq!(summary.succeeded(), 12);
        assert!(solver.peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(harness.progress().phase(), RunPhase::Done);
    }

    #[test]
    fn test_single_worker_dispatches_in_order() {
        let dir     = TempDir::new().unwrap();
        let scripts = ScriptStore::new(dir.path()).unwrap();
        let solver  = FakeSolver::new(dir.path());

        let summary = Harness::new(&solver, &scripts, HarnessOptions::default()).run(plans(2, 3), 1);

        let order: Vec<JobId> = summary.results().iter().map(|r| r.job_id).collect();
        let mut sorted = order.clone();
        sorted.sort();
        assert_eq!(order, sorted);
    }

    #[test]
    fn test_failed_construction_never_reaches_solver() {
        let dir     = TempDir::new().unwrap();
        let scripts = ScriptStore::new(dir.path()).unwrap();
        let solver  = FakeSolver::new(dir.path());

        let mut batch = plans(1, 2);
        batch[1].job = Err(ScenarioError::InvalidScanRange { start: 1.0, end: 0.5 });

        let summary = Harness::new(&solver, &scripts, HarnessOptions::default()).run(batch, 2);

        assert_eq!(summary.len(), 2);
        assert_eq!(summary.failed(), 1);
        assert_eq!(solver.calls(), vec![JobId::new(0, 0)]);
        assert!(!dir.path().join("seq_0000_stage_01.in").exists());
    }

    #[test]
    fn test_max_failures_skips_remaining_jobs() {
        let dir     = TempDir::new().unwrap();
        let scripts = ScriptStore::new(dir.path()).unwrap();
        let mut solver = FakeSolver::new(dir.path());
        solver.fail = [JobId::new(0, 1)].into();

        let options = HarnessOptions { max_failures: Some(1), ..HarnessOptions::default() };
        let summary = Harness::new(&solver, &scripts, options).run(plans(2, 3), 1);

        // One worker: (0,0) ok, (0,1) fails, the other four are never run
        assert_eq!(summary.len(), 6);
        assert_eq!(summary.succeeded(), 1);
        assert_eq!(summary.failed(), 1);
        assert_eq!(summary.skipped(), 4);
        assert_eq!(solver.calls().len(), 2);
    }

    #[test]
    fn test_max_failures_lets_in_flight_jobs_finish() {
        let dir     = TempDir::new().unwrap();
        let scripts = ScriptStore::new(dir.path()).unwrap();
        let mut solver = FakeSolver::new(dir.path());
        solver.fail  = [JobId::new(0, 0)].into();
        solver.delay = Duration::from_millis(100);
        // The first three jobs are all running before (0,0) fails
        solver.gate  = Some(Barrier::new(3));

        let options = HarnessOptions { max_failures: Some(1), ..HarnessOptions::default() };
        let summary = Harness::new(&solver, &scripts, options).run(plans(3, 3), 3);

        assert_eq!(summary.len(), 9);
        assert_eq!(summary.failed(), 1);
        assert_eq!(summary.succeeded(), 2);
        assert_eq!(summary.skipped(), 6);
        assert_eq!(solver.calls().len(), 3);

        let ok: HashSet<JobId> = summary
            .results()
            .iter()
            .filter(|r| r.status == JobStatus::Succeeded)
            .map(|r| r.job_id)
            .collect();
        assert_eq!(ok, [JobId::new(0, 1), JobId::new(0, 2)].into());
        assert!(dir.path().join("seq_0000_stage_01.out").exists());
        assert!(dir.path().join("seq_0000_stage_02.out").exists());
    }

    #[test]
    fn test_failure_budget_resets_between_runs() {
        let dir     = TempDir::new().unwrap();
        let scripts = ScriptStore::new(dir.path()).unwrap();
        let mut solver = FakeSolver::new(dir.path());
        solver.fail = [JobId::new(0, 0)].into();

        let options = HarnessOptions { max_failures: Some(1), ..HarnessOptions::default() };
        let harness = Harness::new(&solver, &scripts, options);

        let first = harness.run(plans(1, 3), 1);
        assert_eq!((first.succeeded(), first.failed(), first.skipped()), (0, 1, 2));

        let healthy: Vec<JobPlan> = plans(2, 2).into_iter().filter(|p| p.id.sequence_id == 1).collect();
        let second = harness.run(healthy, 1);
        assert_eq!((second.succeeded(), second.failed(), second.skipped()), (2, 0, 0));
        assert!(!harness.cancel_token().is_cancelled());
    }

    #[test]
    fn test_external_cancel_drains_in_flight_job() {
        let dir     = TempDir::new().unwrap();
        let scripts = ScriptStore::new(dir.path()).unwrap();
        let (started_tx, started_rx) = channel::unbounded();
        let (release_tx, release_rx) = channel::unbounded();
        let mut solver = FakeSolver::new(dir.path());
        solver.started = Some(started_tx);
        solver.release = Some(release_rx);

        let harness = Harness::new(&solver, &scripts, HarnessOptions::default());
        let cancel  = harness.cancel_token();

        let summary = thread::scope(|scope| {
            let run = scope.spawn(|| harness.run(plans(1, 4), 1));

            // Cancel while (0,0) is inside the solver, then let it finish
            assert_eq!(started_rx.recv().unwrap(), JobId::new(0, 0));
            cancel.cancel();
            release_tx.send(()).unwrap();

            run.join().unwrap()
        });

        assert_eq!(summary.len(), 4);
        assert_eq!(summary.results()[0].job_id, JobId::new(0, 0));
        assert_eq!(summary.results()[0].status, JobStatus::Succeeded);
        assert_eq!(summary.skipped(), 3);
        assert_eq!(solver.calls(), vec![JobId::new(0, 0)]);
        assert_eq!(harness.progress().phase(), RunPhase::Done);
    }

    #[test]
    fn test_retry_recovers_transient_failure() {
        let dir     = TempDir::new().unwrap();
        let scripts = ScriptStore::new(dir.path()).unwrap();
        let mut solver = FakeSolver::new(dir.path());
        solver.fail_first = [JobId::new(0, 0)].into();

        let options = HarnessOptions { max_attempts: 2, ..HarnessOptions::default() };
        let summary = Harness::new(&solver, &scripts, options).run(plans(1, 2), 1);

        assert_eq!(summary.succeeded(), 2);
        assert_eq!(solver.calls().iter().filter(|id| **id == JobId::new(0, 0)).count(), 2);
    }

    #[test]
    fn test_skip_existing_leaves_finished_jobs_alone() {
        let dir     = TempDir::new().unwrap();
        let scripts = ScriptStore::new(dir.path()).unwrap();
        let solver  = FakeSolver::new(dir.path());
        fs::write(dir.path().join("seq_0000_stage_00.out"), "earlier").unwrap();

        let options = HarnessOptions { skip_existing: true, ..HarnessOptions::default() };
        let summary = Harness::new(&solver, &scripts, options).run(plans(1, 2), 2);

        assert_eq!(summary.skipped(), 1);
        assert_eq!(summary.succeeded(), 1);
        assert_eq!(solver.calls(), vec![JobId::new(0, 1)]);
    }

    #[test]
    fn test_rerun_produces_same_file_names() {
        let dir     = TempDir::new().unwrap();
        let scripts = ScriptStore::new(dir.path()).unwrap();
        let solver  = FakeSolver::new(dir.path());
        let harness = Harness::new(&solver, &scripts, HarnessOptions::default());

        let list = |d: &Path| {
            let mut names: Vec<String> = fs::read_dir(d)
                .unwrap()
                .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
                .collect();
            names.sort();
            names
        };

        harness.run(plans(2, 2), 2);
        let first = list(dir.path());
        harness.run(plans(2, 2), 2);
        assert_eq!(list(dir.path()), first);
        assert_eq!(first.len(), 8); // 4 × (.in + .out)
    }

    #[test]
    fn test_empty_batch_is_empty_summary() {
        let dir     = TempDir::new().unwrap();
        let scripts = ScriptStore::new(dir.path()).unwrap();
        let solver  = FakeSolver::new(dir.path());
        let summary = Harness::new(&solver, &scripts, HarnessOptions::default()).run(Vec::new(), 4);
        assert!(summary.is_empty());
    }

    // ── End-to-end through a real child process ───────────────────────────────
    #[cfg(unix)]
    #[test]
    fn test_subprocess_failures_are_isolated() {
        use crate::domain::config::SolverConfig;
        use crate::harness::solver::SubprocessSolver;

        let dir     = TempDir::new().unwrap();
        let fake    = dir.path().join("fake_solver.sh");
        // Fails every stage 1 job, succeeds otherwise
        fs::write(
            &fake,
            "case \"$1\" in *_stage_01.in) echo crashed >&2; exit 2;; esac\n\
             stem=$(basename \"$1\" .in)\n\
             echo ok > \"$3/$stem.out\"\n",
        )
        .unwrap();

        let cfg = SolverConfig {
            command: vec!["sh".into(), fake.display().to_string()],
            ..SolverConfig::default()
        };
        let out     = dir.path().join("sims");
        let scripts = ScriptStore::new(&out).unwrap();
        let solver  = SubprocessSolver::from_config(&cfg, &out).unwrap();

        let summary = Harness::new(&solver, &scripts, HarnessOptions::default()).run(plans(3, 3), 3);

        assert_eq!(summary.len(), 9);
        assert_eq!(summary.failed(), 3);
        for (id, reason) in summary.failures() {
            assert_eq!(id.stage_id, 1);
            assert!(reason.contains("status 2"), "{reason}");
        }
        assert!(out.join("seq_0002_stage_02.out").exists());
    }
}
