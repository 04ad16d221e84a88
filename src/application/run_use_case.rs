// ============================================================
// Layer 2 — RunUseCase
// ============================================================
// Generates the scenario jobs and runs them through the solver:
//
//   Step 1: Prepare plans (enumerate, snapshot, metadata)
//   Step 2: Restrict to --job selections, if any
//   Step 3: Build the solver and stores      (Layer 5/6)
//   Step 4: Run the worker pool              (Layer 5 - harness)
//             └─ each result appended to run_log.csv
//   Step 5: Write run_summary.json           (Layer 6 - infra)
//
// Job failures are NOT errors here: they are recorded in the
// returned RunSummary. Only configuration problems and I/O on
// the run-level files return Err.

use anyhow::{bail, Context, Result};
use std::{collections::HashSet, num::NonZeroUsize, thread};

use crate::application::generate_use_case::prepare;
use crate::domain::config::SimulationConfig;
use crate::domain::job::{JobId, JobPlan, RunSummary};
use crate::harness::{
    pool::{Harness, HarnessOptions},
    progress::CancelToken,
    solver::SubprocessSolver,
};
use crate::infra::{run_log::RunLog, script_store::ScriptStore};

/// Run-time choices that are not part of the dataset description
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Overrides `solver.workers`; both unset = available CPUs
    pub workers:       Option<usize>,
    pub skip_existing: bool,
    pub max_failures:  Option<usize>,
    /// Run only these jobs (empty = all)
    pub only:          Vec<JobId>,
    /// Raised from outside (Ctrl-C) to stop dispatching new jobs
    pub cancel:        CancelToken,
}

pub struct RunUseCase {
    config:  SimulationConfig,
    options: RunOptions,
}

impl RunUseCase {
    pub fn new(config: SimulationConfig, options: RunOptions) -> Self {
        Self { config, options }
    }

    pub fn execute(&self) -> Result<RunSummary> {
        let cfg = &self.config;

        // ── Step 1 + 2: Plans for this run ────────────────────────────────────
        let plans = select(prepare(cfg)?, &self.options.only)?;

        // ── Step 3: Solver, script store, run log ─────────────────────────────
        let solver  = SubprocessSolver::from_config(&cfg.solver, &cfg.output_dir)?;
        let scripts = ScriptStore::new(&cfg.output_dir)
            .with_context(|| format!("Cannot create output directory '{}'", cfg.output_dir.display()))?;
        let run_log = RunLog::new(&cfg.output_dir)?;

        let workers = self.worker_count();
        let options = HarnessOptions {
            max_attempts:  cfg.solver.max_attempts,
            skip_existing: self.options.skip_existing,
            max_failures:  self.options.max_failures,
        };

        // ── Step 4: Execute ───────────────────────────────────────────────────
        let harness = Harness::new(&solver, &scripts, options).with_cancel(self.options.cancel.clone());
        let summary = harness.run_with(plans, workers, |result, _| {
            if let Err(e) = run_log.log(result) {
                tracing::warn!("Could not append {} to run log: {e:#}", result.job_id);
            }
        });

        // ── Step 5: Final summary ─────────────────────────────────────────────
        RunLog::write_summary(&cfg.output_dir, &summary)?;

        tracing::info!(
            "Run complete: {} succeeded, {} failed, {} skipped",
            summary.succeeded(),
            summary.failed(),
            summary.skipped(),
        );
        Ok(summary)
    }

    fn worker_count(&self) -> usize {
        self.options
            .workers
            .or(self.config.solver.workers)
            .unwrap_or_else(default_workers)
    }
}

/// Number of CPUs the process may use, at least 1
pub fn default_workers() -> usize {
    thread::available_parallelism().map(NonZeroUsize::get).unwrap_or(1)
}

/// Keep only the selected jobs, in plan order.
/// Selecting an id outside the campaign is an error.
fn select(plans: Vec<JobPlan>, only: &[JobId]) -> Result<Vec<JobPlan>> {
    if only.is_empty() {
        return Ok(plans);
    }

    let known: HashSet<JobId> = plans.iter().map(|p| p.id).collect();
    if let Some(missing) = only.iter().find(|id| !known.contains(id)) {
        bail!("Job {missing} is not part of this campaign ({} jobs enumerated)", plans.len());
    }

    let wanted: HashSet<&JobId> = only.iter().collect();
    let selected: Vec<JobPlan> = plans.into_iter().filter(|p| wanted.contains(&p.id)).collect();
    tracing::info!("Restricted run to {} selected jobs", selected.len());
    Ok(selected)
}
