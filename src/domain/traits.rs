// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The two places where behaviour is meant to be swapped:
//
//   TrajectoryStrategy — how a sequence's initial void and its
//                        per-stage increments are sampled, and
//                        how increments accumulate over stages.
//                        Implemented in data::trajectory.
//
//   Solver             — how one scenario script is executed.
//                        Implemented by harness::solver as an
//                        isolated subprocess per job.

use rand::rngs::StdRng;
use std::path::{Path, PathBuf};

use crate::domain::error::ExecutionError;
use crate::domain::geometry::TrajectoryBounds;
use crate::domain::job::JobId;

// ─── SequencePlan ─────────────────────────────────────────────────────────────
/// Everything sampled once per sequence. Every stage of the
/// sequence is derived from the same plan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SequencePlan {
    pub center_x:         f64,
    pub center_y:         f64,
    pub initial_depth:    f64,
    pub initial_radius_x: f64,
    pub initial_radius_y: f64,
    pub initial_height:   f64,
    /// Upward movement per unit of rise weight
    pub rise:             f64,
    /// Radius growth per unit of growth weight
    pub growth:           f64,
    pub height_growth:    f64,
}

// ─── TrajectoryStrategy ───────────────────────────────────────────────────────
/// Pluggable sampling distribution and stage schedule.
///
/// Both weight functions must be non-decreasing in `stage`
/// and return 0 for stage 0; the trajectory model relies on
/// that for its monotonicity guarantee.
pub trait TrajectoryStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Sample one sequence's plan. `rng` is seeded per sequence.
    fn plan(&self, rng: &mut StdRng, bounds: &TrajectoryBounds) -> SequencePlan;

    /// Accumulated rise steps at `stage`
    fn rise_weight(&self, stage: u32, stage_count: u32) -> f64;

    /// Accumulated growth steps at `stage`
    fn growth_weight(&self, stage: u32, stage_count: u32) -> f64;
}

// ─── Solver ───────────────────────────────────────────────────────────────────
/// Executes one scenario script to completion.
///
/// Implementations must be safe to call from several worker
/// threads at once; each call owns its own job.
pub trait Solver: Send + Sync {
    /// Where the result of `job` is expected, if any
    fn expected_output(&self, job: &JobId) -> Option<PathBuf>;

    /// Run the solver on `script_path`. Returns the output path
    /// on success (None when no output file is expected).
    fn run(&self, job: &JobId, script_path: &Path) -> Result<Option<PathBuf>, ExecutionError>;
}
