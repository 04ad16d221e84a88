// ============================================================
// Layer 5 — Execution Harness
// ============================================================
// Runs scenario jobs through the external solver, concurrently
// and in isolation, and reports one terminal status per job.
//
//   Vec<JobPlan> ──► pool::Harness ──► solver::SubprocessSolver (one child per job)
//                         │
//                         ├──► progress::ProgressTracker (live counters)
//                         └──► RunSummary
//
// Nothing in this layer knows how a scenario is built; it only
// sees scripts, ids and exit statuses.

pub mod pool;
pub mod progress;
pub mod solver;
