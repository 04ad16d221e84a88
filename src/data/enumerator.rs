// ============================================================
// Layer 4 — Job Enumerator
// ============================================================
// Expands (num_sequences × stages_per_sequence) into a flat,
// ordered list of job plans:
//
//   for sequence in 0..num_sequences        ← outer (major)
//     for stage in 0..stages_per_sequence   ← inner (minor)
//       trajectory()  → VoidGeometry
//       build()       → ScenarioScript
//
// Example: 2 sequences × 3 stages →
//   (0,0) (0,1) (0,2) (1,0) (1,1) (1,2)
//
// Only configuration problems abort enumeration. A geometry or
// script error for one slot is kept inside that slot's JobPlan
// and becomes a Failed result in the harness.

use crate::data::{script_builder, trajectory::trajectory};
use crate::domain::config::SimulationConfig;
use crate::domain::error::ScenarioError;
use crate::domain::geometry::TrajectoryBounds;
use crate::domain::job::{JobId, JobPlan, ScenarioJob};
use crate::domain::traits::TrajectoryStrategy;

/// Expand the config into one JobPlan per (sequence, stage)
pub fn enumerate(
    config:   &SimulationConfig,
    strategy: &dyn TrajectoryStrategy,
) -> Result<Vec<JobPlan>, ScenarioError> {
    config.validate()?;
    let bounds = TrajectoryBounds::from_config(&config.void, &config.domain)?;

    let generation = &config.generation;
    let mut plans  = Vec::with_capacity(config.job_count());

    for sequence_id in 0..generation.num_sequences {
        let seed = generation.sequence_seed(sequence_id);

        for stage_id in 0..generation.stages_per_sequence {
            let id  = JobId::new(sequence_id, stage_id);
            let job = build_job(config, &bounds, strategy, seed, id);

            if let Err(e) = &job {
                tracing::warn!("{id}: scenario construction failed: {e}");
            }
            plans.push(JobPlan { id, job });
        }
    }

    tracing::info!(
        "Enumerated {} jobs ({} sequences × {} stages, strategy={})",
        plans.len(),
        generation.num_sequences,
        generation.stages_per_sequence,
        strategy.name(),
    );
    Ok(plans)
}

fn build_job(
    config:   &SimulationConfig,
    bounds:   &TrajectoryBounds,
    strategy: &dyn TrajectoryStrategy,
    seed:     u64,
    id:       JobId,
) -> Result<ScenarioJob, ScenarioError> {
    let geometry = trajectory(seed, id.stage_id, config.generation.stages_per_sequence, bounds, strategy)?;
    let script   = script_builder::build(&geometry, &config.domain, &config.gpr, &config.materials, &id)?;

    Ok(ScenarioJob {
        id,
        geometry,
        domain: config.domain.clone(),
        gpr:    config.gpr.clone(),
        script,
    })
}
