// ============================================================
// Layer 4 — Geometry Trajectory Model
// ============================================================
// Maps (sequence seed, stage, stage count, bounds) to the void
// geometry of that stage.
//
// How a sequence evolves:
//
//   1. Seed a StdRng with the sequence seed and ask the
//      strategy for a SequencePlan (initial void + per-step
//      increments). Same seed → same plan, for every stage.
//
//   2. Ask the strategy how many rise / growth steps have
//      accumulated by this stage (its "weights").
//
//   3. Apply them and clamp:
//        depth  = max(d0 - rise   * w_rise,  min_clearance)
//        radius = min(r0 + growth * w_grow,  radius cap)
//        height = min(h0 + hgrow  * w_grow,  height cap)
//
// Because the weights never decrease and the clamps are
// constants per sequence, depth is non-increasing and both
// radii and the height are non-decreasing across stages.
//
// Example (linear, d0=0.9, rise=0.1, min_clearance=0.65):
//   stage 0 → 0.90
//   stage 1 → 0.80
//   stage 2 → 0.70
//   stage 3 → 0.65   (clamped)

use rand::{rngs::StdRng, SeedableRng};

use crate::domain::config::StrategyKind;
use crate::domain::error::ScenarioError;
use crate::domain::geometry::{TrajectoryBounds, VoidGeometry};
use crate::domain::traits::{SequencePlan, TrajectoryStrategy};

/// Geometry of `stage` within the sequence seeded by `sequence_seed`.
///
/// Deterministic: identical arguments give bit-identical output.
/// Fails with `InvalidStage` when `stage >= stage_count`.
pub fn trajectory(
    sequence_seed: u64,
    stage:         u32,
    stage_count:   u32,
    bounds:        &TrajectoryBounds,
    strategy:      &dyn TrajectoryStrategy,
) -> Result<VoidGeometry, ScenarioError> {
    if stage >= stage_count {
        return Err(ScenarioError::InvalidStage { stage, stage_count });
    }

    // ── Per-sequence plan ─────────────────────────────────────────────────────
    let mut rng = StdRng::seed_from_u64(sequence_seed);
    let plan    = strategy.plan(&mut rng, bounds);

    let height_cap = bounds.height_cap(plan.initial_depth);
    if height_cap <= 0.0 {
        return Err(ScenarioError::GeometryOutOfBounds(format!(
            "initial depth {:.4} m leaves no room for the void above the road bottom",
            plan.initial_depth
        )));
    }

    // ── Accumulated steps for this stage ──────────────────────────────────────
    let w_rise = strategy.rise_weight(stage, stage_count);
    let w_grow = strategy.growth_weight(stage, stage_count);

    let geometry = VoidGeometry {
        depth:    (plan.initial_depth - plan.rise * w_rise).max(bounds.min_clearance),
        radius_x: (plan.initial_radius_x + plan.growth * w_grow).min(bounds.max_radius_x),
        radius_y: (plan.initial_radius_y + plan.growth * w_grow).min(bounds.max_radius_y),
        center_x: plan.center_x,
        center_y: plan.center_y,
        height:   (plan.initial_height + plan.height_growth * w_grow).min(height_cap),
    };

    tracing::trace!(
        "trajectory seed={} stage={}/{}: depth={:.3} rx={:.3} ry={:.3}",
        sequence_seed, stage, stage_count, geometry.depth, geometry.radius_x, geometry.radius_y
    );

    Ok(geometry)
}

/// Build the strategy named in the config
pub fn strategy_for(kind: StrategyKind) -> Box<dyn TrajectoryStrategy> {
    match kind {
        StrategyKind::Linear      => Box::new(LinearStrategy),
        StrategyKind::Progressive => Box::new(ProgressiveStrategy),
    }
}

// ─── Shared sampler ───────────────────────────────────────────────────────────
// Uniform draws from every configured range. The draw ORDER is
// part of the reproducibility contract: changing it changes
// every regenerated dataset.
fn sample_uniform_plan(rng: &mut StdRng, bounds: &TrajectoryBounds) -> SequencePlan {
    SequencePlan {
        center_x:         bounds.center_x_range().sample(rng),
        center_y:         bounds.center_y_range().sample(rng),
        initial_depth:    bounds.depth_range.sample(rng),
        initial_radius_x: bounds.radius_x_range.sample(rng),
        initial_radius_y: bounds.radius_y_range.sample(rng),
        initial_height:   bounds.height_range.sample(rng),
        rise:             bounds.rise_range.sample(rng),
        growth:           bounds.growth_range.sample(rng),
        height_growth:    bounds.height_growth_range.sample(rng),
    }
}

// ─── LinearStrategy ───────────────────────────────────────────────────────────
/// Constant rise and growth increment per stage
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearStrategy;

impl TrajectoryStrategy for LinearStrategy {
    fn name(&self) -> &'static str {
        "linear"
    }

    fn plan(&self, rng: &mut StdRng, bounds: &TrajectoryBounds) -> SequencePlan {
        sample_uniform_plan(rng, bounds)
    }

    fn rise_weight(&self, stage: u32, _stage_count: u32) -> f64 {
        stage as f64
    }

    fn growth_weight(&self, stage: u32, _stage_count: u32) -> f64 {
        stage as f64
    }
}

// ─── ProgressiveStrategy ──────────────────────────────────────────────────────
/// Linear rise, accelerating growth.
///
/// Growth follows progress^1.5 scaled so the final stage has
/// the same total growth as the linear schedule:
///   w_grow(stage) = (stage / (n-1))^1.5 * (n-1)
#[derive(Debug, Clone, Copy, Default)]
pub struct ProgressiveStrategy;

impl TrajectoryStrategy for ProgressiveStrategy {
    fn name(&self) -> &'static str {
        "progressive"
    }

    fn plan(&self, rng: &mut StdRng, bounds: &TrajectoryBounds) -> SequencePlan {
        sample_uniform_plan(rng, bounds)
    }

    fn rise_weight(&self, stage: u32, _stage_count: u32) -> f64 {
        stage as f64
    }

    fn growth_weight(&self, stage: u32, stage_count: u32) -> f64 {
        if stage_count <= 1 {
            return 0.0;
        }
        let span     = (stage_count - 1) as f64;
        let progress = stage as f64 / span;
        progress.powf(1.5) * span
    }
}
