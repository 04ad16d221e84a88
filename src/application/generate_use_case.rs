// ============================================================
// Layer 2 — GenerateUseCase
// ============================================================
// Builds the whole scenario dataset WITHOUT running the solver:
//
//   Step 1: Validate and enumerate jobs   (Layer 4 - data)
//   Step 2: Snapshot the resolved config  (Layer 6 - infra)
//   Step 3: Write metadata.yaml           (Layer 6 - infra)
//   Step 4: Write one .in script per job  (Layer 6 - infra)
//
// Steps 1-3 are shared with RunUseCase through `prepare`.

use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::data::{enumerator::enumerate, trajectory::strategy_for};
use crate::domain::config::SimulationConfig;
use crate::domain::job::{JobId, JobPlan};
use crate::infra::{config_store::ConfigStore, metadata::write_metadata, script_store::ScriptStore};

/// What a generate run produced
#[derive(Debug, Clone)]
pub struct GenerateReport {
    pub output_dir: PathBuf,
    pub written:    Vec<PathBuf>,
    /// Jobs whose scenario could not be built, with the reason
    pub failed:     Vec<(JobId, String)>,
}

pub struct GenerateUseCase {
    config: SimulationConfig,
}

impl GenerateUseCase {
    pub fn new(config: SimulationConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<GenerateReport> {
        let cfg   = &self.config;
        let plans = prepare(cfg)?;

        // ── Step 4: Write every buildable script ──────────────────────────────
        let store = ScriptStore::new(&cfg.output_dir)
            .with_context(|| format!("Cannot create output directory '{}'", cfg.output_dir.display()))?;

        let mut written = Vec::with_capacity(plans.len());
        let mut failed  = Vec::new();

        for plan in &plans {
            match &plan.job {
                Ok(job) => {
                    let path = store
                        .write(&job.script)
                        .with_context(|| format!("Cannot write scenario script for {}", plan.id))?;
                    written.push(path);
                }
                Err(e) => failed.push((plan.id, e.to_string())),
            }
        }

        tracing::info!(
            "Generated {} scenario scripts in '{}' ({} could not be built)",
            written.len(),
            cfg.output_dir.display(),
            failed.len(),
        );

        Ok(GenerateReport { output_dir: cfg.output_dir.clone(), written, failed })
    }
}

/// Validate, enumerate, and record the dataset description.
/// Only a configuration error makes this fail.
pub fn prepare(cfg: &SimulationConfig) -> Result<Vec<JobPlan>> {
    // ── Step 1: Enumerate ─────────────────────────────────────────────────────
    let strategy = strategy_for(cfg.void.strategy);
    let plans    = enumerate(cfg, strategy.as_ref()).context("Cannot enumerate scenario jobs")?;

    // ── Step 2: Resolved config next to the outputs ───────────────────────────
    ConfigStore::save_snapshot(cfg, &cfg.output_dir)?;

    // ── Step 3: Metadata for every slot, built or not ─────────────────────────
    write_metadata(&cfg.output_dir, &plans)?;

    Ok(plans)
}
