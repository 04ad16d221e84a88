// ============================================================
// Layer 6 — Config Store
// ============================================================
// Reads the simulation configuration from YAML and writes the
// resolved copy next to the outputs.
//
// File layout:
//   config/simulation_config.yaml   ← hand-written input
//   data/simulations/
//     run_config.json               ← resolved config (after CLI overrides)
//
// run_config.json is also valid YAML, so `--config
// data/simulations/run_config.json` regenerates the exact same
// dataset.

use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::domain::config::SimulationConfig;

pub const SNAPSHOT_FILE: &str = "run_config.json";

pub struct ConfigStore;

impl ConfigStore {
    /// Load and parse a config file. Validation is left to the
    /// caller so CLI overrides can be applied first.
    pub fn load(path: impl AsRef<Path>) -> Result<SimulationConfig> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("Cannot read config file '{}'", path.display()))?;

        let cfg = Self::parse(&text)
            .with_context(|| format!("Invalid config file '{}'", path.display()))?;

        tracing::info!("Loaded simulation config from '{}'", path.display());
        Ok(cfg)
    }

    pub fn parse(text: &str) -> Result<SimulationConfig> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Write the resolved config as pretty JSON into `dir`
    pub fn save_snapshot(cfg: &SimulationConfig, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create output directory '{}'", dir.display()))?;

        let path = dir.join(SNAPSHOT_FILE);
        let json = serde_json::to_string_pretty(cfg)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write config snapshot to '{}'", path.display()))?;

        tracing::debug!("Saved resolved config to '{}'", path.display());
        Ok(path)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::config::{StrategyKind, ValueRange};
    use tempfile::TempDir;

    const MINIMAL: &str = r#"
output_dir: out/sims
generation:
  num_sequences: 4
  stages_per_sequence: 3
  base_seed: 7
domain:
  size_x: 2.0
  size_y: 1.0
  air_gap: 0.3
  layers:
    - { name: asphalt,  thickness: 0.15, permittivity: 6.0,  conductivity: 0.01 }
    - { name: subgrade, thickness: 1.2,  permittivity: 12.0, conductivity: 0.05 }
gpr:
  frequency_mhz: 400
  time_window_ns: 30
  spatial_resolution: 0.01
  scan_start_x: 0.2
  scan_end_x: 1.8
void:
  strategy: progressive
  depth_range: [0.5, 0.9]
"#;

    #[test]
    fn test_parse_fills_defaults() {
        let cfg = ConfigStore::parse(MINIMAL).unwrap();
        assert_eq!(cfg.generation.num_sequences, 4);
        assert_eq!(cfg.generation.base_seed, 7);
        assert_eq!(cfg.domain.layers.len(), 2);
        assert_eq!(cfg.gpr.num_traces, 50);
        assert_eq!(cfg.void.strategy, StrategyKind::Progressive);
        assert_eq!(cfg.void.depth_range, ValueRange::new(0.5, 0.9));
        assert_eq!(cfg.solver.max_attempts, 1);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_snapshot_reloads_identically() {
        let dir  = TempDir::new().unwrap();
        let cfg  = ConfigStore::parse(MINIMAL).unwrap();
        let path = ConfigStore::save_snapshot(&cfg, dir.path()).unwrap();

        assert!(path.ends_with(SNAPSHOT_FILE));
        assert_eq!(ConfigStore::load(&path).unwrap(), cfg);
    }

    #[test]
    fn test_missing_file_names_the_path() {
        let err = ConfigStore::load("no/such/config.yaml").unwrap_err();
        assert!(format!("{err:#}").contains("no/such/config.yaml"));
    }

    #[test]
    fn test_unknown_strategy_rejected() {
        let text = MINIMAL.replace("progressive", "exponential");
        assert!(ConfigStore::parse(&text).is_err());
    }
}
