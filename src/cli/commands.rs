// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands, `generate` and `run`, and all
// their flags.
//
// Every flag that changes the dataset or the solver call is an
// override on top of the YAML config; it is applied once, here,
// before the config record is handed to Layer 2.

use anyhow::Result;
use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::application::run_use_case::RunOptions;
use crate::domain::config::SimulationConfig;
use crate::domain::job::JobId;
use crate::harness::progress::CancelToken;
use crate::infra::config_store::ConfigStore;

/// The two top-level subcommands available to the user
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write scenario scripts and metadata without running the solver
    Generate(GenerateArgs),

    /// Generate scenario scripts and run every job through the solver
    Run(RunArgs),
}

/// Flags shared by both subcommands
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// YAML simulation config (a run_config.json snapshot also works)
    #[arg(long, default_value = "config/simulation_config.yaml")]
    pub config: PathBuf,

    /// Directory for scripts, solver outputs, logs and metadata
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Base seed; sequence N is sampled with seed base + N
    #[arg(long)]
    pub seed: Option<u64>,
}

impl ConfigArgs {
    /// Load the config file and apply the shared overrides
    pub fn load(&self) -> Result<SimulationConfig> {
        let mut cfg = ConfigStore::load(&self.config)?;
        if let Some(dir) = &self.output_dir {
            cfg.output_dir = dir.clone();
        }
        if let Some(seed) = self.seed {
            cfg.generation.base_seed = seed;
        }
        Ok(cfg)
    }
}

/// All arguments for the `generate` command
#[derive(Args, Debug)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub config: ConfigArgs,
}

/// All arguments for the `run` command
#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Concurrent solver processes (default: solver.workers, then CPU count)
    #[arg(long)]
    pub workers: Option<usize>,

    /// Exit with an error if any job failed
    #[arg(long)]
    pub strict: bool,

    /// Mark jobs whose output file already exists as skipped
    #[arg(long)]
    pub skip_existing: bool,

    /// Run only this job, e.g. seq_0003_stage_01 (repeatable)
    #[arg(long = "job", value_name = "JOB_ID")]
    pub jobs: Vec<JobId>,

    /// Kill a solver process after this many seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Pass -gpu to the solver
    #[arg(long)]
    pub gpu: bool,

    /// Build geometry only; no solver output file is expected
    #[arg(long)]
    pub geometry_only: bool,

    /// Stop dispatching new jobs after this many failures
    #[arg(long)]
    pub max_failures: Option<usize>,
}

impl RunArgs {
    /// Load the config and apply every solver override
    pub fn load_config(&self) -> Result<SimulationConfig> {
        let mut cfg = self.config.load()?;
        if let Some(secs) = self.timeout_secs {
            cfg.solver.timeout_secs = Some(secs);
        }
        cfg.solver.gpu           |= self.gpu;
        cfg.solver.geometry_only |= self.geometry_only;
        Ok(cfg)
    }
}

/// Convert CLI RunArgs into the application-layer RunOptions.
/// The application layer never sees clap types.
impl From<&RunArgs> for RunOptions {
    fn from(a: &RunArgs) -> Self {
        RunOptions {
            workers:       a.workers,
            skip_existing: a.skip_existing,
            max_failures:  a.max_failures,
            only:          a.jobs.clone(),
            cancel:        CancelToken::new(),
        }
    }
}
