// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
// Two commands are supported:
//   1. `generate` — write scenario scripts + metadata only
//   2. `run`      — generate, then run every job through the solver
//
// Exit status: non-zero on a config error, or with `--strict`
// when at least one job failed.
//
// Ctrl-C during `run` stops dispatch: queued jobs are recorded
// as skipped and run_summary.json is still written. A second
// Ctrl-C exits at once with status 130, leaving any running
// solver processes behind.

pub mod commands;

use anyhow::{bail, Context, Result};
use clap::Parser;
use commands::{Commands, GenerateArgs, RunArgs};

use crate::domain::job::RunSummary;
use crate::harness::progress::CancelToken;

#[derive(Parser, Debug)]
#[command(
    name = "gpr-void-sim",
    version = "0.1.0",
    about = "Generate evolving road-void GPR scenarios and run them through an external solver."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Generate(args) => run_generate(args),
            Commands::Run(args)      => run_run(args),
        }
    }
}

fn run_generate(args: GenerateArgs) -> Result<()> {
    use crate::application::generate_use_case::GenerateUseCase;

    let cfg    = args.config.load()?;
    let report = GenerateUseCase::new(cfg).execute()?;

    println!(
        "Wrote {} scenario scripts to '{}'.",
        report.written.len(),
        report.output_dir.display()
    );
    for (id, reason) in &report.failed {
        println!("  {id}: {reason}");
    }
    Ok(())
}

fn run_run(args: RunArgs) -> Result<()> {
    use crate::application::run_use_case::{RunOptions, RunUseCase};

    let cfg = args.load_config()?;
    let options: RunOptions = (&args).into();
    install_interrupt_handler(options.cancel.clone())?;

    let summary = RunUseCase::new(cfg, options).execute()?;

    print_summary(&summary);

    if args.strict && summary.has_failures() {
        bail!("{} of {} jobs failed", summary.failed(), summary.len());
    }
    Ok(())
}

/// First Ctrl-C raises `cancel`; the next one exits the process
fn install_interrupt_handler(cancel: CancelToken) -> Result<()> {
    ctrlc::set_handler(move || {
        if cancel.is_cancelled() {
            eprintln!("Interrupted again, exiting");
            std::process::exit(130);
        }
        tracing::warn!("Interrupt received: finishing running jobs, skipping the rest");
        cancel.cancel();
    })
    .context("Cannot install Ctrl-C handler")
}

fn print_summary(summary: &RunSummary) {
    println!(
        "\n{} jobs: {} succeeded, {} failed, {} skipped",
        summary.len(),
        summary.succeeded(),
        summary.failed(),
        summary.skipped(),
    );
    for (id, reason) in summary.failures() {
        println!("  FAILED {id}: {reason}");
    }
}
