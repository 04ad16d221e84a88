// ============================================================
// Layer 5 — Subprocess Solver
// ============================================================
// Runs the external electromagnetic solver as ONE ISOLATED
// CHILD PROCESS PER JOB. A crash, hang or memory blow-up in
// the solver can only take down its own process; sibling jobs
// and the harness keep going.
//
// Command line (gprMax conventions by default):
//
//   <command...> <script.in> [-outputdir <dir>] [-gpu] [-geometry-only] <extra_args...>
//
// stdout and stderr go to <stem>.log next to the outputs, so a
// chatty solver can never block on a full pipe.
//
// On unix each child gets its own process group, so a Ctrl-C at
// the terminal reaches the harness but not the running solvers.
//
// Outcome mapping:
//   spawn error            → ExecutionError::Spawn
//   exit status != 0       → ExecutionError::NonZeroExit (+ log tail)
//   still running at limit → killed, ExecutionError::Timeout
//   exit 0 but no .out     → ExecutionError::MissingOutput
//
// Memory used by the child is the solver's business. If the
// solver runs out of memory, lower the worker count.

use std::{
    fs::{self, File},
    path::{Path, PathBuf},
    process::{Child, Command, ExitStatus, Stdio},
    thread,
    time::{Duration, Instant},
};

use crate::domain::config::SolverConfig;
use crate::domain::error::{ExecutionError, ScenarioError};
use crate::domain::job::JobId;
use crate::domain::traits::Solver;

/// Lines of the solver log quoted in a failure reason
const LOG_TAIL_LINES: usize = 5;

#[derive(Debug, Clone)]
pub struct SubprocessSolver {
    program:         String,
    leading_args:    Vec<String>,
    extra_args:      Vec<String>,
    output_dir:      PathBuf,
    output_dir_flag: Option<String>,
    gpu:             bool,
    geometry_only:   bool,
    timeout:         Option<Duration>,
    poll_interval:   Duration,
}

impl SubprocessSolver {
    pub fn from_config(cfg: &SolverConfig, output_dir: impl Into<PathBuf>) -> Result<Self, ScenarioError> {
        let (program, leading_args) = cfg
            .command
            .split_first()
            .ok_or_else(|| ScenarioError::ConfigValidation("solver.command must not be empty".into()))?;

        Ok(Self {
            program:         program.clone(),
            leading_args:    leading_args.to_vec(),
            extra_args:      cfg.extra_args.clone(),
            output_dir:      output_dir.into(),
            output_dir_flag: cfg.output_dir_flag.clone(),
            gpu:             cfg.gpu,
            geometry_only:   cfg.geometry_only,
            timeout:         cfg.timeout_secs.map(Duration::from_secs),
            poll_interval:   Duration::from_millis(100),
        })
    }

    /// Override the try_wait polling period (tests use a short one)
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    fn command(&self, script_path: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.leading_args).arg(script_path);

        if let Some(flag) = &self.output_dir_flag {
            cmd.arg(flag).arg(&self.output_dir);
        }
        if self.gpu {
            cmd.arg("-gpu");
        }
        if self.geometry_only {
            cmd.arg("-geometry-only");
        }
        cmd.args(&self.extra_args);

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }
        cmd
    }
}

impl Solver for SubprocessSolver {
    fn expected_output(&self, job: &JobId) -> Option<PathBuf> {
        if self.geometry_only {
            None
        } else {
            Some(self.output_dir.join(job.output_file_name()))
        }
    }

    fn run(&self, job: &JobId, script_path: &Path) -> Result<Option<PathBuf>, ExecutionError> {
        fs::create_dir_all(&self.output_dir)?;

        // A leftover result from an earlier run must not make a
        // failed re-run look successful.
        let expected = self.expected_output(job);
        if let Some(out) = &expected {
            if out.exists() {
                fs::remove_file(out)?;
            }
        }

        let log_path = self.output_dir.join(job.log_file_name());
        let log      = File::create(&log_path)?;
        let log_err  = log.try_clone()?;

        let mut child = self
            .command(script_path)
            .stdin(Stdio::null())
            .stdout(log)
            .stderr(log_err)
            .spawn()
            .map_err(ExecutionError::Spawn)?;

        tracing::debug!("{job}: solver started (pid {})", child.id());

        let status = match wait_with_timeout(&mut child, self.timeout, self.poll_interval)? {
            Some(status) => status,
            None => {
                // Timed out: this job only, kill and reap it
                let _ = child.kill();
                let _ = child.wait();
                let secs = self.timeout.map(|t| t.as_secs()).unwrap_or_default();
                return Err(ExecutionError::Timeout { secs });
            }
        };

        if !status.success() {
            return Err(ExecutionError::NonZeroExit {
                code:     status.code(),
                log_tail: log_tail(&log_path),
            });
        }

        match expected {
            Some(out) if !out.exists() => Err(ExecutionError::MissingOutput(out)),
            other                      => Ok(other),
        }
    }
}

/// Block until the child exits or `timeout` elapses.
/// Returns None on timeout; the child is left running.
fn wait_with_timeout(
    child:   &mut Child,
    timeout: Option<Duration>,
    poll:    Duration,
) -> std::io::Result<Option<ExitStatus>> {
    let Some(limit) = timeout else {
        return child.wait().map(Some);
    };

    let started = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if started.elapsed() >= limit {
            return Ok(None);
        }
        thread::sleep(poll);
    }
}

/// Last few non-empty lines of the solver log, joined with " | "
fn log_tail(path: &Path) -> String {
    let Ok(text) = fs::read_to_string(path) else {
        return String::new();
    };
    let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    let start = lines.len().saturating_sub(LOG_TAIL_LINES);
    lines[start..].join(" | ")
}
