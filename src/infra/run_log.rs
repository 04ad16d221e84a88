// ============================================================
// Layer 6 — Run Log
// ============================================================
// Records every terminal job result to a CSV file as soon as
// it arrives, and the final RunSummary as JSON.
//
// Output files:
//   data/simulations/run_log.csv       ← one row per completed job
//   data/simulations/run_summary.json  ← written once, at the end
//
// Example CSV output:
//   job_id,status,duration_secs,reason
//   seq_0000_stage_00,succeeded,41.213,
//   seq_0000_stage_01,failed,3.020,"solver exited with status 1: ..."
//   seq_0001_stage_00,skipped,0.000,
//
// The CSV is append-only across runs: a re-run of a single job
// adds a new row rather than rewriting history. The summary
// file always reflects the latest run.

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use crate::domain::job::{JobResult, RunSummary};

pub const LOG_FILE:     &str = "run_log.csv";
pub const SUMMARY_FILE: &str = "run_summary.json";

pub struct RunLog {
    csv_path: PathBuf,
}

impl RunLog {
    /// Writes the CSV header if the file doesn't exist yet
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create output directory '{}'", dir.display()))?;

        let csv_path = dir.join(LOG_FILE);
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)
                .with_context(|| format!("Cannot create run log '{}'", csv_path.display()))?;
            writeln!(f, "job_id,status,duration_secs,reason")?;
            tracing::debug!("Created run log: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    /// Append one result row
    pub fn log(&self, r: &JobResult) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open run log '{}'", self.csv_path.display()))?;

        writeln!(
            f,
            "{},{},{:.3},{}",
            r.job_id,
            r.status.label(),
            r.duration.as_secs_f64(),
            csv_field(r.status.reason().unwrap_or("")),
        )?;
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }

    /// Overwrite `run_summary.json` in `dir` with the final summary
    pub fn write_summary(dir: impl AsRef<Path>, summary: &RunSummary) -> Result<PathBuf> {
        let path = dir.as_ref().join(SUMMARY_FILE);
        let json = serde_json::to_string_pretty(summary)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write run summary to '{}'", path.display()))?;
        tracing::debug!("Saved run summary to '{}'", path.display());
        Ok(path)
    }
}

/// Quote a CSV field when it contains a separator, quote or newline
fn csv_field(s: &str) -> String {
    if s.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::job::JobId;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_rows_append_across_instances() {
        let dir = TempDir::new().unwrap();

        RunLog::new(dir.path())
            .unwrap()
            .log(&JobResult::succeeded(JobId::new(0, 0), Duration::from_millis(1500), None))
            .unwrap();
        RunLog::new(dir.path())
            .unwrap()
            .log(&JobResult::skipped(JobId::new(0, 1), None))
            .unwrap();

        let text = fs::read_to_string(dir.path().join(LOG_FILE)).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec![
            "job_id,status,duration_secs,reason",
            "seq_0000_stage_00,succeeded,1.500,",
            "seq_0000_stage_01,skipped,0.000,",
        ]);
    }

    #[test]
    fn test_failure_reason_is_quoted() {
        let dir = TempDir::new().unwrap();
        let log = RunLog::new(dir.path()).unwrap();
        log.log(&JobResult::failed(JobId::new(2, 3), Duration::ZERO, "exit 1: bad \"box\", line 4"))
            .unwrap();

        let text = fs::read_to_string(log.csv_path()).unwrap();
        assert!(text.ends_with("seq_0002_stage_03,failed,0.000,\"exit 1: bad \"\"box\"\", line 4\"\n"));
    }

    #[test]
    fn test_summary_json_round_trips() {
        let dir = TempDir::new().unwrap();
        let mut summary = RunSummary::new();
        summary.record(JobResult::failed(JobId::new(0, 0), Duration::from_secs(2), "timeout"));

        let path = RunLog::write_summary(dir.path(), &summary).unwrap();
        let back: RunSummary = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(back, summary);
    }
}
