// ============================================================
// Layer 3 — Jobs, Results and the Run Summary
// ============================================================
// Lifecycle of one scenario job:
//
//   Job Enumerator ──► JobPlan ──► worker ──► JobResult ──► RunSummary
//
// A JobPlan either carries a ready ScenarioJob or the
// construction error that prevented it from being built. The
// harness turns an erroneous plan straight into a Failed
// result so one bad geometry never aborts the batch.
//
// File naming contract (consumed by downstream tooling):
//   seq_{sequence:04}_stage_{stage:02}.in   — scenario script
//   seq_{sequence:04}_stage_{stage:02}.out  — solver result
//   seq_{sequence:04}_stage_{stage:02}.log  — solver stdout/stderr

use serde::{Deserialize, Serialize};
use std::{fmt, path::PathBuf, str::FromStr, time::Duration};

use crate::domain::config::{DomainConfig, GprParams};
use crate::domain::error::ScenarioError;
use crate::domain::geometry::VoidGeometry;
use crate::domain::script::ScenarioScript;

// ─── JobId ────────────────────────────────────────────────────────────────────
/// Identity of a job: (sequence, stage). Ordered sequence-major.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobId {
    pub sequence_id: u32,
    pub stage_id:    u32,
}

impl JobId {
    pub fn new(sequence_id: u32, stage_id: u32) -> Self {
        Self { sequence_id, stage_id }
    }

    /// Zero-padded stem shared by every artifact of this job
    pub fn stem(&self) -> String {
        format!("seq_{:04}_stage_{:02}", self.sequence_id, self.stage_id)
    }

    pub fn script_file_name(&self) -> String {
        format!("{}.in", self.stem())
    }

    pub fn output_file_name(&self) -> String {
        format!("{}.out", self.stem())
    }

    pub fn log_file_name(&self) -> String {
        format!("{}.log", self.stem())
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.stem())
    }
}

impl FromStr for JobId {
    type Err = ScenarioError;

    /// Parse `seq_0003_stage_01` back into a JobId
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || ScenarioError::ConfigValidation(format!(
            "invalid job id '{s}', expected seq_NNNN_stage_NN"
        ));

        let rest          = s.strip_prefix("seq_").ok_or_else(bad)?;
        let (seq, stage)  = rest.split_once("_stage_").ok_or_else(bad)?;
        let sequence_id   = seq.parse::<u32>().map_err(|_| bad())?;
        let stage_id      = stage.parse::<u32>().map_err(|_| bad())?;

        Ok(Self { sequence_id, stage_id })
    }
}

// ─── ScenarioJob / JobPlan ────────────────────────────────────────────────────
/// A fully built, immutable job. Owned by exactly one worker.
#[derive(Debug, Clone)]
pub struct ScenarioJob {
    pub id:       JobId,
    pub geometry: VoidGeometry,
    pub domain:   DomainConfig,
    pub gpr:      GprParams,
    pub script:   ScenarioScript,
}

/// Output of enumeration for one (sequence, stage) slot
#[derive(Debug, Clone)]
pub struct JobPlan {
    pub id:  JobId,
    pub job: Result<ScenarioJob, ScenarioError>,
}

impl JobPlan {
    pub fn is_ready(&self) -> bool {
        self.job.is_ok()
    }
}

// ─── JobStatus / JobResult ────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum JobStatus {
    Succeeded,
    Failed(String),
    Skipped,
}

impl JobStatus {
    pub fn label(&self) -> &'static str {
        match self {
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed(_) => "failed",
            JobStatus::Skipped   => "skipped",
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            JobStatus::Failed(r) => Some(r),
            _                    => None,
        }
    }
}

/// Terminal outcome of one job. Produced exactly once per job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResult {
    pub job_id:      JobId,
    pub status:      JobStatus,
    pub duration:    Duration,
    pub output_path: Option<PathBuf>,
}

impl JobResult {
    pub fn succeeded(job_id: JobId, duration: Duration, output_path: Option<PathBuf>) -> Self {
        Self { job_id, status: JobStatus::Succeeded, duration, output_path }
    }

    pub fn failed(job_id: JobId, duration: Duration, reason: impl Into<String>) -> Self {
        Self { job_id, status: JobStatus::Failed(reason.into()), duration, output_path: None }
    }

    pub fn skipped(job_id: JobId, output_path: Option<PathBuf>) -> Self {
        Self { job_id, status: JobStatus::Skipped, duration: Duration::ZERO, output_path }
    }
}

// ─── RunSummary ───────────────────────────────────────────────────────────────
/// Append-only record of every job's terminal status, in
/// COMPLETION order (not dispatch order).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    results: Vec<JobResult>,
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a terminal result; results are never revised
    pub fn record(&mut self, result: JobResult) {
        self.results.push(result);
    }

    pub fn results(&self) -> &[JobResult] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn succeeded(&self) -> usize {
        self.count(|s| matches!(s, JobStatus::Succeeded))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, JobStatus::Failed(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, JobStatus::Skipped))
    }

    /// Every failed job with its causal reason
    pub fn failures(&self) -> impl Iterator<Item = (&JobId, &str)> {
        self.results
            .iter()
            .filter_map(|r| r.status.reason().map(|reason| (&r.job_id, reason)))
    }

    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }

    fn count(&self, pred: impl Fn(&JobStatus) -> bool) -> usize {
        self.results.iter().filter(|r| pred(&r.status)).count()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stem_is_zero_padded() {
        assert_eq!(JobId::new(0, 0).stem(), "seq_0000_stage_00");
        assert_eq!(JobId::new(12, 3).script_file_name(), "seq_0012_stage_03.in");
        assert_eq!(JobId::new(12, 3).output_file_name(), "seq_0012_stage_03.out");
    }

    #[test]
    fn test_stem_parses_back() {
        let id = JobId::new(42, 7);
        assert_eq!(id.stem().parse::<JobId>().unwrap(), id);
    }

    #[test]
    fn test_malformed_id_rejected() {
        assert!("seq_x_stage_1".parse::<JobId>().is_err());
        assert!("sequence_0001".parse::<JobId>().is_err());
        assert!("".parse::<JobId>().is_err());
    }

    #[test]
    fn test_ids_order_sequence_major() {
        let mut ids = vec![JobId::new(1, 0), JobId::new(0, 2), JobId::new(0, 1)];
        ids.sort();
        assert_eq!(ids, vec![JobId::new(0, 1), JobId::new(0, 2), JobId::new(1, 0)]);
    }

    #[test]
    fn test_summary_counts() {
        let mut s = RunSummary::new();
        s.record(JobResult::succeeded(JobId::new(0, 0), Duration::from_secs(1), None));
        s.record(JobResult::failed(JobId::new(0, 1), Duration::ZERO, "solver crashed"));
        s.record(JobResult::skipped(JobId::new(0, 2), None));

        assert_eq!(s.len(), 3);
        assert_eq!(s.succeeded(), 1);
        assert_eq!(s.failed(), 1);
        assert_eq!(s.skipped(), 1);

        let failures: Vec<_> = s.failures().collect();
        assert_eq!(failures, vec![(&JobId::new(0, 1), "solver crashed")]);
    }
}
