// ============================================================
// Layer 3 — Error Taxonomy
// ============================================================
// Two families of errors:
//
//   ScenarioError  — raised while building a job (bad config,
//                    bad stage index, layer stack overflow,
//                    bad scan range, void out of bounds).
//                    Only ConfigValidation is fatal to a run;
//                    the others fail the affected job only.
//
//   ExecutionError — raised while running a job through the
//                    external solver (spawn failure, non-zero
//                    exit, timeout, missing output, or an I/O
//                    error writing the scenario script).
//
// Both are converted into a JobStatus::Failed(reason) by the
// harness, so the reason string is what users see.

use std::{io, path::PathBuf};
use thiserror::Error;

/// Errors raised while turning configuration into scenario jobs
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScenarioError {
    /// Enumeration parameters or derived sizes are unusable
    #[error("config validation failed: {0}")]
    ConfigValidation(String),

    /// Stage index outside [0, stage_count)
    #[error("invalid stage {stage}: sequence has {stage_count} stages")]
    InvalidStage { stage: u32, stage_count: u32 },

    /// Accumulated layer thickness does not fit the domain height limit
    #[error("layer stack overflow: accumulated {accumulated:.4} m exceeds limit {limit:.4} m")]
    LayerOverflow { accumulated: f64, limit: f64 },

    /// B-scan range is empty, inverted, or leaves the domain
    #[error("invalid scan range [{start}, {end}]: end must exceed start and both must lie inside the domain")]
    InvalidScanRange { start: f64, end: f64 },

    /// Void would touch the domain edges or cross the road/layer limits
    #[error("void geometry out of bounds: {0}")]
    GeometryOutOfBounds(String),
}

/// Errors raised while executing one job through the external solver
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("failed to spawn solver: {0}")]
    Spawn(#[source] io::Error),

    #[error("solver exited with {}: {log_tail}", exit_label(.code))]
    NonZeroExit { code: Option<i32>, log_tail: String },

    #[error("solver timed out after {secs} s")]
    Timeout { secs: u64 },

    #[error("solver finished but output file is missing: {}", .0.display())]
    MissingOutput(PathBuf),

    /// Writing the scenario script or solver log failed
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("status {c}"),
        None    => "no status (killed by signal)".to_string(),
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_stage_message_names_bounds() {
        let e = ScenarioError::InvalidStage { stage: 5, stage_count: 3 };
        assert_eq!(e.to_string(), "invalid stage 5: sequence has 3 stages");
    }

    #[test]
    fn test_non_zero_exit_message() {
        let e = ExecutionError::NonZeroExit { code: Some(2), log_tail: "boom".into() };
        assert_eq!(e.to_string(), "solver exited with status 2: boom");

        let e = ExecutionError::NonZeroExit { code: None, log_tail: String::new() };
        assert!(e.to_string().contains("killed by signal"));
    }
}
