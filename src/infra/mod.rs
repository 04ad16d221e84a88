// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Everything that touches the filesystem on behalf of the
// other layers:
//
//   config_store.rs — YAML config loading, plus the resolved
//                     run_config.json snapshot written next to
//                     the outputs.
//
//   script_store.rs — Writes rendered scenario scripts under
//                     their deterministic seq_NNNN_stage_NN.in
//                     names (overwrite, never duplicate).
//
//   run_log.rs      — Append-only run_log.csv, one row per
//                     finished job, and run_summary.json.
//
//   metadata.rs     — metadata.yaml mapping every job to its
//                     void parameters (or construction error).
//
// Domain and scenario layers never do I/O themselves; they
// hand plain records to this layer.

/// YAML config loading and JSON snapshot
pub mod config_store;

/// Scenario script persistence
pub mod script_store;

/// Per-job CSV log and final summary
pub mod run_log;

/// Dataset metadata
pub mod metadata;
