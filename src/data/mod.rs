// ============================================================
// Layer 4 — Scenario Pipeline
// ============================================================
// Turns the configuration record into solver-ready jobs.
//
// The pipeline flows in this order:
//
//   SimulationConfig
//       │
//       ▼
//   enumerator        → one slot per (sequence, stage), in order
//       │
//       ▼
//   trajectory        → void geometry for that stage
//       │
//       ▼
//   script_builder    → solver-native scenario script
//       │
//       ▼
//   JobPlan           → handed to the execution harness (Layer 5)
//
// Everything here is pure: no files are written and no
// processes are started.

/// Seeded, monotonic void-evolution model and its strategies
pub mod trajectory;

/// Geometry + config → solver scenario script
pub mod script_builder;

/// Sequence-major expansion of the campaign into job plans
pub mod enumerator;
