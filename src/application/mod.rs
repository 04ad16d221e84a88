// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Orchestrates the other layers for one user-level goal.
//
// Rules for this layer:
//   - No geometry or script math (that's Layer 4)
//   - No printing (that's Layer 1)
//   - No direct file formats (that's Layer 6)
//   - Only workflow coordination
//
//   generate_use_case.rs — write scripts + metadata, no solver
//   run_use_case.rs      — generate, then execute every job

/// Dataset generation without running the solver
pub mod generate_use_case;

/// Generation plus concurrent solver execution
pub mod run_use_case;
