// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Pure Rust structs, enums and traits describing what a
// simulation campaign IS: the configuration record, the void
// geometry of one stage, the jobs built from it and the
// results they produce.
//
// Rules for this layer:
//   - NO file I/O or subprocess calls
//   - NO YAML/JSON parsing (that's Layer 6)
//   - Only plain data, validation and traits
//
// The configuration record is immutable once loaded. Every
// component receives it (or the part it needs) explicitly as
// an argument; there is no process-wide settings object.

// Immutable simulation configuration record
pub mod config;

// Error taxonomy for scenario construction and execution
pub mod error;

// Void geometry snapshot for one stage
pub mod geometry;

// Job identifiers, jobs, results and the run summary
pub mod job;

// Solver-native scenario script (gprMax hash commands)
pub mod script;

// Seams other layers implement (trajectory strategy, solver)
pub mod traits;
