// ============================================================
// Layer 3 — Simulation Configuration Record
// ============================================================
// The single, immutable record that drives a campaign.
// It is parsed once by Layer 6 (infra::config_store) from
// YAML and then passed BY REFERENCE into every component's
// entry point. Nothing in the crate reads settings from a
// global.
//
// Shape of the YAML document:
//
//   output_dir: data/simulations
//   generation: { num_sequences, stages_per_sequence, base_seed }
//   domain:     { size_x, size_y, air_gap, margin, max_height?, layers: [...] }
//   gpr:        { frequency_mhz, time_window_ns, spatial_resolution,
//                 num_traces, scan_start_x, scan_end_x, geometry_view }
//   void:       { strategy, depth_range, radius_x_range, ... }
//   materials:  { air, void }
//   solver:     { command, extra_args, timeout_secs, max_attempts, ... }
//
// Units: metres, MHz, nanoseconds. Depths are measured
// downward from the road surface (logical z = 0).

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::domain::error::ScenarioError;

// ─── Top-level record ─────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Where scripts, solver outputs, logs and metadata are written
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    pub generation: GenerationConfig,
    pub domain:     DomainConfig,
    pub gpr:        GprParams,

    #[serde(default)]
    pub void: VoidConfig,

    #[serde(default)]
    pub materials: MaterialConfig,

    #[serde(default)]
    pub solver: SolverConfig,
}

impl SimulationConfig {
    /// Check every section that enumeration depends on.
    /// Scan-range problems are NOT checked here: they are a
    /// per-job construction error raised by the script builder.
    pub fn validate(&self) -> Result<(), ScenarioError> {
        self.generation.validate()?;
        self.domain.validate()?;
        self.gpr.validate()?;
        self.void.validate()?;
        self.solver.validate()?;
        Ok(())
    }

    /// Total number of jobs this config expands into
    pub fn job_count(&self) -> usize {
        self.generation.num_sequences as usize * self.generation.stages_per_sequence as usize
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            generation: GenerationConfig::default(),
            domain:     DomainConfig::default(),
            gpr:        GprParams::default(),
            void:       VoidConfig::default(),
            materials:  MaterialConfig::default(),
            solver:     SolverConfig::default(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("data/simulations")
}

// ─── Generation ───────────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub num_sequences:       u32,
    pub stages_per_sequence: u32,

    /// Offset added to the sequence id to form its sampling seed
    #[serde(default)]
    pub base_seed: u64,
}

impl GenerationConfig {
    fn validate(&self) -> Result<(), ScenarioError> {
        if self.num_sequences == 0 {
            return Err(invalid("generation.num_sequences must be greater than 0"));
        }
        if self.stages_per_sequence == 0 {
            return Err(invalid("generation.stages_per_sequence must be greater than 0"));
        }
        Ok(())
    }

    /// Seed used for every stage of one sequence
    pub fn sequence_seed(&self, sequence_id: u32) -> u64 {
        self.base_seed.wrapping_add(sequence_id as u64)
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self { num_sequences: 10, stages_per_sequence: 5, base_seed: 0 }
    }
}

// ─── Domain ───────────────────────────────────────────────────────────────────
/// Horizontal extents plus the road layer stack.
///
/// `size_z` is intentionally not a field: it is always
/// recomputed from the layers and the air gap, so it can
/// never go stale when a thickness changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainConfig {
    pub size_x:  f64,
    pub size_y:  f64,

    /// Air above the road surface (antenna side)
    pub air_gap: f64,

    /// Road layers ordered top (surface) to bottom
    pub layers: Vec<RoadLayer>,

    /// Optional hard limit on the total domain height
    #[serde(default)]
    pub max_height: Option<f64>,

    /// Safety margin kept clear at every domain boundary
    #[serde(default = "default_margin")]
    pub margin: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadLayer {
    pub name:         String,
    pub thickness:    f64,
    pub permittivity: f64,
    #[serde(default)]
    pub conductivity: f64,
}

impl RoadLayer {
    pub fn new(name: impl Into<String>, thickness: f64, permittivity: f64, conductivity: f64) -> Self {
        Self { name: name.into(), thickness, permittivity, conductivity }
    }
}

impl DomainConfig {
    /// Depth from road surface to the bottom of the last layer
    pub fn road_depth(&self) -> f64 {
        self.layers.iter().map(|l| l.thickness).sum()
    }

    /// Full solver domain height: air gap + every road layer
    pub fn size_z(&self) -> f64 {
        self.air_gap + self.road_depth()
    }

    fn validate(&self) -> Result<(), ScenarioError> {
        if !(self.size_x > 0.0) || !(self.size_y > 0.0) {
            return Err(invalid(format!(
                "domain size must be positive (size_x={}, size_y={})",
                self.size_x, self.size_y
            )));
        }
        if !(self.air_gap > 0.0) {
            return Err(invalid(format!("domain.air_gap must be positive, got {}", self.air_gap)));
        }
        if self.layers.is_empty() {
            return Err(invalid("domain.layers must contain at least one road layer"));
        }
        for layer in &self.layers {
            // Layer names double as solver material identifiers
            if layer.name.is_empty()
                || layer.name.chars().any(char::is_whitespace)
                || layer.name == "air"
                || layer.name == "void"
            {
                return Err(invalid(format!("layer name '{}' is not a usable material name", layer.name)));
            }
            if !(layer.thickness > 0.0) {
                return Err(invalid(format!(
                    "layer '{}' has non-positive thickness {}",
                    layer.name, layer.thickness
                )));
            }
        }
        if !(self.margin >= 0.0) {
            return Err(invalid(format!("domain.margin must be non-negative, got {}", self.margin)));
        }
        if !(self.size_z() > 0.0) {
            return Err(invalid("derived domain size_z is non-positive"));
        }
        Ok(())
    }
}

impl Default for DomainConfig {
    fn default() -> Self {
        Self {
            size_x:  2.0,
            size_y:  1.0,
            air_gap: 0.3,
            layers:  vec![
                RoadLayer::new("surface_asphalt", 0.05, 6.0,  0.01),
                RoadLayer::new("base_asphalt",    0.10, 5.5,  0.01),
                RoadLayer::new("upper_subbase",   0.15, 8.0,  0.02),
                RoadLayer::new("lower_subbase",   0.20, 9.0,  0.02),
                RoadLayer::new("subgrade",        1.00, 12.0, 0.05),
            ],
            max_height: None,
            margin:     default_margin(),
        }
    }
}

fn default_margin() -> f64 {
    0.05
}

// ─── GPR / B-scan ─────────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GprParams {
    /// Ricker centre frequency
    pub frequency_mhz:      f64,
    pub time_window_ns:     f64,
    /// Cell size used for dx, dy and dz
    pub spatial_resolution: f64,

    /// Number of A-scans in the B-scan
    #[serde(default = "default_num_traces")]
    pub num_traces:   u32,
    pub scan_start_x: f64,
    pub scan_end_x:   f64,

    /// Ask the solver to dump a geometry view per job
    #[serde(default)]
    pub geometry_view: bool,
}

impl GprParams {
    fn validate(&self) -> Result<(), ScenarioError> {
        if !(self.frequency_mhz > 0.0) {
            return Err(invalid("gpr.frequency_mhz must be positive"));
        }
        if !(self.time_window_ns > 0.0) {
            return Err(invalid("gpr.time_window_ns must be positive"));
        }
        if !(self.spatial_resolution > 0.0) {
            return Err(invalid("gpr.spatial_resolution must be positive"));
        }
        if self.num_traces == 0 {
            return Err(invalid("gpr.num_traces must be at least 1"));
        }
        Ok(())
    }
}

impl Default for GprParams {
    fn default() -> Self {
        Self {
            frequency_mhz:      800.0,
            time_window_ns:     20.0,
            spatial_resolution: 0.005,
            num_traces:         default_num_traces(),
            scan_start_x:       0.2,
            scan_end_x:         1.8,
            geometry_view:      false,
        }
    }
}

fn default_num_traces() -> u32 {
    50
}

// ─── Void evolution ───────────────────────────────────────────────────────────
/// Which sampling/schedule strategy drives the void trajectory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Constant rise and growth per stage
    #[default]
    Linear,
    /// Linear rise, growth that accelerates with progress
    Progressive,
}

/// Inclusive [min, max] range, written as a two-element list in YAML
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl ValueRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Uniform draw from [min, max]; a degenerate range returns min
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        if self.max > self.min {
            rng.gen_range(self.min..=self.max)
        } else {
            self.min
        }
    }

    fn validate(&self, name: &str) -> Result<(), ScenarioError> {
        if !self.min.is_finite() || !self.max.is_finite() || self.min < 0.0 || self.min > self.max {
            return Err(invalid(format!(
                "void.{name} must satisfy 0 <= min <= max, got [{}, {}]",
                self.min, self.max
            )));
        }
        Ok(())
    }
}

impl From<[f64; 2]> for ValueRange {
    fn from([min, max]: [f64; 2]) -> Self {
        Self { min, max }
    }
}

impl From<ValueRange> for [f64; 2] {
    fn from(r: ValueRange) -> Self {
        [r.min, r.max]
    }
}

/// Every field falls back to the default schedule, so a config
/// only lists the ranges it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoidConfig {
    pub strategy: StrategyKind,

    /// Initial depth of the void's top face below the road surface
    pub depth_range:         ValueRange,
    pub radius_x_range:      ValueRange,
    pub radius_y_range:      ValueRange,
    /// Initial vertical extent
    pub height_range:        ValueRange,

    /// Upward movement per stage (m)
    pub rise_range:          ValueRange,
    /// Radius growth per stage (m), shared by x and y
    pub growth_range:        ValueRange,
    pub height_growth_range: ValueRange,

    /// Minimum depth the top face may rise to
    pub min_clearance:       f64,
    /// Radius cap as a fraction of the domain size on that axis
    pub max_radius_fraction: f64,
    /// Height cap as a fraction of the road depth
    pub max_height_fraction: f64,
}

impl VoidConfig {
    fn validate(&self) -> Result<(), ScenarioError> {
        self.depth_range.validate("depth_range")?;
        self.radius_x_range.validate("radius_x_range")?;
        self.radius_y_range.validate("radius_y_range")?;
        self.height_range.validate("height_range")?;
        self.rise_range.validate("rise_range")?;
        self.growth_range.validate("growth_range")?;
        self.height_growth_range.validate("height_growth_range")?;

        if !(self.min_clearance >= 0.0) {
            return Err(invalid("void.min_clearance must be non-negative"));
        }
        if !(self.max_radius_fraction > 0.0 && self.max_radius_fraction < 0.5) {
            return Err(invalid("void.max_radius_fraction must lie in (0, 0.5)"));
        }
        if !(self.max_height_fraction > 0.0 && self.max_height_fraction <= 1.0) {
            return Err(invalid("void.max_height_fraction must lie in (0, 1]"));
        }
        if self.radius_x_range.min <= 0.0 || self.radius_y_range.min <= 0.0 || self.height_range.min <= 0.0 {
            return Err(invalid("void initial radius and height ranges must be strictly positive"));
        }
        Ok(())
    }
}

impl Default for VoidConfig {
    fn default() -> Self {
        Self {
            strategy:            StrategyKind::Linear,
            depth_range:         ValueRange::new(0.6, 1.0),
            radius_x_range:      ValueRange::new(0.05, 0.15),
            radius_y_range:      ValueRange::new(0.05, 0.10),
            height_range:        ValueRange::new(0.05, 0.10),
            rise_range:          ValueRange::new(0.02, 0.08),
            growth_range:        ValueRange::new(0.01, 0.03),
            height_growth_range: ValueRange::new(0.005, 0.02),
            min_clearance:       0.1,
            max_radius_fraction: 0.3,
            max_height_fraction: 0.4,
        }
    }
}

// ─── Materials ────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub permittivity: f64,
    #[serde(default)]
    pub conductivity: f64,
}

/// Materials that are not tied to a road layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialConfig {
    pub air:  Material,
    /// What fills the void (air by default)
    pub void: Material,
}

impl Default for MaterialConfig {
    fn default() -> Self {
        let air = Material { permittivity: 1.0, conductivity: 0.0 };
        Self { air, void: air }
    }
}

// ─── Solver invocation ────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Program and leading arguments; the script path is appended
    pub command:         Vec<String>,
    pub extra_args:      Vec<String>,
    /// Flag used to pass the output directory, if the solver has one
    pub output_dir_flag: Option<String>,
    pub gpu:             bool,
    /// Build geometry only; no result file is expected
    pub geometry_only:   bool,
    pub timeout_secs:    Option<u64>,
    /// 1 = no automatic retry
    pub max_attempts:    u32,
    /// Worker count; defaults to the number of available CPUs
    pub workers:         Option<usize>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            command:         vec!["python".into(), "-m".into(), "gprMax".into()],
            extra_args:      Vec::new(),
            output_dir_flag: Some("-outputdir".into()),
            gpu:             false,
            geometry_only:   false,
            timeout_secs:    None,
            max_attempts:    1,
            workers:         None,
        }
    }
}

impl SolverConfig {
    fn validate(&self) -> Result<(), ScenarioError> {
        if self.command.is_empty() {
            return Err(invalid("solver.command must name a program"));
        }
        if self.max_attempts == 0 {
            return Err(invalid("solver.max_attempts must be at least 1"));
        }
        if self.workers == Some(0) {
            return Err(invalid("solver.workers must be at least 1"));
        }
        if self.timeout_secs == Some(0) {
            return Err(invalid("solver.timeout_secs must be greater than 0"));
        }
        Ok(())
    }
}

fn invalid(msg: impl Into<String>) -> ScenarioError {
    ScenarioError::ConfigValidation(msg.into())
}
