// ============================================================
// Layer 3 — Solver Scenario Script
// ============================================================
// In-memory representation of one solver input file, built
// from the solver's native primitives. Rendering follows the
// gprMax hash-command text format, one command per line:
//
//   #title: ...
//   #domain: x y z
//   #dx_dy_dz: dx dy dz
//   #time_window: 2e-8
//   #material: eps sigma mu_r magloss name
//   #box: x1 y1 z1 x2 y2 z2 material
//   #waveform: ricker 1 800e6 my_ricker
//   #hertzian_dipole: z x y z my_ricker
//   #rx: x y z
//   #src_steps: dx 0 0
//   #rx_steps: dx 0 0
//   #geometry_view: ... (optional)
//
// Numbers are written with at most 6 decimals and trailing
// zeros trimmed, so identical inputs always render to
// byte-identical text.

use std::fmt;

use crate::domain::job::JobId;

pub type Point = [f64; 3];

#[derive(Debug, Clone, PartialEq)]
pub enum SolverCommand {
    Title(String),
    Domain(Point),
    Discretisation(Point),
    TimeWindowNs(f64),
    Material { permittivity: f64, conductivity: f64, name: String },
    Box { lower: Point, upper: Point, material: String },
    RickerWaveform { frequency_mhz: f64, id: String },
    HertzianDipole { position: Point, waveform_id: String },
    Receiver(Point),
    SourceSteps(Point),
    ReceiverSteps(Point),
    GeometryView { lower: Point, upper: Point, resolution: Point, file_name: String },
}

impl fmt::Display for SolverCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverCommand::Title(t)          => write!(f, "#title: {t}"),
            SolverCommand::Domain(p)         => write!(f, "#domain: {}", pt(p)),
            SolverCommand::Discretisation(p) => write!(f, "#dx_dy_dz: {}", pt(p)),
            SolverCommand::TimeWindowNs(ns)  => write!(f, "#time_window: {}e-9", num(*ns)),
            SolverCommand::Material { permittivity, conductivity, name } => {
                // relative permeability 1, no magnetic loss
                write!(f, "#material: {} {} 1 0 {name}", num(*permittivity), num(*conductivity))
            }
            SolverCommand::Box { lower, upper, material } => {
                write!(f, "#box: {} {} {material}", pt(lower), pt(upper))
            }
            SolverCommand::RickerWaveform { frequency_mhz, id } => {
                write!(f, "#waveform: ricker 1 {}e6 {id}", num(*frequency_mhz))
            }
            SolverCommand::HertzianDipole { position, waveform_id } => {
                write!(f, "#hertzian_dipole: z {} {waveform_id}", pt(position))
            }
            SolverCommand::Receiver(p)      => write!(f, "#rx: {}", pt(p)),
            SolverCommand::SourceSteps(p)   => write!(f, "#src_steps: {}", pt(p)),
            SolverCommand::ReceiverSteps(p) => write!(f, "#rx_steps: {}", pt(p)),
            SolverCommand::GeometryView { lower, upper, resolution, file_name } => {
                write!(f, "#geometry_view: {} {} {} {file_name} f", pt(lower), pt(upper), pt(resolution))
            }
        }
    }
}

/// A solver-ready scenario. Writing it to disk is the
/// harness's job, not the builder's.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioScript {
    pub id:              JobId,
    pub commands:        Vec<SolverCommand>,
    /// Transmitter x position of every A-scan in the B-scan
    pub trace_positions: Vec<f64>,
}

impl ScenarioScript {
    pub fn render(&self) -> String {
        let mut out = String::new();
        for cmd in &self.commands {
            out.push_str(&cmd.to_string());
            out.push('\n');
        }
        out
    }

    pub fn boxes(&self) -> impl Iterator<Item = &SolverCommand> {
        self.commands.iter().filter(|c| matches!(c, SolverCommand::Box { .. }))
    }
}

/// Format a float with up to 6 decimals, trailing zeros trimmed
pub fn num(v: f64) -> String {
    let s = format!("{:.6}", v);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    match s {
        "-0" | "" => "0".to_string(),
        other     => other.to_string(),
    }
}

fn pt(p: &Point) -> String {
    format!("{} {} {}", num(p[0]), num(p[1]), num(p[2]))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_num_trims_zeros() {
        assert_eq!(num(1.0), "1");
        assert_eq!(num(0.25), "0.25");
        assert_eq!(num(0.1 + 0.2), "0.3");
        assert_eq!(num(-0.0000001), "0");
    }

    #[test]
    fn test_box_renders_in_hash_format() {
        let b = SolverCommand::Box { lower: [0.0, 0.0, 0.3], upper: [2.0, 1.0, 0.35], material: "surface_asphalt".into() };
        assert_eq!(b.to_string(), "#box: 0 0 0.3 2 1 0.35 surface_asphalt");
    }

    #[test]
    fn test_time_window_in_ns() {
        assert_eq!(SolverCommand::TimeWindowNs(20.0).to_string(), "#time_window: 20e-9");
    }
}
