// ============================================================
// Layer 4 — Scenario Script Builder
// ============================================================
// Turns one stage's void geometry plus the domain / GPR /
// material configuration into a solver-ready ScenarioScript.
//
// Solver z-axis layout (logical road surface at z = air_gap):
//
//   z = size_z ┌─────────────────────────┐
//              │ subgrade                │  ← last layer
//              │   ┌──────┐              │
//              │   │ void │              │  ← carved box, drawn last
//              │   └──────┘              │
//              │ ...                     │
//              │ surface asphalt         │  ← first layer
//   z = air_gap├─────────────────────────┤  ← Tx/Rx pair (road surface)
//              │ air                     │
//   z = 0      └─────────────────────────┘
//
// Layer z-offsets are accumulated top-to-bottom starting at
// the air gap. The B-scan places `num_traces` evenly spaced
// transmitter positions between scan_start_x and scan_end_x;
// the solver moves Tx and Rx together by the step size.
//
// Nothing is written to disk here.

use crate::domain::config::{DomainConfig, GprParams, MaterialConfig};
use crate::domain::error::ScenarioError;
use crate::domain::geometry::VoidGeometry;
use crate::domain::job::JobId;
use crate::domain::script::{ScenarioScript, SolverCommand};

const WAVEFORM_ID:   &str = "my_ricker";
const AIR_MATERIAL:  &str = "air";
const VOID_MATERIAL: &str = "void";

/// Build the scenario script for one job
pub fn build(
    geometry:  &VoidGeometry,
    domain:    &DomainConfig,
    gpr:       &GprParams,
    materials: &MaterialConfig,
    id:        &JobId,
) -> Result<ScenarioScript, ScenarioError> {
    // ── Step 1: B-scan positions ──────────────────────────────────────────────
    let trace_positions = trace_positions(gpr, domain)?;
    let step = scan_step(gpr);

    // ── Step 2: Layer stack (air, then road layers top to bottom) ─────────────
    let layer_boxes = layer_stack(domain)?;

    // ── Step 3: The void must sit fully inside the domain ─────────────────────
    geometry.check_bounds(domain, 0.0)?;

    // ── Step 4: Assemble commands ─────────────────────────────────────────────
    let (x, y, z) = (domain.size_x, domain.size_y, domain.size_z());
    let dx        = gpr.spatial_resolution;
    let surface_z = domain.air_gap;

    let mut commands = vec![
        SolverCommand::Title(format!("Road void evolution {id} (B-scan)")),
        SolverCommand::Domain([x, y, z]),
        SolverCommand::Discretisation([dx, dx, dx]),
        SolverCommand::TimeWindowNs(gpr.time_window_ns),
        SolverCommand::Material {
            permittivity: materials.air.permittivity,
            conductivity: materials.air.conductivity,
            name:         AIR_MATERIAL.to_string(),
        },
    ];

    for layer in &domain.layers {
        commands.push(SolverCommand::Material {
            permittivity: layer.permittivity,
            conductivity: layer.conductivity,
            name:         layer.name.clone(),
        });
    }

    commands.push(SolverCommand::Material {
        permittivity: materials.void.permittivity,
        conductivity: materials.void.conductivity,
        name:         VOID_MATERIAL.to_string(),
    });

    commands.extend(layer_boxes);
    commands.push(void_box(geometry, surface_z));

    let antenna = [trace_positions[0], y / 2.0, surface_z];
    commands.extend([
        SolverCommand::RickerWaveform { frequency_mhz: gpr.frequency_mhz, id: WAVEFORM_ID.to_string() },
        SolverCommand::HertzianDipole { position: antenna, waveform_id: WAVEFORM_ID.to_string() },
        SolverCommand::Receiver(antenna),
        SolverCommand::SourceSteps([step, 0.0, 0.0]),
        SolverCommand::ReceiverSteps([step, 0.0, 0.0]),
    ]);

    if gpr.geometry_view {
        commands.push(SolverCommand::GeometryView {
            lower:      [0.0, 0.0, 0.0],
            upper:      [x, y, z],
            resolution: [dx, dx, dx],
            file_name:  format!("geometry_{}", id.stem()),
        });
    }

    Ok(ScenarioScript { id: *id, commands, trace_positions })
}

/// Evenly spaced transmitter x positions for the B-scan
fn trace_positions(gpr: &GprParams, domain: &DomainConfig) -> Result<Vec<f64>, ScenarioError> {
    let (start, end) = (gpr.scan_start_x, gpr.scan_end_x);

    if gpr.num_traces == 0 || !(end > start) || start < 0.0 || end > domain.size_x {
        return Err(ScenarioError::InvalidScanRange { start, end });
    }

    let step = scan_step(gpr);
    Ok((0..gpr.num_traces).map(|i| start + step * i as f64).collect())
}

fn scan_step(gpr: &GprParams) -> f64 {
    if gpr.num_traces > 1 {
        (gpr.scan_end_x - gpr.scan_start_x) / (gpr.num_traces - 1) as f64
    } else {
        0.0
    }
}

/// Air box plus one box per road layer, z-offsets accumulated
/// from the air gap downward into the road.
fn layer_stack(domain: &DomainConfig) -> Result<Vec<SolverCommand>, ScenarioError> {
    let (x, y)  = (domain.size_x, domain.size_y);
    let limit   = domain.max_height.map(|h| h - domain.margin);

    let mut boxes = vec![SolverCommand::Box {
        lower:    [0.0, 0.0, 0.0],
        upper:    [x, y, domain.air_gap],
        material: AIR_MATERIAL.to_string(),
    }];

    let mut top = domain.air_gap;
    for layer in &domain.layers {
        let bottom = top + layer.thickness;

        if let Some(limit) = limit {
            if bottom > limit {
                return Err(ScenarioError::LayerOverflow { accumulated: bottom, limit });
            }
        }

        boxes.push(SolverCommand::Box {
            lower:    [0.0, 0.0, top],
            upper:    [x, y, bottom],
            material: layer.name.clone(),
        });
        top = bottom;
    }

    Ok(boxes)
}

fn void_box(g: &VoidGeometry, surface_z: f64) -> SolverCommand {
    SolverCommand::Box {
        lower:    [g.center_x - g.radius_x, g.center_y - g.radius_y, surface_z + g.depth],
        upper:    [g.center_x + g.radius_x, g.center_y + g.radius_y, surface_z + g.bottom()],
        material: VOID_MATERIAL.to_string(),
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn geometry() -> VoidGeometry {
        VoidGeometry { depth: 0.6, radius_x: 0.1, radius_y: 0.08, center_x: 1.0, center_y: 0.5, height: 0.1 }
    }

    fn build_default() -> Result<ScenarioScript, ScenarioError> {
        build(
            &geometry(),
            &DomainConfig::default(),
            &GprParams::default(),
            &MaterialConfig::default(),
            &JobId::new(1, 2),
        )
    }

    #[test]
    fn test_one_box_per_layer_plus_air_and_void() {
        let script = build_default().unwrap();
        let layers = DomainConfig::default().layers.len();
        assert_eq!(script.boxes().count(), layers + 2);
    }

    #[test]
    fn test_layers_accumulate_top_to_bottom() {
        let script = build_default().unwrap();
        let d      = DomainConfig::default();
        let boxes: Vec<_> = script.boxes().collect();

        // boxes[0] is air, boxes[1..=layers] are road layers
        let mut expected_top = d.air_gap;
        for (i, layer) in d.layers.iter().enumerate() {
            match boxes[i + 1] {
                SolverCommand::Box { lower, upper, material } => {
                    assert_eq!(material, &layer.name);
                    assert!((lower[2] - expected_top).abs() < 1e-12);
                    assert!((upper[2] - (expected_top + layer.thickness)).abs() < 1e-12);
                    expected_top += layer.thickness;
                }
                other => panic!("expected a box, got {other:?}"),
            }
        }
        assert!((expected_top - d.size_z()).abs() < 1e-12);
    }

    #[test]
    fn test_void_box_is_last_and_offset_by_air_gap() {
        let script = build_default().unwrap();
        let last   = script.boxes().last().unwrap().to_string();
        // depth 0.6 + air 0.3 → 0.9, bottom 1.0
        assert_eq!(last, "#box: 0.9 0.42 0.9 1.1 0.58 1 void");
    }

    #[test]
    fn test_trace_positions_evenly_spaced() {
        let script = build_default().unwrap();
        let gpr    = GprParams::default();
        assert_eq!(script.trace_positions.len(), gpr.num_traces as usize);
        assert!((script.trace_positions[0] - gpr.scan_start_x).abs() < 1e-12);
        assert!((script.trace_positions.last().unwrap() - gpr.scan_end_x).abs() < 1e-9);
    }

    #[test]
    fn test_antenna_at_road_surface() {
        let text = build_default().unwrap().render();
        assert!(text.contains("#hertzian_dipole: z 0.2 0.5 0.3 my_ricker"));
        assert!(text.contains("#rx: 0.2 0.5 0.3"));
    }

    #[test]
    fn test_inverted_scan_range_rejected() {
        let mut gpr = GprParams::default();
        gpr.scan_start_x = 1.0;
        gpr.scan_end_x   = 1.0;
        let r = build(&geometry(), &DomainConfig::default(), &gpr, &MaterialConfig::default(), &JobId::new(0, 0));
        assert_eq!(r, Err(ScenarioError::InvalidScanRange { start: 1.0, end: 1.0 }));
    }

    #[test]
    fn test_zero_traces_rejected_without_panic() {
        let mut gpr = GprParams::default();
        gpr.num_traces = 0;
        let r = build(&geometry(), &DomainConfig::default(), &gpr, &MaterialConfig::default(), &JobId::new(0, 0));
        assert!(matches!(r, Err(ScenarioError::InvalidScanRange { .. })));
    }

    #[test]
    fn test_layer_overflow_rejected() {
        let mut d = DomainConfig::default();
        d.max_height = Some(1.0);
        let r = build(&geometry(), &d, &GprParams::default(), &MaterialConfig::default(), &JobId::new(0, 0));
        assert!(matches!(r, Err(ScenarioError::LayerOverflow { .. })));
    }

    #[test]
    fn test_void_outside_domain_rejected() {
        let g = VoidGeometry { center_x: 1.95, ..geometry() };
        let r = build(&g, &DomainConfig::default(), &GprParams::default(), &MaterialConfig::default(), &JobId::new(0, 0));
        assert!(matches!(r, Err(ScenarioError::GeometryOutOfBounds(_))));
    }

    #[test]
    fn test_geometry_view_named_after_job() {
        let mut gpr = GprParams::default();
        gpr.geometry_view = true;
        let s = build(&geometry(), &DomainConfig::default(), &gpr, &MaterialConfig::default(), &JobId::new(3, 1)).unwrap();
        assert!(s.render().contains("geometry_seq_0003_stage_01 f"));
    }

    #[test]
    fn test_render_is_deterministic() {
        assert_eq!(build_default().unwrap().render(), build_default().unwrap().render());
    }
}
