// ============================================================
// Layer 3 — Void Geometry
// ============================================================
// One stage's snapshot of the void, in absolute metres.
//
//   center_x, center_y  — horizontal centre in domain coordinates
//   radius_x, radius_y  — horizontal half-extents
//   depth               — depth of the void's TOP face below the
//                         road surface (positive = downward)
//   height              — vertical extent below the top face
//
// Across the stages of one sequence:
//   depth              non-increasing (void rises)
//   radius_x/y, height non-decreasing (void expands)
//
// Those guarantees are produced by data::trajectory; this
// module only carries the numbers, the physical bounds they
// must respect, and the containment check.

use serde::{Deserialize, Serialize};

use crate::domain::config::{DomainConfig, ValueRange, VoidConfig};
use crate::domain::error::ScenarioError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VoidGeometry {
    pub depth:    f64,
    pub radius_x: f64,
    pub radius_y: f64,
    pub center_x: f64,
    pub center_y: f64,
    pub height:   f64,
}

impl VoidGeometry {
    /// Depth of the void's bottom face below the road surface
    pub fn bottom(&self) -> f64 {
        self.depth + self.height
    }

    /// Verify the void stays inside the domain minus its safety
    /// margin, below `min_clearance` and above the road bottom.
    pub fn check_bounds(&self, domain: &DomainConfig, min_clearance: f64) -> Result<(), ScenarioError> {
        let m   = domain.margin;
        let eps = 1e-9;

        let checks = [
            (self.center_x - self.radius_x >= m - eps,                     "touches the x=0 edge"),
            (self.center_x + self.radius_x <= domain.size_x - m + eps,     "touches the x=size_x edge"),
            (self.center_y - self.radius_y >= m - eps,                     "touches the y=0 edge"),
            (self.center_y + self.radius_y <= domain.size_y - m + eps,     "touches the y=size_y edge"),
            (self.depth >= min_clearance - eps,                            "rises above the minimum clearance"),
            (self.bottom() <= domain.road_depth() - m + eps,               "extends below the road structure"),
            (self.radius_x > 0.0 && self.radius_y > 0.0 && self.height > 0.0, "has a non-positive extent"),
        ];

        match checks.iter().find(|(ok, _)| !ok) {
            None               => Ok(()),
            Some((_, problem)) => Err(ScenarioError::GeometryOutOfBounds(format!("void {problem}: {self:?}"))),
        }
    }
}

// ─── TrajectoryBounds ─────────────────────────────────────────────────────────
/// Physical limits and sampling ranges for one campaign,
/// resolved to absolute metres.
#[derive(Debug, Clone, PartialEq)]
pub struct TrajectoryBounds {
    pub size_x:     f64,
    pub size_y:     f64,
    pub road_depth: f64,
    pub margin:     f64,

    pub depth_range:         ValueRange,
    pub radius_x_range:      ValueRange,
    pub radius_y_range:      ValueRange,
    pub height_range:        ValueRange,
    pub rise_range:          ValueRange,
    pub growth_range:        ValueRange,
    pub height_growth_range: ValueRange,

    pub min_clearance: f64,
    pub max_radius_x:  f64,
    pub max_radius_y:  f64,
    pub max_height:    f64,
}

impl TrajectoryBounds {
    /// Resolve fractions against the domain and reject ranges
    /// that could never produce an in-bounds, monotonic void.
    pub fn from_config(void: &VoidConfig, domain: &DomainConfig) -> Result<Self, ScenarioError> {
        let road_depth = domain.road_depth();
        let bounds = Self {
            size_x:              domain.size_x,
            size_y:              domain.size_y,
            road_depth,
            margin:              domain.margin,
            depth_range:         void.depth_range,
            radius_x_range:      void.radius_x_range,
            radius_y_range:      void.radius_y_range,
            height_range:        void.height_range,
            rise_range:          void.rise_range,
            growth_range:        void.growth_range,
            height_growth_range: void.height_growth_range,
            min_clearance:       void.min_clearance,
            max_radius_x:        void.max_radius_fraction * domain.size_x,
            max_radius_y:        void.max_radius_fraction * domain.size_y,
            max_height:          void.max_height_fraction * road_depth,
        };

        // Clamping the rise at min_clearance must never push a
        // void DOWN, so every initial depth has to start below it.
        if bounds.depth_range.min < bounds.min_clearance {
            return Err(ScenarioError::ConfigValidation(format!(
                "void.depth_range min ({}) is shallower than min_clearance ({})",
                bounds.depth_range.min, bounds.min_clearance
            )));
        }
        if bounds.depth_range.max >= road_depth - bounds.margin {
            return Err(ScenarioError::ConfigValidation(format!(
                "void.depth_range max ({}) leaves no room above the road bottom ({} - margin {})",
                bounds.depth_range.max, road_depth, bounds.margin
            )));
        }
        if bounds.center_x_range().min > bounds.center_x_range().max
            || bounds.center_y_range().min > bounds.center_y_range().max
        {
            return Err(ScenarioError::ConfigValidation(
                "domain too small for the radius cap plus margin on each side".into(),
            ));
        }
        Ok(bounds)
    }

    /// Centres that keep a void of the maximum radius off the edges
    pub fn center_x_range(&self) -> ValueRange {
        ValueRange::new(self.margin + self.max_radius_x, self.size_x - self.margin - self.max_radius_x)
    }

    pub fn center_y_range(&self) -> ValueRange {
        ValueRange::new(self.margin + self.max_radius_y, self.size_y - self.margin - self.max_radius_y)
    }

    /// Height cap for a sequence starting at `initial_depth`.
    /// Since depth only decreases, the bottom face can never
    /// cross `road_depth - margin` under this cap.
    pub fn height_cap(&self, initial_depth: f64) -> f64 {
        self.max_height.min(self.road_depth - self.margin - initial_depth)
    }
}
