// ============================================================
// Layer 6 — Dataset Metadata
// ============================================================
// Writes metadata.yaml: one entry per enumerated job, so the
// downstream tooling can map every .in / .out file back to the
// void that produced it without re-running the generator.
//
// Example:
//   - sequence_id: 0
//     stage: 0
//     input_file: seq_0000_stage_00.in
//     void_params:
//       depth: 0.8123
//       radius_x: 0.0914
//       ...
//   - sequence_id: 0
//     stage: 1
//     input_file: seq_0000_stage_01.in
//     error: "invalid scan range: ..."

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::domain::geometry::VoidGeometry;
use crate::domain::job::JobPlan;

pub const METADATA_FILE: &str = "metadata.yaml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataEntry {
    pub sequence_id: u32,
    pub stage:       u32,
    pub input_file:  String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub void_params: Option<VoidGeometry>,

    /// Construction error for jobs that could not be built
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&JobPlan> for MetadataEntry {
    fn from(plan: &JobPlan) -> Self {
        let (void_params, error) = match &plan.job {
            Ok(job) => (Some(job.geometry), None),
            Err(e)  => (None, Some(e.to_string())),
        };
        Self {
            sequence_id: plan.id.sequence_id,
            stage:       plan.id.stage_id,
            input_file:  plan.id.script_file_name(),
            void_params,
            error,
        }
    }
}

/// Write metadata.yaml for `plans` into `dir`, in plan order
pub fn write_metadata(dir: impl AsRef<Path>, plans: &[JobPlan]) -> Result<PathBuf> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)
        .with_context(|| format!("Cannot create output directory '{}'", dir.display()))?;

    let entries: Vec<MetadataEntry> = plans.iter().map(MetadataEntry::from).collect();
    let path = dir.join(METADATA_FILE);
    let yaml = serde_yaml::to_string(&entries)?;

    fs::write(&path, yaml)
        .with_context(|| format!("Cannot write metadata to '{}'", path.display()))?;

    tracing::info!("Wrote metadata for {} jobs to '{}'", entries.len(), path.display());
    Ok(path)
}
