// ============================================================
// Layer 6 — Script Store
// ============================================================
// Writes rendered scenario scripts into the output directory.
//
// File naming convention:
//   data/simulations/
//     seq_0000_stage_00.in   ← sequence 0, stage 0
//     seq_0000_stage_01.in
//     ...
//
// Writes always overwrite: re-running a job regenerates the
// same path with the same bytes, never a numbered duplicate.

use std::{
    fs,
    io,
    path::PathBuf,
};

use crate::domain::job::JobId;
use crate::domain::script::ScenarioScript;

#[derive(Debug, Clone)]
pub struct ScriptStore {
    dir: PathBuf,
}

impl ScriptStore {
    /// Creates the directory if it doesn't already exist
    pub fn new(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn path_for(&self, id: &JobId) -> PathBuf {
        self.dir.join(id.script_file_name())
    }

    /// Render and write one script, returning where it landed
    pub fn write(&self, script: &ScenarioScript) -> io::Result<PathBuf> {
        let path = self.path_for(&script.id);
        fs::write(&path, script.render())?;
        tracing::debug!("Wrote scenario script '{}'", path.display());
        Ok(path)
    }
}
