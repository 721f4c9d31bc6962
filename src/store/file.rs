use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use log::{debug, info, warn};
use tokio::sync::RwLock;

use crate::error::{CiPulseError, Result};
use crate::model::Run;

use super::{apply_filter, merge_run, pipeline_scope, RunFilter, RunStore};

/// JSON-file-backed run store.
///
/// The whole table is loaded into memory at open and kept behind an
/// `RwLock`; every upsert rewrites the file through a temp-file rename so a
/// crashed or re-delivered write can never leave a half-written table.
/// Default location is a per-user data directory:
/// - Linux: `~/.local/share/cipulse/runs.json`
/// - macOS: `~/Library/Application Support/cipulse/runs.json`
pub struct FileStore {
    path: PathBuf,
    runs: RwLock<HashMap<i64, Run>>,
}

impl FileStore {
    /// Opens the store at `path`, creating parent directories as needed.
    ///
    /// An existing file that fails to decode is treated as corrupt and the
    /// store starts empty rather than refusing to open; the condition is
    /// logged.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory cannot be created.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| CiPulseError::Store(format!("create {}: {e}", parent.display())))?;
        }

        let runs = if path.exists() {
            Self::load(&path)
        } else {
            HashMap::new()
        };

        info!(
            "Run store at: {} ({} runs loaded)",
            path.display(),
            runs.len()
        );

        Ok(Self {
            path,
            runs: RwLock::new(runs),
        })
    }

    /// Platform default store path (`<data-dir>/cipulse/runs.json`).
    ///
    /// # Errors
    ///
    /// Returns an error if no platform data directory can be determined.
    pub fn default_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| CiPulseError::Store("No data directory found".into()))?;
        Ok(data_dir.join("cipulse").join("runs.json"))
    }

    fn load(path: &Path) -> HashMap<i64, Run> {
        fs::read_to_string(path)
            .ok()
            .and_then(|content| serde_json::from_str(&content).ok())
            .inspect(|_| debug!("Loaded run table from: {}", path.display()))
            .unwrap_or_else(|| {
                warn!(
                    "Failed to load run table at {}, starting empty",
                    path.display()
                );
                HashMap::new()
            })
    }

    /// Writes the full table to a sibling temp file, then renames over the
    /// real path. Callers must hold the write lock.
    fn persist(&self, runs: &HashMap<i64, Run>) -> Result<()> {
        let serialized = serde_json::to_string(runs)
            .map_err(|e| CiPulseError::Store(format!("encode run table: {e}")))?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serialized)
            .map_err(|e| CiPulseError::Store(format!("write {}: {e}", tmp.display())))?;
        fs::rename(&tmp, &self.path)
            .map_err(|e| CiPulseError::Store(format!("rename {}: {e}", self.path.display())))?;

        Ok(())
    }
}

#[async_trait]
impl RunStore for FileStore {
    async fn list_pipelines(&self) -> Result<Vec<String>> {
        let runs = self.runs.read().await;
        let mut names: Vec<String> = runs.values().map(|run| run.pipeline.clone()).collect();
        names.sort();
        names.dedup();
        Ok(names)
    }

    async fn list_runs(&self, filter: &RunFilter) -> Result<Vec<Run>> {
        let runs = self.runs.read().await;
        let snapshot: Vec<Run> = runs.values().cloned().collect();
        Ok(apply_filter(&snapshot, filter))
    }

    async fn count_runs(&self, filter: &RunFilter) -> Result<u64> {
        let runs = self.runs.read().await;
        let snapshot: Vec<Run> = runs.values().cloned().collect();
        Ok(apply_filter(&snapshot, filter).len() as u64)
    }

    async fn duration_median(&self, pipeline: Option<&str>) -> Result<Option<f64>> {
        let runs = self.runs.read().await;
        let snapshot: Vec<Run> = runs.values().cloned().collect();
        let durations: Vec<f64> = pipeline_scope(&snapshot, pipeline)
            .iter()
            .filter_map(|run| run.duration_seconds)
            .collect();
        Ok(crate::analytics::stats::median(&durations))
    }

    async fn total_cost(&self, pipeline: Option<&str>) -> Result<Option<f64>> {
        let runs = self.runs.read().await;
        let snapshot: Vec<Run> = runs.values().cloned().collect();
        let costs: Vec<f64> = pipeline_scope(&snapshot, pipeline)
            .iter()
            .filter_map(|run| run.cost_usd)
            .collect();
        if costs.is_empty() {
            return Ok(None);
        }
        Ok(Some(costs.iter().sum()))
    }

    async fn upsert_run(&self, run: Run) -> Result<()> {
        let mut runs = self.runs.write().await;

        match runs.entry(run.run_id) {
            std::collections::hash_map::Entry::Occupied(mut entry) => {
                debug!("Updating existing run {}", run.run_id);
                merge_run(entry.get_mut(), run);
            }
            std::collections::hash_map::Entry::Vacant(entry) => {
                debug!("Inserting run {}", run.run_id);
                entry.insert(run);
            }
        }

        self.persist(&runs)
    }
}
