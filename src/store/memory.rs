use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::model::Run;

use super::{apply_filter, merge_run, pipeline_scope, RunFilter, RunStore};

/// In-memory run store with the same upsert semantics as [`super::FileStore`]
/// but no persistence. Test backend.
#[derive(Default)]
pub struct MemoryStore {
    runs: RwLock<HashMap<i64, Run>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RunStore for MemoryStore {
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
                merge_run(entry.get_mut(), run);
            }
            std::collections::hash_map::Entry::Vacant(entry) => {
                entry.insert(run);
            }
        }
        Ok(())
    }
}
