mod file;
#[cfg(test)]
mod memory;

pub use file::FileStore;
#[cfg(test)]
pub use memory::MemoryStore;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{Run, RunStatus};

/// Ordering of `list_runs` results by creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// Row filter for store reads.
#[derive(Debug, Clone, Default)]
pub struct RunFilter {
    /// Restrict to a single pipeline name.
    pub pipeline: Option<String>,
    pub order: SortOrder,
    pub limit: Option<usize>,
    /// Only runs whose overall status is `success`.
    pub success_only: bool,
    /// Only runs carrying at least one job entry.
    pub with_jobs_only: bool,
}

/// Read/append contract over the durable run table.
///
/// Reads must observe a single consistent snapshot per call; `upsert_run`
/// must be atomic and idempotent on `run_id` so retried deliveries never
/// create duplicate or partially-applied rows.
#[async_trait]
pub trait RunStore: Send + Sync {
    /// Distinct pipeline names, sorted ascending.
    async fn list_pipelines(&self) -> Result<Vec<String>>;

    async fn list_runs(&self, filter: &RunFilter) -> Result<Vec<Run>>;

    async fn count_runs(&self, filter: &RunFilter) -> Result<u64>;

    /// Median duration across runs with a known duration, `None` when no
    /// run in scope has one.
    async fn duration_median(&self, pipeline: Option<&str>) -> Result<Option<f64>>;

    /// Summed cost estimate, `None` when no run in scope carries cost data.
    async fn total_cost(&self, pipeline: Option<&str>) -> Result<Option<f64>>;

    /// Inserts or updates the run keyed by `run_id`. Re-delivery overwrites
    /// only mutable fields (status, timing, nested blobs), never identity.
    async fn upsert_run(&self, run: Run) -> Result<()>;
}

/// Applies a `RunFilter` to an in-memory snapshot. Shared by the provided
/// store implementations.
pub(crate) fn apply_filter(runs: &[Run], filter: &RunFilter) -> Vec<Run> {
    let mut selected: Vec<Run> = runs
        .iter()
        .filter(|run| {
            filter
                .pipeline
                .as_deref()
                .is_none_or(|name| run.pipeline == name)
        })
        .filter(|run| !filter.success_only || run.status == RunStatus::Success)
        .filter(|run| !filter.with_jobs_only || !run.jobs.is_empty())
        .cloned()
        .collect();

    selected.sort_by(|a, b| match filter.order {
        SortOrder::Ascending => (a.created_at, a.run_id).cmp(&(b.created_at, b.run_id)),
        SortOrder::Descending => (b.created_at, b.run_id).cmp(&(a.created_at, a.run_id)),
    });

    if let Some(limit) = filter.limit {
        selected.truncate(limit);
    }

    selected
}

pub(crate) fn pipeline_scope<'a>(runs: &'a [Run], pipeline: Option<&str>) -> Vec<&'a Run> {
    runs.iter()
        .filter(|run| pipeline.is_none_or(|name| run.pipeline == name))
        .collect()
}

/// Merges a re-delivered run into an existing row: mutable fields win from
/// the new delivery, identity fields keep their first-seen values.
pub(crate) fn merge_run(existing: &mut Run, incoming: Run) {
    existing.status = incoming.status;
    existing.duration_seconds = incoming.duration_seconds;
    existing.completed_at = incoming.completed_at;
    existing.jobs = incoming.jobs;
    existing.test_summary = incoming.test_summary;
    existing.build_analysis = incoming.build_analysis;
    existing.commit_analysis = incoming.commit_analysis;
    existing.artifacts = incoming.artifacts;
    existing.cost_usd = incoming.cost_usd;
}
