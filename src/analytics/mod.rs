pub mod attribution;
pub mod breakdown;
pub mod category;
pub mod duration;
pub mod stats;
pub mod trends;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, info};

use crate::config::AnalysisConfig;
use crate::error::{CiPulseError, Result};
use crate::model::{DurationPoint, JobBreakdown, JobTrends, PipelineStats, Run};
use crate::store::{RunFilter, RunStore, SortOrder};

/// Human-readable series label: short date plus run number, e.g.
/// `"Aug 6 (#42)"`. Shared by the duration series and the trend pivot so
/// rows line up across charts.
pub(crate) fn run_label(created_at: DateTime<Utc>, run_number: i64) -> String {
    format!("{} (#{run_number})", created_at.format("%b %-d"))
}

/// The analytics query surface.
///
/// Every query reads one consistent snapshot from the store, computes its
/// result locally, and shares no mutable state with other queries, so an
/// `Engine` can serve any number of them concurrently. Store access is
/// bounded by the configured timeout; expiry is reported as a failed query,
/// never silently retried.
pub struct Engine {
    store: Arc<dyn RunStore>,
    config: AnalysisConfig,
}

impl Engine {
    pub fn new(store: Arc<dyn RunStore>, config: AnalysisConfig) -> Self {
        Self { store, config }
    }

    /// Names of every pipeline the store has seen, sorted ascending.
    pub async fn list_pipelines(&self) -> Result<Vec<String>> {
        self.bounded(self.store.list_pipelines()).await
    }

    /// Persists a normalized run through the store's idempotent upsert.
    pub async fn ingest_run(&self, run: Run) -> Result<()> {
        self.bounded(self.store.upsert_run(run)).await
    }

    /// Fleet-wide summary metrics for a pipeline scope.
    pub async fn get_stats(&self, pipeline: Option<&str>) -> Result<PipelineStats> {
        let all = RunFilter {
            pipeline: pipeline.map(str::to_string),
            ..RunFilter::default()
        };
        let successful = RunFilter {
            success_only: true,
            ..all.clone()
        };

        // The four aggregates are independent reads; run them concurrently
        let (total_runs, successful_runs, median_duration, total_cost) =
            futures::future::try_join4(
                self.bounded(self.store.count_runs(&all)),
                self.bounded(self.store.count_runs(&successful)),
                self.bounded(self.store.duration_median(pipeline)),
                self.bounded(self.store.total_cost(pipeline)),
            )
            .await?;

        debug!("Stats for {pipeline:?}: {total_runs} runs, {successful_runs} successful");

        Ok(PipelineStats {
            total_runs,
            success_rate: stats::success_rate(successful_runs, total_runs),
            median_duration,
            total_cost,
        })
    }

    /// The anomaly-annotated duration series, oldest run first.
    pub async fn get_duration_analysis(&self, pipeline: Option<&str>) -> Result<Vec<DurationPoint>> {
        let filter = RunFilter {
            pipeline: pipeline.map(str::to_string),
            order: SortOrder::Ascending,
            success_only: true,
            ..RunFilter::default()
        };

        let runs = self.bounded(self.store.list_runs(&filter)).await?;

        Ok(duration::analyze_durations(
            &runs,
            self.config.sliding_window,
            self.config.anomaly_threshold,
        ))
    }

    /// Per-job historical comparison for the most recent run carrying jobs,
    /// or for `run_id` when given (history is then the runs older than it).
    ///
    /// # Errors
    ///
    /// Returns `CiPulseError::RunNotFound` when `run_id` names a run the
    /// store does not have (or one without job entries).
    pub async fn get_job_breakdown(
        &self,
        pipeline: Option<&str>,
        run_id: Option<i64>,
    ) -> Result<JobBreakdown> {
        let window_len = self.config.history_size + 1;
        let filter = RunFilter {
            pipeline: pipeline.map(str::to_string),
            order: SortOrder::Descending,
            with_jobs_only: true,
            // Anchored lookups need the full table to locate the run
            limit: run_id.is_none().then_some(window_len),
            ..RunFilter::default()
        };

        let runs = self.bounded(self.store.list_runs(&filter)).await?;

        let window = match run_id {
            None => runs.as_slice(),
            Some(id) => {
                let anchor = runs
                    .iter()
                    .position(|run| run.run_id == id)
                    .ok_or(CiPulseError::RunNotFound(id))?;
                let end = (anchor + window_len).min(runs.len());
                &runs[anchor..end]
            }
        };

        info!(
            "Building job breakdown over {} runs (pipeline: {})",
            window.len(),
            pipeline.unwrap_or("all")
        );

        Ok(breakdown::build_breakdown(
            window,
            self.config.job_anomaly_threshold_pct,
        ))
    }

    /// Name-keyed job duration series over the trend window.
    pub async fn get_job_trends(&self, pipeline: Option<&str>) -> Result<JobTrends> {
        let filter = RunFilter {
            pipeline: pipeline.map(str::to_string),
            order: SortOrder::Ascending,
            success_only: true,
            with_jobs_only: true,
            limit: Some(self.config.trend_window),
        };

        let runs = self.bounded(self.store.list_runs(&filter)).await?;

        Ok(trends::pivot_job_trends(&runs))
    }

    async fn bounded<T>(&self, query: impl Future<Output = Result<T>>) -> Result<T> {
        let timeout_ms = self.config.store_timeout_ms;
        tokio::time::timeout(Duration::from_millis(timeout_ms), query)
            .await
            .map_err(|_| CiPulseError::StoreTimeout(timeout_ms))?
    }
}
