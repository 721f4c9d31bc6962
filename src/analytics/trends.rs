use indexmap::IndexSet;

use crate::model::{JobTrends, Run, RunStatus, TrendRow};

use super::run_label;

/// Pivots an ascending window of successful runs into a name-keyed time
/// series for charting.
///
/// Each run becomes one row keyed by its date+run-number label. A row only
/// carries a cell for jobs that succeeded with a known duration in that run;
/// a job that was skipped, failed, or unmeasured leaves its cell absent, not
/// zero. Job names are returned in first-seen order for stable legend and
/// series construction downstream.
pub fn pivot_job_trends(runs: &[Run]) -> JobTrends {
    let mut job_names: IndexSet<String> = IndexSet::new();

    let chart_data = runs
        .iter()
        .map(|run| {
            let mut row = TrendRow {
                name: run_label(run.created_at, run.run_number),
                durations: indexmap::IndexMap::new(),
            };

            for job in &run.jobs {
                if job.status != RunStatus::Success {
                    continue;
                }
                let Some(duration) = job.duration_seconds else {
                    continue;
                };
                job_names.insert(job.name.clone());
                row.durations.insert(job.name.clone(), duration);
            }

            row
        })
        .collect();

    JobTrends {
        chart_data,
        job_names: job_names.into_iter().collect(),
    }
}
