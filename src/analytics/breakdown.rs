use std::collections::HashMap;

use crate::model::{JobBreakdown, JobBreakdownEntry, Run, RunStatus};

use super::attribution::attribute;
use super::category::categorize_job;
use super::stats::{round1, round2};

/// Per-job history collected from the window of runs preceding the anchor.
#[derive(Default)]
struct JobHistory<'a> {
    /// Durations of successful occurrences with a known duration, oldest to
    /// newest.
    durations: Vec<f64>,
    /// The most recent historical run in which the job succeeded — the
    /// baseline used for attribution and `last_healthy_run_sha`.
    baseline: Option<&'a Run>,
}

/// Builds the per-job breakdown for the anchor (most recent) run.
///
/// `runs` is most-recent-first: the anchor run followed by up to the history
/// window of older runs, all carrying at least one job entry.
///
/// Three paths:
/// - no runs: empty breakdown with placeholder metadata
/// - exactly one run: every job reported with no historical comparison and
///   `is_anomaly = false` across the board — failed jobs included, since no
///   baseline exists to compare against. NOTE: this intentionally differs
///   from the multi-run path below, which flags failures unconditionally;
///   kept as-is pending product clarification.
/// - two or more runs: full historical comparison per job
///
/// A job's percent change exists only when the job currently succeeded with
/// a known duration and its historical average is strictly positive. The
/// anomaly flag fires on percent change above `anomaly_threshold_pct`, or
/// unconditionally on outright job failure.
pub fn build_breakdown(runs: &[Run], anomaly_threshold_pct: f64) -> JobBreakdown {
    let Some(most_recent) = runs.first() else {
        return JobBreakdown {
            pipeline_name: "N/A".to_string(),
            commit_message: "N/A".to_string(),
            commit_sha: "N/A".to_string(),
            jobs: vec![],
        };
    };

    // Single-qualifying-run path: no comparison possible, nothing flagged.
    if runs.len() < 2 {
        let jobs = most_recent
            .jobs
            .iter()
            .map(|job| JobBreakdownEntry {
                job_name: job.name.clone(),
                job_category: categorize_job(&job.name).to_string(),
                status: job.status,
                current_duration: job.duration_seconds,
                historical_avg: None,
                historical_durations: vec![],
                percent_change: None,
                is_anomaly: false,
                last_healthy_run_sha: None,
                heuristic_summary: None,
                attribution_confidence: None,
            })
            .collect();

        return JobBreakdown {
            pipeline_name: most_recent.pipeline.clone(),
            commit_message: most_recent.commit.message.clone(),
            commit_sha: most_recent.commit.sha.clone(),
            jobs,
        };
    }

    let history = &runs[1..];
    let histories = collect_job_histories(history);

    let jobs = most_recent
        .jobs
        .iter()
        .map(|job| {
            let job_history = histories.get(job.name.as_str());
            let durations = job_history.map(|h| h.durations.as_slice()).unwrap_or(&[]);
            let baseline = job_history.and_then(|h| h.baseline);

            #[allow(clippy::cast_precision_loss)]
            let historical_avg = (!durations.is_empty())
                .then(|| durations.iter().sum::<f64>() / durations.len() as f64);

            let percent_change = match (job.status, job.duration_seconds, historical_avg) {
                (RunStatus::Success, Some(current), Some(avg)) if avg > 0.0 => {
                    Some((current - avg) / avg * 100.0)
                }
                _ => None,
            };

            let is_anomaly = percent_change.is_some_and(|pct| pct > anomaly_threshold_pct)
                || job.status == RunStatus::Failure;

            let attribution = match baseline {
                Some(baseline_run) if is_anomaly => Some(attribute(most_recent, baseline_run)),
                _ => None,
            };

            JobBreakdownEntry {
                job_name: job.name.clone(),
                job_category: categorize_job(&job.name).to_string(),
                status: job.status,
                current_duration: job.duration_seconds,
                historical_avg: historical_avg.map(round2),
                historical_durations: durations.to_vec(),
                percent_change: percent_change.map(round1),
                is_anomaly,
                last_healthy_run_sha: baseline.map(|run| run.commit.sha.clone()),
                heuristic_summary: attribution.as_ref().and_then(|a| a.summary.clone()),
                attribution_confidence: attribution.map(|a| a.confidence),
            }
        })
        .collect();

    JobBreakdown {
        pipeline_name: most_recent.pipeline.clone(),
        commit_message: most_recent.commit.message.clone(),
        commit_sha: most_recent.commit.sha.clone(),
        jobs,
    }
}

/// Scans the historical runs oldest-first, so duration lists come out in
/// chronological order and the last successful occurrence seen for a job is
/// its most recent one.
fn collect_job_histories(history: &[Run]) -> HashMap<&str, JobHistory<'_>> {
    let mut histories: HashMap<&str, JobHistory<'_>> = HashMap::new();

    for run in history.iter().rev() {
        for job in &run.jobs {
            let entry = histories.entry(job.name.as_str()).or_default();
            if job.status == RunStatus::Success {
                if let Some(duration) = job.duration_seconds {
                    entry.durations.push(duration);
                }
                entry.baseline = Some(run);
            }
        }
    }

    histories
}
