use chrono::{DateTime, Utc};
use log::debug;

use crate::cost::estimate_run_cost;
use crate::error::{CiPulseError, Result};
use crate::model::{Commit, Job, Run, RunPayload, RunStatus};

/// Decodes a raw run payload from JSON.
///
/// A payload that is not valid JSON, is missing the `workflow` block, or
/// lacks the identity fields (`run_id`, `run_number`, `name`) is rejected
/// here, before normalization. Nothing from a rejected payload is ingested.
///
/// # Errors
///
/// Returns `CiPulseError::MalformedPayload` describing the decode failure.
pub fn parse_payload(raw: &str) -> Result<RunPayload> {
    serde_json::from_str(raw).map_err(|e| CiPulseError::MalformedPayload(e.to_string()))
}

/// Normalizes a raw payload into a `Run` ready for upsert.
///
/// Defaulting rules:
/// - missing/invalid `status` becomes `unknown`, missing `trigger` becomes
///   `"manual"`, missing `branch` becomes `"HEAD"`
/// - a non-finite `duration_seconds` becomes `None` (unavailable), a
///   negative one clamps to `0`
/// - `completed_at` falls back to `created_at`; `created_at` falls back to
///   `ingested_at`
/// - an absent commit block gets placeholder sha/message/author
///
/// The cost estimate is computed from the normalized jobs; see
/// [`crate::cost::estimate_run_cost`].
pub fn normalize(payload: RunPayload, ingested_at: DateTime<Utc>, default_rate: f64) -> Run {
    let workflow = payload.workflow;

    let created_at = parse_timestamp(workflow.created_at.as_deref()).unwrap_or(ingested_at);
    let completed_at = parse_timestamp(workflow.completed_at.as_deref()).unwrap_or(created_at);

    let commit = match payload.commit {
        Some(c) => Commit {
            sha: c.sha.unwrap_or_else(|| "0000000".to_string()),
            parent_sha: c.parent_sha,
            message: c.message.unwrap_or_else(|| "No message".to_string()),
            author: c.author.unwrap_or_else(|| "Unknown".to_string()),
        },
        None => Commit {
            sha: "0000000".to_string(),
            parent_sha: None,
            message: "No message".to_string(),
            author: "Unknown".to_string(),
        },
    };

    let jobs: Vec<Job> = payload
        .jobs
        .into_iter()
        .map(|j| Job {
            status: RunStatus::from_raw(j.status.as_deref()),
            duration_seconds: normalize_duration(j.duration_seconds),
            started_at: parse_timestamp(j.started_at.as_deref()),
            completed_at: parse_timestamp(j.completed_at.as_deref()),
            runner_type: j.runner_type,
            name: j.name,
        })
        .collect();

    let cost_usd = estimate_run_cost(&jobs, default_rate);

    debug!(
        "Normalized run {} (#{}) for pipeline '{}'",
        workflow.run_id, workflow.run_number, workflow.name
    );

    Run {
        run_id: workflow.run_id,
        run_number: workflow.run_number,
        pipeline: workflow.name,
        html_url: workflow.html_url,
        status: RunStatus::from_raw(workflow.status.as_deref()),
        trigger: workflow.trigger.unwrap_or_else(|| "manual".to_string()),
        branch: workflow.branch.unwrap_or_else(|| "HEAD".to_string()),
        duration_seconds: normalize_duration(workflow.duration_seconds),
        created_at,
        completed_at,
        commit,
        jobs,
        test_summary: payload.test_summary,
        build_analysis: payload.build_analysis,
        commit_analysis: payload.commit_analysis,
        artifacts: payload.artifacts,
        cost_usd,
    }
}

/// Duration sentinel policy: non-finite values are unavailable, negative
/// values clamp to zero. Durations are never negative downstream.
fn normalize_duration(raw: Option<f64>) -> Option<f64> {
    match raw {
        Some(d) if d.is_finite() => Some(d.max(0.0)),
        _ => None,
    }
}

fn parse_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    raw.and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}
