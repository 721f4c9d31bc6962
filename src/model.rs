use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Terminal status of a run or job.
///
/// Anything the harvester reports outside of `success`/`failure` (cancelled,
/// skipped, in-progress leftovers) collapses to `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
    Failure,
    #[serde(other)]
    Unknown,
}

impl RunStatus {
    pub fn from_raw(raw: Option<&str>) -> Self {
        match raw.map(str::to_ascii_lowercase).as_deref() {
            Some("success") => Self::Success,
            Some("failure") => Self::Failure,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Test counts reported for a whole run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSummary {
    pub passed: u64,
    pub failed: u64,
    pub total: u64,
    pub suites: u64,
}

/// Churn signals extracted from the run's head commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitAnalysis {
    pub total_files: u64,
    pub lockfile_changed: bool,
    pub test_files_count: u64,
    pub src_files_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildAnalysis {
    pub cache_status: String,
    pub build_size_kb: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    pub name: String,
    pub size_kb: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Commit {
    pub sha: String,
    pub parent_sha: Option<String>,
    pub message: String,
    pub author: String,
}

/// One named unit of work within a run. `name` is the join key for
/// historical comparison across runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub name: String,
    pub status: RunStatus,
    /// `None` means the duration was never measured. It is excluded from
    /// averages and comparisons, never coerced to zero.
    pub duration_seconds: Option<f64>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub runner_type: Option<String>,
}

/// A normalized, persisted pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub run_id: i64,
    pub run_number: i64,
    pub pipeline: String,
    pub html_url: Option<String>,
    pub status: RunStatus,
    pub trigger: String,
    pub branch: String,
    pub duration_seconds: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub commit: Commit,
    pub jobs: Vec<Job>,
    pub test_summary: Option<TestSummary>,
    pub build_analysis: Option<BuildAnalysis>,
    pub commit_analysis: Option<CommitAnalysis>,
    pub artifacts: Vec<Artifact>,
    pub cost_usd: Option<f64>,
}

// --- Raw ingest payload ------------------------------------------------------
//
// Mirrors the JSON the harvester posts. Everything outside the workflow
// identity fields is optional; the normalizer supplies defaults.

#[derive(Debug, Clone, Deserialize)]
pub struct RunPayload {
    pub workflow: WorkflowPayload,
    pub commit: Option<CommitPayload>,
    #[serde(default)]
    pub jobs: Vec<JobPayload>,
    pub test_summary: Option<TestSummary>,
    pub build_analysis: Option<BuildAnalysis>,
    pub commit_analysis: Option<CommitAnalysis>,
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowPayload {
    pub run_id: i64,
    pub run_number: i64,
    pub name: String,
    pub html_url: Option<String>,
    pub status: Option<String>,
    pub trigger: Option<String>,
    pub branch: Option<String>,
    pub duration_seconds: Option<f64>,
    pub created_at: Option<String>,
    pub completed_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobPayload {
    pub name: String,
    pub status: Option<String>,
    pub duration_seconds: Option<f64>,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
    pub runner_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitPayload {
    pub sha: Option<String>,
    pub parent_sha: Option<String>,
    pub message: Option<String>,
    pub author: Option<String>,
}

// --- Derived query outputs ---------------------------------------------------

/// Fleet-wide summary for a pipeline scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineStats {
    pub total_runs: u64,
    pub success_rate: f64,
    pub median_duration: Option<f64>,
    pub total_cost: Option<f64>,
}

/// One point of the anomaly-annotated duration series. Recomputed from the
/// run sequence on every query, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DurationPoint {
    pub run_number: i64,
    pub label: String,
    pub duration_seconds: f64,
    pub cumulative_avg: f64,
    pub is_anomaly: bool,
}

/// How directly an anomaly is linked to the immediately preceding commit.
/// `Low` is reserved for the downstream narrative generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributionConfidence {
    High,
    Medium,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobBreakdownEntry {
    pub job_name: String,
    pub job_category: String,
    pub status: RunStatus,
    pub current_duration: Option<f64>,
    pub historical_avg: Option<f64>,
    /// Durations of successful historical occurrences, oldest to newest.
    pub historical_durations: Vec<f64>,
    pub percent_change: Option<f64>,
    pub is_anomaly: bool,
    pub last_healthy_run_sha: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heuristic_summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribution_confidence: Option<AttributionConfidence>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobBreakdown {
    pub pipeline_name: String,
    pub commit_message: String,
    pub commit_sha: String,
    pub jobs: Vec<JobBreakdownEntry>,
}

/// One charting row: the run label plus a column per job that succeeded with
/// a known duration in that run. Missing jobs produce no cell, not a zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendRow {
    pub name: String,
    #[serde(flatten)]
    pub durations: IndexMap<String, f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobTrends {
    pub chart_data: Vec<TrendRow>,
    /// Distinct job names across the window, in first-seen order.
    pub job_names: Vec<String>,
}
