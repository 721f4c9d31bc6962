use async_trait::async_trait;
use log::warn;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, USER_AGENT};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{CiPulseError, Result};
use crate::model::{JobBreakdown, JobBreakdownEntry};

/// Structured context handed to the narrative collaborator: the anomalous
/// breakdown entries plus the commit they point at.
#[derive(Debug, Clone, Serialize)]
pub struct NarrativePrompt {
    pub pipeline_name: String,
    pub commit_sha: String,
    pub commit_message: String,
    pub anomalous_jobs: Vec<JobBreakdownEntry>,
}

impl NarrativePrompt {
    /// Builds a prompt from a breakdown, or `None` when no job is
    /// anomalous — there is nothing to narrate.
    pub fn from_breakdown(breakdown: &JobBreakdown) -> Option<Self> {
        let anomalous_jobs: Vec<JobBreakdownEntry> = breakdown
            .jobs
            .iter()
            .filter(|entry| entry.is_anomaly)
            .cloned()
            .collect();

        if anomalous_jobs.is_empty() {
            return None;
        }

        Some(Self {
            pipeline_name: breakdown.pipeline_name.clone(),
            commit_sha: breakdown.commit_sha.clone(),
            commit_message: breakdown.commit_message.clone(),
            anomalous_jobs,
        })
    }
}

/// Free-text enrichment returned by the collaborator. Every field is
/// optional; a partially-filled report is still usable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NarrativeReport {
    pub root_cause: Option<String>,
    pub confidence: Option<String>,
    pub remediation: Option<String>,
    #[serde(default)]
    pub relevant_files: Vec<String>,
}

/// Free-text root-cause narration for anomalous jobs.
///
/// This is an optional second stage on top of the structured heuristic: it
/// can be swapped or disabled without touching the anomaly math, and core
/// analytics never block on it.
#[async_trait]
pub trait NarrativeGenerator: Send + Sync {
    async fn generate(&self, prompt: &NarrativePrompt) -> Result<NarrativeReport>;
}

/// HTTP JSON client for a remote narrative service.
pub struct HttpNarrativeClient {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpNarrativeClient {
    /// Creates a client for the given endpoint, with an optional bearer
    /// token for authentication.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is not a valid URL or the HTTP
    /// client cannot be constructed.
    pub fn new(endpoint: &str, api_key: Option<&str>) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| CiPulseError::Narrative(format!("invalid endpoint: {e}")))?;

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("cipulse/0.3"));

        if let Some(key) = api_key {
            let value = HeaderValue::from_str(&format!("Bearer {key}"))
                .map_err(|e| CiPulseError::Narrative(format!("invalid api key: {e}")))?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| CiPulseError::Narrative(format!("client build failed: {e}")))?;

        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl NarrativeGenerator for HttpNarrativeClient {
    async fn generate(&self, prompt: &NarrativePrompt) -> Result<NarrativeReport> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(prompt)
            .send()
            .await
            .map_err(|e| CiPulseError::Narrative(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(CiPulseError::Narrative(format!(
                "service returned {}",
                response.status()
            )));
        }

        response
            .json::<NarrativeReport>()
            .await
            .map_err(|e| CiPulseError::Narrative(format!("malformed response: {e}")))
    }
}

/// Runs the optional narrative stage over a finished breakdown.
///
/// Returns `None` when no job is anomalous or when the collaborator fails
/// in any way — the structured breakdown stands on its own (heuristic-only
/// degradation). Collaborator failure is logged, never propagated.
pub async fn enrich_breakdown(
    generator: &dyn NarrativeGenerator,
    breakdown: &JobBreakdown,
) -> Option<NarrativeReport> {
    let prompt = NarrativePrompt::from_breakdown(breakdown)?;

    match generator.generate(&prompt).await {
        Ok(report) => Some(report),
        Err(e) => {
            warn!("Narrative generation unavailable, continuing heuristic-only: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AttributionConfidence, RunStatus};

    fn breakdown_with_anomaly() -> JobBreakdown {
        JobBreakdown {
            pipeline_name: "Backend CI".to_string(),
            commit_message: "feat: add elasticsearch indexing".to_string(),
            commit_sha: "anomaly-sha".to_string(),
            jobs: vec![JobBreakdownEntry {
                job_name: "unit-tests".to_string(),
                job_category: "test".to_string(),
                status: RunStatus::Success,
                current_duration: Some(300.0),
                historical_avg: Some(120.0),
                historical_durations: vec![120.0],
                percent_change: Some(150.0),
                is_anomaly: true,
                last_healthy_run_sha: Some("baseline-sha".to_string()),
                heuristic_summary: Some("Dependency lockfile changed.".to_string()),
                attribution_confidence: Some(AttributionConfidence::High),
            }],
        }
    }

    fn healthy_breakdown() -> JobBreakdown {
        let mut breakdown = breakdown_with_anomaly();
        breakdown.jobs[0].is_anomaly = false;
        breakdown
    }

    #[test]
    fn test_prompt_requires_an_anomaly() {
        assert!(NarrativePrompt::from_breakdown(&healthy_breakdown()).is_none());
        let prompt = NarrativePrompt::from_breakdown(&breakdown_with_anomaly()).unwrap();
        assert_eq!(prompt.anomalous_jobs.len(), 1);
        assert_eq!(prompt.commit_sha, "anomaly-sha");
    }

    #[tokio::test]
    async fn test_generate_parses_report() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/narrate")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "root_cause": "New elasticsearch tests dominate the suite",
                    "confidence": "high",
                    "remediation": "Split the indexing tests into a nightly job",
                    "relevant_files": ["search/indexer.ts"]
                }"#,
            )
            .create_async()
            .await;

        let client =
            HttpNarrativeClient::new(&format!("{}/narrate", server.url()), Some("key")).unwrap();
        let prompt = NarrativePrompt::from_breakdown(&breakdown_with_anomaly()).unwrap();

        let report = client.generate(&prompt).await.unwrap();

        mock.assert_async().await;
        assert_eq!(report.confidence.as_deref(), Some("high"));
        assert_eq!(report.relevant_files, vec!["search/indexer.ts".to_string()]);
    }

    #[tokio::test]
    async fn test_server_error_is_a_narrative_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/narrate")
            .with_status(500)
            .create_async()
            .await;

        let client = HttpNarrativeClient::new(&format!("{}/narrate", server.url()), None).unwrap();
        let prompt = NarrativePrompt::from_breakdown(&breakdown_with_anomaly()).unwrap();

        let result = client.generate(&prompt).await;

        assert!(matches!(result, Err(CiPulseError::Narrative(_))));
    }

    #[tokio::test]
    async fn test_malformed_body_is_a_narrative_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/narrate")
            .with_status(200)
            .with_body("not json at all")
            .create_async()
            .await;

        let client = HttpNarrativeClient::new(&format!("{}/narrate", server.url()), None).unwrap();
        let prompt = NarrativePrompt::from_breakdown(&breakdown_with_anomaly()).unwrap();

        let result = client.generate(&prompt).await;

        assert!(matches!(result, Err(CiPulseError::Narrative(_))));
    }

    #[tokio::test]
    async fn test_enrich_degrades_to_heuristic_only_on_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/narrate")
            .with_status(503)
            .create_async()
            .await;

        let client = HttpNarrativeClient::new(&format!("{}/narrate", server.url()), None).unwrap();

        let report = enrich_breakdown(&client, &breakdown_with_anomaly()).await;

        // The breakdown itself is untouched; enrichment just comes back empty
        assert!(report.is_none());
    }

    #[tokio::test]
    async fn test_enrich_skips_healthy_breakdowns() {
        // No HTTP server at all: a healthy breakdown must not even attempt
        // the call.
        let client = HttpNarrativeClient::new("http://127.0.0.1:1/narrate", None).unwrap();

        let report = enrich_breakdown(&client, &healthy_breakdown()).await;

        assert!(report.is_none());
    }

    #[test]
    fn test_invalid_endpoint_is_rejected() {
        let result = HttpNarrativeClient::new("not a url", None);
        assert!(matches!(result, Err(CiPulseError::Narrative(_))));
    }
}
