use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration file structure for CIPulse.
///
/// Allows users to pin store location, analysis parameters, and the
/// narrative service endpoint across runs. Configuration files are loaded
/// from the current directory or a specified path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Run store location
    #[serde(default)]
    pub store: StoreConfig,

    /// Analysis parameters
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Narrative service integration
    #[serde(default)]
    pub narrative: NarrativeConfig,

    /// Output format preferences
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct StoreConfig {
    /// Path to the run table JSON file (defaults to the platform data dir)
    pub path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AnalysisConfig {
    /// Trailing window size for run-duration anomaly detection
    #[serde(default = "default_sliding_window")]
    pub sliding_window: usize,

    /// Run-duration anomaly multiplier (1.3 = 30% over the window mean)
    #[serde(default = "default_anomaly_threshold")]
    pub anomaly_threshold: f64,

    /// Number of historical runs used for the per-job baseline
    #[serde(default = "default_history_size")]
    pub history_size: usize,

    /// Per-job anomaly threshold on percent change
    #[serde(default = "default_job_anomaly_threshold_pct")]
    pub job_anomaly_threshold_pct: f64,

    /// Maximum number of runs in the job trend pivot
    #[serde(default = "default_trend_window")]
    pub trend_window: usize,

    /// Bounded wait for any single store query, in milliseconds
    #[serde(default = "default_store_timeout_ms")]
    pub store_timeout_ms: u64,

    /// Override for the default per-minute cost rate (in USD) applied to
    /// unrecognized runner types
    #[serde(default)]
    pub cost_per_minute: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct NarrativeConfig {
    /// Narrative service endpoint; narration is disabled when unset
    pub endpoint: Option<String>,

    /// Bearer token for the narrative service
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Default output format
    #[serde(default)]
    pub format: OutputFormat,

    /// Pretty-print JSON output
    #[serde(default)]
    pub pretty: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Summary,
    Json,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            sliding_window: default_sliding_window(),
            anomaly_threshold: default_anomaly_threshold(),
            history_size: default_history_size(),
            job_anomaly_threshold_pct: default_job_anomaly_threshold_pct(),
            trend_window: default_trend_window(),
            store_timeout_ms: default_store_timeout_ms(),
            cost_per_minute: None,
        }
    }
}

fn default_sliding_window() -> usize {
    5
}

fn default_anomaly_threshold() -> f64 {
    1.3
}

fn default_history_size() -> usize {
    5
}

fn default_job_anomaly_threshold_pct() -> f64 {
    25.0
}

fn default_trend_window() -> usize {
    30
}

fn default_store_timeout_ms() -> u64 {
    5000
}

impl Config {
    /// Load configuration from a file.
    ///
    /// Searches for configuration files in this order:
    /// 1. Specified path
    /// 2. ./cipulse.toml
    /// 3. ./cipulse.json
    ///
    /// Returns default configuration if no file is found.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from_path(path);
        }

        let candidates = ["cipulse.toml", "cipulse.json"];

        for candidate in &candidates {
            let path = Path::new(candidate);
            if path.exists() {
                return Self::load_from_path(path);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file path.
    fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

        match extension {
            "toml" => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display())),
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display())),
            _ => toml::from_str(&contents)
                .map_err(anyhow::Error::from)
                .or_else(|_| serde_json::from_str(&contents).map_err(anyhow::Error::from))
                .with_context(|| format!("Failed to parse config file: {}", path.display())),
        }
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::to_string_pretty(self)?,
            _ => toml::to_string_pretty(self)?,
        };

        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.analysis.sliding_window, 5);
        assert_eq!(config.analysis.anomaly_threshold, 1.3);
        assert_eq!(config.analysis.history_size, 5);
        assert_eq!(config.analysis.job_anomaly_threshold_pct, 25.0);
        assert_eq!(config.analysis.trend_window, 30);
        assert_eq!(config.analysis.store_timeout_ms, 5000);
        assert_eq!(config.store.path, None);
        assert_eq!(config.narrative.endpoint, None);
        assert_eq!(config.output.format, OutputFormat::Summary);
    }

    #[test]
    fn test_load_toml_config() {
        let mut temp_file = NamedTempFile::with_suffix(".toml").unwrap();
        let toml_content = r#"
[store]
path = "/var/lib/cipulse/runs.json"

[analysis]
history-size = 10
store-timeout-ms = 250

[narrative]
endpoint = "https://narrate.example.com/v1"

[output]
format = "json"
pretty = true
"#;
        write!(temp_file, "{}", toml_content).unwrap();

        let config = Config::load_from_path(temp_file.path()).unwrap();
        assert_eq!(
            config.store.path,
            Some("/var/lib/cipulse/runs.json".to_string())
        );
        assert_eq!(config.analysis.history_size, 10);
        assert_eq!(config.analysis.store_timeout_ms, 250);
        // Unspecified analysis values keep their defaults
        assert_eq!(config.analysis.sliding_window, 5);
        assert_eq!(
            config.narrative.endpoint,
            Some("https://narrate.example.com/v1".to_string())
        );
        assert_eq!(config.output.format, OutputFormat::Json);
        assert!(config.output.pretty);
    }

    #[test]
    fn test_load_json_config() {
        let mut temp_file = NamedTempFile::with_suffix(".json").unwrap();
        let json_content = r#"{
  "analysis": {
    "job-anomaly-threshold-pct": 40.0
  },
  "output": {
    "format": "json"
  }
}"#;
        write!(temp_file, "{}", json_content).unwrap();

        let config = Config::load_from_path(temp_file.path()).unwrap();
        assert_eq!(config.analysis.job_anomaly_threshold_pct, 40.0);
        assert_eq!(config.output.format, OutputFormat::Json);
    }

    #[test]
    fn test_load_without_candidates_returns_defaults() {
        let temp_dir = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();
        std::env::set_current_dir(&temp_dir).unwrap();

        let config = Config::load(None).unwrap();
        assert_eq!(config.analysis.sliding_window, 5);

        std::env::set_current_dir(original_dir).unwrap();
    }

    #[test]
    fn test_save_round_trips() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("cipulse.toml");

        let mut config = Config::default();
        config.analysis.history_size = 8;
        config.save(&path).unwrap();

        let loaded = Config::load_from_path(&path).unwrap();
        assert_eq!(loaded.analysis.history_size, 8);
    }
}
