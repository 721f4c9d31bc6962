use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

use crate::analytics::Engine;
use crate::config::{Config, OutputFormat};
use crate::cost::DEFAULT_RATE_PER_MINUTE;
use crate::ingest;
use crate::narrative::{enrich_breakdown, HttpNarrativeClient, NarrativeReport};
use crate::output;
use crate::store::FileStore;

#[derive(Parser)]
#[command(name = "cipulse")]
#[command(author, version, about = "CI/CD Run Telemetry Analytics", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Run store location (overrides the config file)
    #[arg(short, long, global = true, env = "CIPULSE_STORE")]
    store: Option<PathBuf>,

    /// Write the result as JSON to this file
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Print JSON to stdout instead of tables
    #[arg(short, long, global = true, default_value_t = false)]
    json: bool,

    #[arg(short, long, global = true, default_value_t = false)]
    pretty: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        #[arg(default_value = "cipulse.toml")]
        path: PathBuf,
    },
    /// Ingest raw run payload files into the store
    Ingest {
        /// JSON payload files, one run each
        files: Vec<PathBuf>,
    },
    /// Fleet-wide health statistics
    Stats {
        #[arg(short = 'P', long)]
        pipeline: Option<String>,
    },
    /// Anomaly-annotated run duration series
    Duration {
        #[arg(short = 'P', long)]
        pipeline: Option<String>,
    },
    /// Per-job breakdown with anomaly attribution
    Jobs {
        #[arg(short = 'P', long)]
        pipeline: Option<String>,

        /// Anchor the breakdown on a specific run instead of the latest
        #[arg(long)]
        run_id: Option<i64>,

        /// Enrich anomalous jobs through the narrative service
        #[arg(long, default_value_t = false)]
        narrate: bool,

        /// Bearer token for the narrative service
        #[arg(long, env = "CIPULSE_NARRATIVE_KEY", hide_env_values = true)]
        narrative_key: Option<String>,
    },
    /// Per-job duration trends over recent runs
    Trends {
        #[arg(short = 'P', long)]
        pipeline: Option<String>,
    },
    /// List pipelines present in the store
    Pipelines,
}

/// Breakdown plus the optional narrative stage, for JSON output.
#[derive(Serialize)]
struct JobsReport {
    #[serde(flatten)]
    breakdown: crate::model::JobBreakdown,
    #[serde(skip_serializing_if = "Option::is_none")]
    narrative: Option<NarrativeReport>,
}

impl Cli {
    pub async fn execute(&self) -> Result<()> {
        // Init is the one command that runs without a store behind it
        if let Commands::Init { path } = &self.command {
            Config::default().save(path)?;
            info!("Wrote default configuration to: {}", path.display());
            return Ok(());
        }

        let config = Config::load(self.config.as_deref())?;
        let engine = self.build_engine(&config)?;

        match &self.command {
            Commands::Init { .. } => Ok(()),
            Commands::Ingest { files } => self.execute_ingest(&engine, &config, files).await,
            Commands::Stats { pipeline } => {
                let stats = engine.get_stats(pipeline.as_deref()).await?;
                self.emit(&config, &stats, || {
                    output::print_stats(&stats, pipeline.as_deref());
                })
            }
            Commands::Duration { pipeline } => {
                let points = engine.get_duration_analysis(pipeline.as_deref()).await?;
                self.emit(&config, &points, || output::print_duration_analysis(&points))
            }
            Commands::Jobs {
                pipeline,
                run_id,
                narrate,
                narrative_key,
            } => {
                let breakdown = engine
                    .get_job_breakdown(pipeline.as_deref(), *run_id)
                    .await?;

                let narrative = if *narrate {
                    self.narrate(&config, narrative_key.as_deref(), &breakdown)
                        .await
                } else {
                    None
                };

                let report = JobsReport {
                    breakdown,
                    narrative,
                };
                self.emit(&config, &report, || {
                    output::print_job_breakdown(&report.breakdown, report.narrative.as_ref());
                })
            }
            Commands::Trends { pipeline } => {
                let trends = engine.get_job_trends(pipeline.as_deref()).await?;
                self.emit(&config, &trends, || output::print_trends(&trends))
            }
            Commands::Pipelines => {
                let names = engine.list_pipelines().await?;
                self.emit(&config, &names, || output::print_pipelines(&names))
            }
        }
    }

    fn build_engine(&self, config: &Config) -> Result<Engine> {
        let store_path = match (&self.store, &config.store.path) {
            (Some(path), _) => path.clone(),
            (None, Some(path)) => PathBuf::from(path),
            (None, None) => FileStore::default_path()?,
        };

        let store = FileStore::open(store_path)?;
        Ok(Engine::new(Arc::new(store), config.analysis.clone()))
    }

    async fn execute_ingest(
        &self,
        engine: &Engine,
        config: &Config,
        files: &[PathBuf],
    ) -> Result<()> {
        if files.is_empty() {
            warn!("No payload files given, nothing to ingest");
            return Ok(());
        }

        let default_rate = config
            .analysis
            .cost_per_minute
            .unwrap_or(DEFAULT_RATE_PER_MINUTE);

        let progress = output::IngestProgress::start(files.len());
        let mut ingested = 0;
        let mut rejected = 0;

        for file in files {
            progress.record(&file.display().to_string());

            let raw = std::fs::read_to_string(file)
                .with_context(|| format!("Failed to read payload file: {}", file.display()))?;

            match ingest::parse_payload(&raw) {
                Ok(payload) => {
                    let run = ingest::normalize(payload, chrono::Utc::now(), default_rate);
                    engine.ingest_run(run).await?;
                    ingested += 1;
                }
                Err(e) => {
                    warn!("Rejected {}: {e}", file.display());
                    rejected += 1;
                }
            }
        }

        progress.finish(ingested, rejected);
        info!("Ingest complete: {ingested} stored, {rejected} rejected");

        Ok(())
    }

    async fn narrate(
        &self,
        config: &Config,
        key_override: Option<&str>,
        breakdown: &crate::model::JobBreakdown,
    ) -> Option<NarrativeReport> {
        let Some(endpoint) = config.narrative.endpoint.as_deref() else {
            warn!("--narrate requested but no narrative endpoint is configured");
            return None;
        };

        let api_key = key_override.or(config.narrative.api_key.as_deref());

        match HttpNarrativeClient::new(endpoint, api_key) {
            Ok(client) => enrich_breakdown(&client, breakdown).await,
            Err(e) => {
                warn!("Narrative client unavailable: {e}");
                None
            }
        }
    }

    fn emit<T: Serialize>(&self, config: &Config, value: &T, render: impl FnOnce()) -> Result<()> {
        let as_json =
            self.json || self.output.is_some() || config.output.format == OutputFormat::Json;
        if !as_json {
            render();
            return Ok(());
        }

        let json_output = if self.pretty || config.output.pretty {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_string(value)?
        };

        if let Some(output_path) = &self.output {
            std::fs::write(output_path, json_output)?;
            info!("Result written to: {}", output_path.display());
        } else {
            println!("{}", json_output);
        }

        Ok(())
    }
}
