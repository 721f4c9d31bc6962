mod analytics;
mod cli;
mod config;
mod cost;
mod error;
mod ingest;
mod model;
mod narrative;
mod output;
mod store;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use log::info;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    output::print_banner();

    let cli = Cli::parse();
    info!("Starting CIPulse - CI/CD Run Telemetry Analytics");
    cli.execute().await?;

    Ok(())
}
