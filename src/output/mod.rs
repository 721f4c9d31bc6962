mod progress;
mod styling;
mod summary;
mod tables;

pub use progress::IngestProgress;
pub use styling::{dim, magenta_bold};
pub use summary::{
    print_duration_analysis, print_job_breakdown, print_pipelines, print_stats, print_trends,
};

/// Prints the `CIPulse` banner to stderr.
///
/// Displays the tool name, version, and description at the start of execution.
pub fn print_banner() {
    eprintln!(
        r"
{} {}
  {}
",
        magenta_bold("📡 CIPulse"),
        dim(env!("CARGO_PKG_VERSION")),
        dim("CI/CD Run Telemetry Analytics")
    );
}
