use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use super::styling::{bright_green, bright_yellow};

/// Progress bar for batch payload ingestion
pub struct IngestProgress {
    pb: ProgressBar,
}

impl IngestProgress {
    pub fn start(total: usize) -> Self {
        let pb = ProgressBar::new(total as u64);
        pb.set_draw_target(ProgressDrawTarget::stderr());
        pb.set_style(
            ProgressStyle::default_bar()
                .template("  {msg} [{bar:30}] {pos}/{len}")
                .unwrap(),
        );
        pb.set_message(bright_yellow("Ingesting runs").to_string());
        Self { pb }
    }

    pub fn record(&self, file: &str) {
        self.pb.set_message(bright_yellow(file).to_string());
        self.pb.inc(1);
    }

    pub fn finish(self, ingested: usize, rejected: usize) {
        let message = if rejected == 0 {
            format!("Ingested {ingested} runs ✓")
        } else {
            format!("Ingested {ingested} runs, rejected {rejected} ✓")
        };
        self.pb.finish_with_message(bright_green(message).to_string());
        eprintln!();
    }
}
