use crate::model::{DurationPoint, Run};

use super::stats::round2;
use super::run_label;

/// Walks a chronologically ascending sequence of successful runs and
/// produces the anomaly-annotated duration series.
///
/// For each run the cumulative average covers every run up to and including
/// it (the lifetime trend line). The anomaly check compares against the mean
/// of the `window` immediately preceding runs only, and a run is flagged
/// when its duration exceeds that mean by more than `threshold` (1.3 = 30%
/// over). The first `window` runs are never flagged (insufficient history —
/// intentional, not a gap).
///
/// Runs without a known duration are skipped entirely; they are neither
/// plotted nor counted toward either average.
pub fn analyze_durations(runs: &[Run], window: usize, threshold: f64) -> Vec<DurationPoint> {
    let entries: Vec<(&Run, f64)> = runs
        .iter()
        .filter_map(|run| run.duration_seconds.map(|d| (run, d)))
        .collect();

    let mut cumulative_sum = 0.0;

    entries
        .iter()
        .enumerate()
        .map(|(i, &(run, duration))| {
            cumulative_sum += duration;
            #[allow(clippy::cast_precision_loss)]
            let cumulative_avg = round2(cumulative_sum / (i + 1) as f64);

            let is_anomaly = i >= window && {
                let window_sum: f64 = entries[i - window..i].iter().map(|&(_, d)| d).sum();
                #[allow(clippy::cast_precision_loss)]
                let window_mean = window_sum / window as f64;
                duration > window_mean * threshold
            };

            DurationPoint {
                run_number: run.run_number,
                label: run_label(run.created_at, run.run_number),
                duration_seconds: duration,
                cumulative_avg,
                is_anomaly,
            }
        })
        .collect()
}
