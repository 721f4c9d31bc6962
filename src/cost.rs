use crate::model::Job;

/// Per-minute USD rates by runner type, checked in order; first substring
/// match wins. Mirrors GitHub-hosted runner pricing tiers.
const RUNNER_RATES: &[(&str, f64)] = &[
    ("macos", 0.08),
    ("windows", 0.016),
    ("ubuntu", 0.008),
    ("linux", 0.008),
];

pub const DEFAULT_RATE_PER_MINUTE: f64 = 0.008;

/// Looks up the per-minute rate for a runner type. Unrecognized or missing
/// runner types price at the default rate.
pub fn per_minute_rate(runner_type: Option<&str>, default_rate: f64) -> f64 {
    let Some(runner) = runner_type else {
        return default_rate;
    };

    let runner = runner.to_ascii_lowercase();
    RUNNER_RATES
        .iter()
        .find(|(needle, _)| runner.contains(needle))
        .map_or(default_rate, |&(_, rate)| rate)
}

/// Estimates the total cost of a run from its jobs.
///
/// Each job contributes `(duration_seconds / 60) * rate`. Jobs without a
/// known duration contribute nothing; a run where no job has a known
/// duration has no cost estimate at all (`None`, distinct from a free run).
pub fn estimate_run_cost(jobs: &[Job], default_rate: f64) -> Option<f64> {
    let mut priced_any = false;
    let mut total = 0.0;

    for job in jobs {
        let Some(duration) = job.duration_seconds else {
            continue;
        };
        priced_any = true;
        total += (duration / 60.0) * per_minute_rate(job.runner_type.as_deref(), default_rate);
    }

    priced_any.then_some(total)
}
