use crate::model::{AttributionConfidence, Run};

use super::stats::round1;

/// Files-changed count above which a commit counts as high churn.
const CHURN_THRESHOLD: u64 = 20;

/// Relative test-count growth (5%) above which the test-growth signal fires.
const TEST_GROWTH_FACTOR: f64 = 1.05;

/// Outcome of the root-cause heuristic for one anomalous job.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribution {
    pub confidence: AttributionConfidence,
    /// One sentence per fired signal, or `None` when nothing fired. Never an
    /// empty string.
    pub summary: Option<String>,
}

/// Infers attribution for an anomalous job from its run and the baseline
/// run in which the job last succeeded.
///
/// Confidence is `High` only when the anomalous run's commit parent SHA
/// equals the baseline run's commit SHA — no intervening commits, a clean
/// causal link. Any mismatch, including a missing parent SHA, is `Medium`.
/// `Low` is reserved for the downstream narrative generator.
///
/// The summary reports only what the structured signals directly support:
/// test-count growth beyond 5%, a changed dependency lockfile, and commit
/// churn beyond 20 files. No signal, no sentence; nothing is invented for
/// missing data.
pub fn attribute(recent: &Run, baseline: &Run) -> Attribution {
    let confidence = if recent.commit.parent_sha.as_deref() == Some(baseline.commit.sha.as_str()) {
        AttributionConfidence::High
    } else {
        AttributionConfidence::Medium
    };

    let mut observations: Vec<String> = Vec::new();

    if let (Some(recent_tests), Some(baseline_tests)) =
        (recent.test_summary.as_ref(), baseline.test_summary.as_ref())
    {
        #[allow(clippy::cast_precision_loss)]
        if baseline_tests.total > 0
            && recent_tests.total as f64 > baseline_tests.total as f64 * TEST_GROWTH_FACTOR
        {
            let growth_pct = round1(
                (recent_tests.total as f64 - baseline_tests.total as f64)
                    / baseline_tests.total as f64
                    * 100.0,
            );
            observations.push(format!(
                "Test count grew from {} to {} (+{growth_pct}%).",
                baseline_tests.total, recent_tests.total
            ));
        }
    }

    if let Some(analysis) = recent.commit_analysis.as_ref() {
        if analysis.lockfile_changed {
            observations.push("Dependency lockfile changed.".to_string());
        }
        if analysis.total_files > CHURN_THRESHOLD {
            observations.push(format!(
                "High code churn: {} files changed in the latest commit.",
                analysis.total_files
            ));
        }
    }

    let summary = if observations.is_empty() {
        None
    } else {
        Some(observations.join(" "))
    };

    Attribution {
        confidence,
        summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CommitAnalysis, RunStatus, TestSummary};
    use crate::store::test_support::run;

    fn tests_totaling(total: u64) -> TestSummary {
        TestSummary {
            passed: total,
            failed: 0,
            total,
            suites: 10,
        }
    }

    fn quiet_analysis() -> CommitAnalysis {
        CommitAnalysis {
            total_files: 3,
            lockfile_changed: false,
            test_files_count: 1,
            src_files_count: 2,
        }
    }

    mod confidence_tests {
        use super::*;

        #[test]
        fn test_contiguous_commits_give_high_confidence() {
            let baseline = run(100, "backend", RunStatus::Success, 0);
            let mut recent = run(101, "backend", RunStatus::Success, 10);
            recent.commit.parent_sha = Some(baseline.commit.sha.clone());

            let attribution = attribute(&recent, &baseline);

            assert_eq!(attribution.confidence, AttributionConfidence::High);
        }

        #[test]
        fn test_intervening_commits_give_medium_confidence() {
            let baseline = run(100, "backend", RunStatus::Success, 0);
            let mut recent = run(105, "backend", RunStatus::Success, 10);
            recent.commit.parent_sha = Some("some-other-sha".to_string());

            let attribution = attribute(&recent, &baseline);

            assert_eq!(attribution.confidence, AttributionConfidence::Medium);
        }

        #[test]
        fn test_missing_parent_sha_gives_medium_confidence() {
            let baseline = run(100, "backend", RunStatus::Success, 0);
            let mut recent = run(101, "backend", RunStatus::Success, 10);
            recent.commit.parent_sha = None;

            let attribution = attribute(&recent, &baseline);

            assert_eq!(attribution.confidence, AttributionConfidence::Medium);
        }
    }

    mod summary_tests {
        use super::*;

        #[test]
        fn test_no_signals_omits_summary_entirely() {
            let mut baseline = run(100, "backend", RunStatus::Success, 0);
            baseline.test_summary = Some(tests_totaling(100));
            let mut recent = run(101, "backend", RunStatus::Success, 10);
            recent.test_summary = Some(tests_totaling(100));
            recent.commit_analysis = Some(quiet_analysis());

            let attribution = attribute(&recent, &baseline);

            assert_eq!(attribution.summary, None);
        }

        #[test]
        fn test_test_growth_reports_counts_and_percentage() {
            let mut baseline = run(100, "backend", RunStatus::Success, 0);
            baseline.test_summary = Some(tests_totaling(100));
            let mut recent = run(101, "backend", RunStatus::Success, 10);
            recent.test_summary = Some(tests_totaling(150));

            let attribution = attribute(&recent, &baseline);

            assert_eq!(
                attribution.summary.as_deref(),
                Some("Test count grew from 100 to 150 (+50%).")
            );
        }

        #[test]
        fn test_growth_within_five_percent_does_not_fire() {
            let mut baseline = run(100, "backend", RunStatus::Success, 0);
            baseline.test_summary = Some(tests_totaling(100));
            let mut recent = run(101, "backend", RunStatus::Success, 10);
            recent.test_summary = Some(tests_totaling(105));

            let attribution = attribute(&recent, &baseline);

            assert_eq!(attribution.summary, None);
        }

        #[test]
        fn test_missing_test_summaries_do_not_fire_growth() {
            let baseline = run(100, "backend", RunStatus::Success, 0);
            let mut recent = run(101, "backend", RunStatus::Success, 10);
            recent.test_summary = Some(tests_totaling(500));

            let attribution = attribute(&recent, &baseline);

            assert_eq!(attribution.summary, None);
        }

        #[test]
        fn test_lockfile_change_is_reported() {
            let baseline = run(100, "backend", RunStatus::Success, 0);
            let mut recent = run(101, "backend", RunStatus::Success, 10);
            recent.commit_analysis = Some(CommitAnalysis {
                lockfile_changed: true,
                ..quiet_analysis()
            });

            let attribution = attribute(&recent, &baseline);

            assert_eq!(
                attribution.summary.as_deref(),
                Some("Dependency lockfile changed.")
            );
        }

        #[test]
        fn test_churn_above_twenty_files_is_reported() {
            let baseline = run(100, "backend", RunStatus::Success, 0);
            let mut recent = run(101, "backend", RunStatus::Success, 10);
            recent.commit_analysis = Some(CommitAnalysis {
                total_files: 45,
                ..quiet_analysis()
            });

            let attribution = attribute(&recent, &baseline);

            assert_eq!(
                attribution.summary.as_deref(),
                Some("High code churn: 45 files changed in the latest commit.")
            );
        }

        #[test]
        fn test_churn_of_exactly_twenty_files_does_not_fire() {
            let baseline = run(100, "backend", RunStatus::Success, 0);
            let mut recent = run(101, "backend", RunStatus::Success, 10);
            recent.commit_analysis = Some(CommitAnalysis {
                total_files: 20,
                ..quiet_analysis()
            });

            let attribution = attribute(&recent, &baseline);

            assert_eq!(attribution.summary, None);
        }

        #[test]
        fn test_all_signals_join_one_sentence_per_item() {
            let mut baseline = run(100, "backend", RunStatus::Success, 0);
            baseline.test_summary = Some(tests_totaling(100));
            let mut recent = run(101, "backend", RunStatus::Success, 10);
            recent.test_summary = Some(tests_totaling(150));
            recent.commit_analysis = Some(CommitAnalysis {
                total_files: 25,
                lockfile_changed: true,
                test_files_count: 5,
                src_files_count: 20,
            });

            let attribution = attribute(&recent, &baseline);

            assert_eq!(
                attribution.summary.as_deref(),
                Some(
                    "Test count grew from 100 to 150 (+50%). \
                     Dependency lockfile changed. \
                     High code churn: 25 files changed in the latest commit."
                )
            );
        }
    }
}
