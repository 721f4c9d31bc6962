/// Ordered substring rules for job category inference; first match wins.
/// The order is load-bearing: a job named "build-and-test" classifies as
/// "test" because the test rule comes first.
const CATEGORY_RULES: &[(&str, &str)] = &[
    ("test", "test"),
    ("build", "build"),
    ("lint", "lint"),
    ("deploy", "deploy"),
    ("dependency", "dependency"),
];

/// Infers a presentation category from a job name. Case-insensitive;
/// unmatched names fall back to "unknown". Never feeds into anomaly
/// arithmetic.
pub fn categorize_job(job_name: &str) -> &'static str {
    let name = job_name.to_ascii_lowercase();
    CATEGORY_RULES
        .iter()
        .find(|(needle, _)| name.contains(needle))
        .map_or("unknown", |&(_, category)| category)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_rule_matches() {
        assert_eq!(categorize_job("unit-tests"), "test");
        assert_eq!(categorize_job("build-docker"), "build");
        assert_eq!(categorize_job("lint-check"), "lint");
        assert_eq!(categorize_job("deploy-staging"), "deploy");
        assert_eq!(categorize_job("dependency-audit"), "dependency");
    }

    #[test]
    fn test_first_rule_wins_on_ties() {
        // Contains both "build" and "test"; the test rule is checked first
        assert_eq!(categorize_job("build-and-test"), "test");
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        assert_eq!(categorize_job("Integration-Tests"), "test");
        assert_eq!(categorize_job("LINT"), "lint");
    }

    #[test]
    fn test_unmatched_names_default_to_unknown() {
        assert_eq!(categorize_job("publish-docs"), "unknown");
        assert_eq!(categorize_job(""), "unknown");
    }
}
