use std::cmp::Ordering;

pub(crate) fn cmp_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Standard statistical median: middle value for an odd count, mean of the
/// two middle values for an even count. `None` for an empty slice, never 0.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| cmp_f64(*a, *b));

    let len = sorted.len();
    let mid = len / 2;
    if len % 2 == 1 {
        Some(sorted[mid])
    } else {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    }
}

/// Success rate as a percentage with one decimal place. Zero (not NaN) when
/// there are no runs at all.
#[allow(clippy::cast_precision_loss)]
pub fn success_rate(successful: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round1((successful as f64 / total as f64) * 100.0)
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_median_odd_count() {
        assert_eq!(median(&[300.0, 100.0, 200.0]), Some(200.0));
    }

    #[test]
    fn test_median_even_count_interpolates() {
        assert_eq!(median(&[100.0, 200.0, 300.0, 400.0]), Some(250.0));
    }

    #[test]
    fn test_median_single_value() {
        assert_eq!(median(&[42.0]), Some(42.0));
    }

    #[test]
    fn test_median_empty_is_none_not_zero() {
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn test_success_rate_zero_total_is_zero_not_nan() {
        assert_eq!(success_rate(0, 0), 0.0);
    }

    #[test]
    fn test_success_rate_rounds_to_one_decimal() {
        // 2/3 = 66.666... -> 66.7
        assert_eq!(success_rate(2, 3), 66.7);
        assert_eq!(success_rate(3, 3), 100.0);
    }
}
