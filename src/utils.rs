use std::time::Duration;

use tracing::warn;
use tracing_subscriber::EnvFilter;

pub fn to_millis(duration: Duration) -> u64 {
    (duration.as_secs() * 1_000) + (duration.subsec_nanos() / 1_000_000) as u64
}

/// Installs the fmt subscriber, filtered by `RUST_LOG` and defaulting to `info`.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// `numerator / denominator`, or 0 if nothing was counted.
pub fn ratio(numerator: u32, denominator: u32) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Min-max scaling into [0, 1]. A column without range (all values equal) cannot be scaled
/// and maps to all zeros.
pub fn min_max_normalize(values: &[f64], column: &str) -> Vec<f64> {

    let min = values.iter().cloned().fold(std::f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(std::f64::NEG_INFINITY, f64::max);
    let range = max - min;

    if values.is_empty() || !range.is_finite() || range <= 0.0 {
        if !values.is_empty() {
            warn!("Column '{}' has no range ({} values, min = max = {}), using 0 for every entry",
                column, values.len(), min);
        }
        return vec![0.0; values.len()];
    }

    values.iter().map(|value| (value - min) / range).collect()
}

/// Arithmetic mean and sample standard deviation (n - 1 denominator). The deviation is `None`
/// for fewer than two values.
pub fn mean_and_std(values: &[f64]) -> (f64, Option<f64>) {
    if values.is_empty() {
        return (0.0, None);
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;

    if values.len() < 2 {
        return (mean, None);
    }

    let squared_deviations: f64 = values.iter().map(|value| (value - mean).powi(2)).sum();
    (mean, Some((squared_deviations / (n - 1.0)).sqrt()))
}

#[cfg(test)]
mod tests {

    use std::f64::EPSILON;
    use std::time::Duration;
    use crate::utils;

    fn within_epsilon(value: f64, expected: f64) -> bool {
        (value - expected).abs() < EPSILON
    }

    #[test]
    fn millis() {
        assert_eq!(utils::to_millis(Duration::new(2, 5_000_000)), 2_005);
    }

    #[test]
    fn ratio_guards_zero_denominator() {
        assert!(within_epsilon(utils::ratio(1, 2), 0.5));
        assert_eq!(utils::ratio(0, 0), 0.0);
    }

    #[test]
    fn min_max() {
        let scaled = utils::min_max_normalize(&[2.0, 4.0, 3.0], "test");
        assert_eq!(scaled, vec![0.0, 1.0, 0.5]);
    }

    #[test]
    fn min_max_constant_column() {
        let scaled = utils::min_max_normalize(&[7.5, 7.5, 7.5], "test");
        assert_eq!(scaled, vec![0.0, 0.0, 0.0]);
        assert!(scaled.iter().all(|value| value.is_finite()));

        assert!(utils::min_max_normalize(&[], "test").is_empty());
    }

    #[test]
    fn sample_std() {
        let (mean, std) = utils::mean_and_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert!(within_epsilon(mean, 5.0));
        assert!((std.unwrap() - 2.138089935).abs() < 1e-6);

        let (mean, std) = utils::mean_and_std(&[500.0]);
        assert!(within_epsilon(mean, 500.0));
        assert!(std.is_none());
    }
}
