/// Arithmetic mean of `values`. Returns 0.0 for empty input.
///
/// The zero is a default, not a sentinel: callers that need to tell "no
/// grades" apart from a real average must check emptiness themselves.
pub fn average(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Mean of already computed per-subject averages. Returns 0.0 when no subject
/// has grades.
pub fn overall_average(subject_averages: &[f64]) -> f64 {
    average(subject_averages)
}

/// Population standard deviation given a pre-computed mean.
/// Returns 0.0 for empty input.
pub fn stddev(values: &[f64], mean: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;

    variance.sqrt()
}

/// Mean absolute deviation from `mean`. Returns 0.0 for empty input.
pub fn mean_abs_deviation(values: &[f64], mean: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().map(|v| (v - mean).abs()).sum::<f64>() / values.len() as f64
}

/// Rounds to two decimals for display.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_average_empty_is_zero() {
        assert_eq!(average(&[]), 0.0);
        assert_eq!(overall_average(&[]), 0.0);
    }

    #[test]
    fn test_average_stays_in_grade_range() {
        let samples: [&[f64]; 4] = [&[1.0], &[10.0, 10.0], &[1.0, 10.0, 5.5], &[7.25, 3.0, 9.0, 4.5]];
        for values in samples {
            let avg = average(values);
            assert!((1.0..=10.0).contains(&avg), "{avg} out of range");
        }
    }

    #[test]
    fn test_overall_is_mean_of_subject_means() {
        let math = average(&[10.0, 10.0]);
        let history = average(&[4.0]);
        assert!((overall_average(&[math, history]) - 7.0).abs() < EPS);
        assert!((average(&[10.0, 10.0, 4.0]) - 8.0).abs() < EPS);
    }

    #[test]
    fn test_dispersion() {
        let values = [6.0, 8.0, 10.0];
        let mean = average(&values);
        assert!((mean - 8.0).abs() < EPS);
        assert!((mean_abs_deviation(&values, mean) - 4.0 / 3.0).abs() < EPS);
        assert!((stddev(&values, mean) - (8.0f64 / 3.0).sqrt()).abs() < EPS);
        assert_eq!(stddev(&[], 0.0), 0.0);
        assert_eq!(mean_abs_deviation(&[], 0.0), 0.0);
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(7.666_666), 7.67);
        assert_eq!(round2(8.0), 8.0);
    }
}
