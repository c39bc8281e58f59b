//! Summary statistics over fragment sizes

use std::collections::HashSet;

pub fn mean(values: &[usize]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<usize>() as f64 / values.len() as f64
}

/// Sample standard deviation (n - 1 denominator); 0 for fewer than two values
pub fn sample_std_dev(values: &[usize]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let sum_sq: f64 = values.iter().map(|&v| (v as f64 - m).powi(2)).sum();
    (sum_sq / (values.len() - 1) as f64).sqrt()
}

/// Number of distinct sizes
pub fn unique_count(values: &[usize]) -> usize {
    values.iter().collect::<HashSet<_>>().len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_and_std_dev() {
        let values = [2, 4, 4, 4, 5, 5, 7, 9];
        assert_eq!(mean(&values), 5.0);
        let expected = (32.0f64 / 7.0).sqrt();
        assert!((sample_std_dev(&values) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_inputs() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(sample_std_dev(&[]), 0.0);
        assert_eq!(sample_std_dev(&[42]), 0.0);
        assert_eq!(unique_count(&[]), 0);
    }

    #[test]
    fn test_unique_count() {
        assert_eq!(unique_count(&[100, 250, 100, 3000, 250]), 3);
    }
}
