// ABOUTME: Statistical primitives for mood trend and correlation analysis
// ABOUTME: Arithmetic mean, population standard deviation, and Pearson correlation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Solace Wellness
#![allow(clippy::cast_precision_loss)] // scores are small integers; f64 is exact here

//! Statistical helpers used by the insight engine

/// Arithmetic mean; 0.0 for an empty slice
#[must_use]
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divides by n, not n-1); 0.0 below two
/// samples
#[must_use]
pub fn population_std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance = values
        .iter()
        .map(|v| {
            let diff = v - m;
            diff * diff
        })
        .sum::<f64>()
        / values.len() as f64;
    variance.sqrt()
}

/// Pearson correlation coefficient between paired samples.
///
/// `None` when the slices differ in length, hold fewer than two pairs,
/// or either side has zero variance (the coefficient is undefined there).
#[must_use]
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }

    let n = xs.len() as f64;
    let sum_x = xs.iter().sum::<f64>();
    let sum_y = ys.iter().sum::<f64>();
    let sum_xy = xs.iter().zip(ys).map(|(x, y)| x * y).sum::<f64>();
    let sum_xx = xs.iter().map(|x| x * x).sum::<f64>();
    let sum_yy = ys.iter().map(|y| y * y).sum::<f64>();

    let numerator = n.mul_add(sum_xy, -(sum_x * sum_y));
    let denominator =
        (n.mul_add(sum_xx, -(sum_x * sum_x)) * n.mul_add(sum_yy, -(sum_y * sum_y))).sqrt();

    if denominator == 0.0 {
        return None;
    }
    Some(numerator / denominator)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(mean(&[2.0, 4.0, 6.0]), 4.0);
    }

    #[test]
    fn test_population_std_dev() {
        assert_eq!(population_std_dev(&[5.0]), 0.0);
        // population sigma of {2, 4, 4, 4, 5, 5, 7, 9} is exactly 2
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((population_std_dev(&values) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_pearson_perfect_correlation() {
        let xs = [1.0, 2.0, 3.0, 4.0, 5.0];
        let ys = [2.0, 4.0, 6.0, 8.0, 10.0];
        let r = pearson(&xs, &ys).unwrap();
        assert!((r - 1.0).abs() < 1e-12);

        let inverted: Vec<f64> = ys.iter().map(|y| -y).collect();
        let r = pearson(&xs, &inverted).unwrap();
        assert!((r + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_pearson_undefined_cases() {
        assert!(pearson(&[1.0], &[2.0]).is_none());
        assert!(pearson(&[1.0, 2.0], &[3.0]).is_none());
        // zero variance on one side
        assert!(pearson(&[1.0, 2.0, 3.0], &[5.0, 5.0, 5.0]).is_none());
    }
}
