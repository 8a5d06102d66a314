/// Arithmetic mean. `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n - 1 denominator). `None` below two points.
pub fn sample_std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let n = values.len() as f64;
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (n - 1.0);
    Some(variance.sqrt())
}

/// Ordinary least squares fit of `ys` against `xs`. Returns (slope, intercept),
/// or `None` when fewer than two points or all `xs` coincide.
///
/// Works on centred data so large `xs` (epoch-scale seconds) do not cancel
/// out; a constant `ys` yields a slope of exactly zero.
pub fn linear_regression(xs: &[f64], ys: &[f64]) -> Option<(f64, f64)> {
    let n = xs.len().min(ys.len());
    if n < 2 { return None; }
    let (xs, ys) = (&xs[..n], &ys[..n]);

    let mean_x = mean(xs)?;
    let mean_y = mean(ys)?;
    // shifting y by a constant leaves the slope unchanged
    let y0 = ys[0];

    let sxx: f64 = xs.iter().map(|x| (x - mean_x).powi(2)).sum();
    if sxx <= f64::EPSILON * mean_x.abs().max(1.0) { return None; }
    let sxy: f64 = xs.iter().zip(ys).map(|(x, y)| (x - mean_x) * (y - y0)).sum();

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;

    Some((slope, intercept))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_and_sample_std() {
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_eq!(mean(&v), Some(5.0));
        // population std is 2.0; sample std is sqrt(32 / 7)
        let s = sample_std_dev(&v).unwrap();
        assert!((s - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn std_needs_two_points() {
        assert_eq!(sample_std_dev(&[]), None);
        assert_eq!(sample_std_dev(&[3.0]), None);
        assert_eq!(sample_std_dev(&[3.0, 3.0]), Some(0.0));
    }

    #[test]
    fn regression_recovers_exact_line() {
        let xs: Vec<f64> = (0..10).map(|i| i as f64 * 60.0).collect();
        let ys: Vec<f64> = xs.iter().map(|x| 0.5 + 0.01 * x).collect();
        let (slope, intercept) = linear_regression(&xs, &ys).unwrap();
        assert!((slope - 0.01).abs() < 1e-9);
        assert!((intercept - 0.5).abs() < 1e-9);
    }

    #[test]
    fn regression_rejects_vertical_data() {
        assert_eq!(linear_regression(&[5.0, 5.0, 5.0], &[1.0, 2.0, 3.0]), None);
        assert_eq!(linear_regression(&[1.0], &[1.0]), None);
    }

    #[test]
    fn regression_of_constant_series_is_exactly_flat() {
        for c in [0.7, 1.3, 2.7] {
            for (n, step) in [(24, 3600.0), (1000, 5.0), (17_280, 5.0)] {
                let xs: Vec<f64> = (0..n).map(|i| i as f64 * step).collect();
                let ys = vec![c; n];
                let (slope, intercept) = linear_regression(&xs, &ys).unwrap();
                assert_eq!(slope, 0.0, "c={} n={} step={}", c, n, step);
                assert!((intercept - c).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn regression_is_stable_at_epoch_scale() {
        // x in unix seconds around 2024
        let xs: Vec<f64> = (0..500).map(|i| 1.7e9 + i as f64 * 5.0).collect();
        let ys: Vec<f64> = xs.iter().map(|x| 2.0 + 1e-4 * (x - 1.7e9)).collect();
        let (slope, _) = linear_regression(&xs, &ys).unwrap();
        assert!((slope - 1e-4).abs() < 1e-10);
    }
}
