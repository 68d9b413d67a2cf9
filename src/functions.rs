pub fn mean(xs: impl Iterator<Item = f64>) -> f64 {
    let mut count = 0;
    let mut total = 0.0;
    for x in xs {
        count += 1;
        total += x;
    }
    assert_ne!(count, 0);
    total / count as f64
}

/// Mean and sample standard deviation (divisor `n - 1`).
///
/// The standard deviation of a single value is `NaN`.
pub fn mean_and_stddev(xs: impl Iterator<Item = f64> + Clone) -> (f64, f64) {
    let n = xs.clone().count();
    let m = mean(xs.clone());
    if n < 2 {
        return (m, f64::NAN);
    }
    let s = (xs.map(|x| (x - m).powi(2)).sum::<f64>() / (n - 1) as f64).sqrt();
    (m, s)
}

pub fn mse(xs: impl Iterator<Item = f64> + Clone) -> f64 {
    let n = xs.clone().count() as f64;
    let m = mean(xs.clone());
    xs.map(|x| (x - m).powi(2)).sum::<f64>() / n
}

/// Coefficient of determination of `predicted` against `actual`.
///
/// When `actual` has no variance the score is `1.0` for a perfect prediction
/// and `0.0` otherwise.
pub fn r2_score(actual: &[f64], predicted: &[f64]) -> f64 {
    assert_eq!(actual.len(), predicted.len());
    let m = mean(actual.iter().copied());
    let residual = actual
        .iter()
        .zip(predicted.iter())
        .map(|(y, p)| (y - p).powi(2))
        .sum::<f64>();
    let total = actual.iter().map(|y| (y - m).powi(2)).sum::<f64>();
    if total == 0.0 {
        if residual == 0.0 {
            1.0
        } else {
            0.0
        }
    } else {
        1.0 - residual / total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stddev_uses_sample_divisor() {
        let (m, s) = mean_and_stddev([2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0].iter().copied());
        assert_eq!(m, 5.0);
        assert!((s - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);

        let (m, s) = mean_and_stddev(std::iter::once(3.0));
        assert_eq!(m, 3.0);
        assert!(s.is_nan());
    }

    #[test]
    fn r2_score_works() {
        assert_eq!(r2_score(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]), 1.0);
        assert_eq!(r2_score(&[1.0, 2.0, 3.0], &[2.0, 2.0, 2.0]), 0.0);
        assert_eq!(r2_score(&[1.0, 2.0, 3.0], &[3.0, 2.0, 1.0]), -3.0);
    }

    #[test]
    fn r2_score_of_constant_target() {
        assert_eq!(r2_score(&[4.0, 4.0], &[4.0, 4.0]), 1.0);
        assert_eq!(r2_score(&[4.0, 4.0], &[4.0, 5.0]), 0.0);
        assert_eq!(r2_score(&[4.0], &[4.0]), 1.0);
    }
}
