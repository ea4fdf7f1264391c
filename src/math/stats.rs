//! Descriptive statistics, trapezoidal integration and the paired t-test.

use statrs::distribution::{ContinuousCDF, StudentsT};

/// Arithmetic mean; `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n − 1 denominator); `None` for fewer than 2 values.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    Some((ss / (values.len() as f64 - 1.0)).sqrt())
}

/// Trapezoidal-rule integral of `y` over `x`.
///
/// Returns `0.0` for fewer than two points.
pub fn trapezoid(x: &[f64], y: &[f64]) -> f64 {
    x.windows(2)
        .zip(y.windows(2))
        .map(|(xs, ys)| 0.5 * (xs[1] - xs[0]) * (ys[0] + ys[1]))
        .sum()
}

/// Coefficient of determination `1 − SS_res / SS_tot`.
///
/// `None` when the observations have zero variance (R² undefined) or lengths
/// differ.
pub fn r_squared(observed: &[f64], predicted: &[f64]) -> Option<f64> {
    if observed.len() != predicted.len() {
        return None;
    }
    let m = mean(observed)?;
    let ss_tot: f64 = observed.iter().map(|y| (y - m) * (y - m)).sum();
    if !(ss_tot > 0.0) {
        return None;
    }
    let ss_res: f64 = observed
        .iter()
        .zip(predicted.iter())
        .map(|(y, f)| (y - f) * (y - f))
        .sum();
    let r2 = 1.0 - ss_res / ss_tot;
    if r2.is_nan() { None } else { Some(r2) }
}

/// Outcome of a paired-sample t-test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairedTTest {
    pub t_statistic: f64,
    pub df: f64,
    pub p_value: f64,
}

/// Two-sided paired-sample t-test of `x` against `y` (matched by position).
///
/// `None` for fewer than 2 pairs or mismatched lengths. Zero-variance
/// differences give `p = 1` when the mean difference is 0 and `p = 0`
/// otherwise.
pub fn paired_t_test(x: &[f64], y: &[f64]) -> Option<PairedTTest> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }
    let diffs: Vec<f64> = x.iter().zip(y.iter()).map(|(a, b)| a - b).collect();
    if diffs.iter().any(|d| !d.is_finite()) {
        return None;
    }
    let n = diffs.len() as f64;
    let df = n - 1.0;
    let d_mean = mean(&diffs)?;
    let d_std = sample_std(&diffs)?;

    if d_std == 0.0 {
        let (t_statistic, p_value) = if d_mean == 0.0 {
            (0.0, 1.0)
        } else {
            (d_mean.signum() * f64::INFINITY, 0.0)
        };
        return Some(PairedTTest {
            t_statistic,
            df,
            p_value,
        });
    }

    let t_statistic = d_mean / (d_std / n.sqrt());
    let dist = StudentsT::new(0.0, 1.0, df).ok()?;
    let p_value = (2.0 * dist.cdf(-t_statistic.abs())).clamp(0.0, 1.0);
    Some(PairedTTest {
        t_statistic,
        df,
        p_value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn trapezoid_matches_hand_computed_piecewise_linear() {
        // Segments: [0,2] 0→1 (area 1), [2,5] 1→1 (area 3), [5,6] 1→3 (area 2).
        let x = [0.0, 2.0, 5.0, 6.0];
        let y = [0.0, 1.0, 1.0, 3.0];
        assert!((trapezoid(&x, &y) - 6.0).abs() < 1e-12);
        assert_eq!(trapezoid(&[1.0], &[5.0]), 0.0);
    }

    #[test]
    fn r_squared_perfect_and_undefined() {
        let y = [1.0, 2.0, 3.0];
        assert_eq!(r_squared(&y, &y), Some(1.0));
        assert_eq!(r_squared(&[2.0, 2.0], &[1.0, 3.0]), None);
        let r2 = r_squared(&y, &[2.0, 2.0, 2.0]).unwrap();
        assert!(r2.abs() < 1e-12);
    }

    #[test]
    fn paired_t_test_matches_reference_value() {
        // diffs = [1, 2, 3]: mean 2, sd 1, t = 2·√3 ≈ 3.4641, df = 2.
        // For df = 2 the two-sided p is 1 − t/√(t² + 2) ≈ 0.07418.
        let x = [2.0, 4.0, 6.0];
        let y = [1.0, 2.0, 3.0];
        let res = paired_t_test(&x, &y).unwrap();
        assert!((res.t_statistic - 2.0 * 3.0_f64.sqrt()).abs() < 1e-12);
        assert_eq!(res.df, 2.0);
        assert!((res.p_value - 0.074180).abs() < 1e-4, "p = {}", res.p_value);
    }

    #[test]
    fn paired_t_test_degenerate_cases() {
        assert!(paired_t_test(&[1.0], &[2.0]).is_none());
        assert!(paired_t_test(&[1.0, 2.0], &[1.0]).is_none());

        let same = paired_t_test(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(same.p_value, 1.0);

        let shifted = paired_t_test(&[2.0, 3.0, 4.0], &[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(shifted.p_value, 0.0);
    }

    proptest! {
        #[test]
        fn trapezoid_is_linear_in_y(
            ys in prop::collection::vec(0.0f64..5.0, 2..30),
            scale in 0.0f64..10.0,
        ) {
            let xs: Vec<f64> = (0..ys.len()).map(|i| i as f64 * 0.5).collect();
            let scaled: Vec<f64> = ys.iter().map(|y| y * scale).collect();
            let lhs = trapezoid(&xs, &scaled);
            let rhs = scale * trapezoid(&xs, &ys);
            prop_assert!((lhs - rhs).abs() < 1e-9 * (1.0 + rhs.abs()));
        }
    }
}
