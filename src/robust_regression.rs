//! Robust simple linear regression
//!
//! Fits y = slope * x + intercept with a Huber M-estimator, solved by iteratively reweighted least
//! squares (IRLS). Residual scale is re-estimated on each iteration from the normalized median
//! absolute residual.
//!

use statrs::statistics::{Data, Median};

use crate::errors::{ManormError, ManormResult};

/// Huber loss tuning constant, giving 95% efficiency for normally distributed errors
const HUBER_T: f64 = 1.345;

/// Normal distribution 0.75 quantile, used to turn the MAD into a consistent scale estimate
const MAD_NORMAL_CONSTANT: f64 = 0.674_489_750_196_081_7;

pub struct HuberSettings {
    pub t: f64,
    pub max_iterations: usize,

    /// Convergence is reached when no parameter changes by more than this value
    pub tolerance: f64,
}

impl Default for HuberSettings {
    fn default() -> Self {
        Self {
            t: HUBER_T,
            max_iterations: 50,
            tolerance: 1e-8,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LinearFit {
    pub intercept: f64,
    pub slope: f64,
}

impl LinearFit {
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

#[derive(Debug)]
pub struct RobustFit {
    pub fit: LinearFit,

    /// Final robust residual scale estimate
    pub scale: f64,

    pub iterations: usize,
    pub converged: bool,
}

/// Weighted least squares fit of y on x
///
fn weighted_least_squares(x: &[f64], y: &[f64], w: &[f64]) -> ManormResult<LinearFit> {
    assert_eq!(x.len(), y.len());
    assert_eq!(x.len(), w.len());

    let sw = w.iter().sum::<f64>();
    let mean_x = x.iter().zip(w).map(|(x, w)| x * w).sum::<f64>() / sw;
    let mean_y = y.iter().zip(w).map(|(y, w)| y * w).sum::<f64>() / sw;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    for ((x, y), w) in x.iter().zip(y).zip(w) {
        let dx = x - mean_x;
        sxx += w * dx * dx;
        sxy += w * dx * (y - mean_y);
    }

    // Relative check against the spread of x, so that scaling of x doesn't trigger this case
    let sxx_limit = f64::EPSILON * sw * (1.0 + mean_x * mean_x);
    if !(sxx > sxx_limit) {
        return Err(ManormError::SingularFit { count: x.len() });
    }

    let slope = sxy / sxx;
    Ok(LinearFit {
        intercept: mean_y - slope * mean_x,
        slope,
    })
}

/// Ordinary least squares fit of y on x
///
pub fn least_squares(x: &[f64], y: &[f64]) -> ManormResult<LinearFit> {
    if x.len() < 2 {
        return Err(ManormError::InsufficientData { count: x.len() });
    }
    weighted_least_squares(x, y, &vec![1.0; x.len()])
}

fn get_residuals(x: &[f64], y: &[f64], fit: &LinearFit) -> Vec<f64> {
    x.iter().zip(y).map(|(x, y)| y - fit.predict(*x)).collect()
}

/// Scale estimate from the median absolute residual, centered at zero
///
fn get_mad_scale(residuals: &[f64]) -> f64 {
    if residuals.is_empty() {
        return 0.0;
    }
    let abs_residuals = Data::new(residuals.iter().map(|x| x.abs()).collect::<Vec<_>>());
    abs_residuals.median() / MAD_NORMAL_CONSTANT
}

/// Fit y = slope * x + intercept with Huber's M-estimator
///
/// The fit starts from the ordinary least squares solution.
///
pub fn huber_regression(x: &[f64], y: &[f64], settings: &HuberSettings) -> ManormResult<RobustFit> {
    assert_eq!(x.len(), y.len());

    let mut fit = least_squares(x, y)?;
    let mut residuals = get_residuals(x, y, &fit);
    let mut scale = get_mad_scale(&residuals);

    let mut iterations = 0;
    let mut converged = false;
    while iterations < settings.max_iterations {
        if scale <= f64::EPSILON {
            // Over half the points are fit exactly, so further reweighting is undefined
            converged = true;
            break;
        }
        iterations += 1;

        let weights = residuals
            .iter()
            .map(|r| {
                let z = (r / scale).abs();
                if z <= settings.t { 1.0 } else { settings.t / z }
            })
            .collect::<Vec<_>>();

        let next_fit = weighted_least_squares(x, y, &weights)?;
        let delta = f64::max(
            (next_fit.intercept - fit.intercept).abs(),
            (next_fit.slope - fit.slope).abs(),
        );
        fit = next_fit;
        residuals = get_residuals(x, y, &fit);
        scale = get_mad_scale(&residuals);

        if delta <= settings.tolerance {
            converged = true;
            break;
        }
    }

    Ok(RobustFit {
        fit,
        scale,
        iterations,
        converged,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_least_squares() {
        let x = [0.0, 1.0, 2.0, 3.0];
        let y = [1.0, 3.0, 5.0, 7.0];
        let fit = least_squares(&x, &y).unwrap();
        approx::assert_abs_diff_eq!(fit.slope, 2.0, epsilon = 1e-12);
        approx::assert_abs_diff_eq!(fit.intercept, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_huber_exact_line() {
        let x = (0..20).map(|i| i as f64 * 0.5).collect::<Vec<_>>();
        let y = x.iter().map(|x| -0.3 * x + 0.8).collect::<Vec<_>>();
        let result = huber_regression(&x, &y, &HuberSettings::default()).unwrap();
        assert!(result.converged);
        approx::assert_abs_diff_eq!(result.fit.slope, -0.3, epsilon = 1e-9);
        approx::assert_abs_diff_eq!(result.fit.intercept, 0.8, epsilon = 1e-9);
    }

    #[test]
    fn test_huber_outlier_resistance() {
        // Points on y = 0.5 x + 1 with a small alternating perturbation, plus a few large outliers
        let mut x = Vec::new();
        let mut y = Vec::new();
        for i in 0..40 {
            let xi = i as f64 * 0.25;
            let noise = if i % 2 == 0 { 0.05 } else { -0.05 };
            x.push(xi);
            y.push(0.5 * xi + 1.0 + noise);
        }
        for &xi in [8.0, 8.5, 9.0, 9.5].iter() {
            x.push(xi);
            y.push(0.5 * xi + 1.0 + 8.0);
        }

        let ols = least_squares(&x, &y).unwrap();
        let robust = huber_regression(&x, &y, &HuberSettings::default()).unwrap();

        assert!(robust.converged);
        assert!((robust.fit.slope - 0.5).abs() < 0.05);
        assert!((robust.fit.intercept - 1.0).abs() < 0.15);

        // The outliers drag the least squares fit much further from the true line
        assert!((ols.slope - 0.5).abs() > (robust.fit.slope - 0.5).abs());
        assert!((ols.slope - 0.5).abs() > 0.1);
    }

    #[test]
    fn test_insufficient_data() {
        assert!(matches!(
            huber_regression(&[], &[], &HuberSettings::default()),
            Err(ManormError::InsufficientData { count: 0 })
        ));
        assert!(matches!(
            huber_regression(&[1.0], &[2.0], &HuberSettings::default()),
            Err(ManormError::InsufficientData { count: 1 })
        ));
    }

    #[test]
    fn test_singular_fit() {
        let x = [2.0, 2.0, 2.0];
        let y = [1.0, 2.0, 3.0];
        assert!(matches!(
            huber_regression(&x, &y, &HuberSettings::default()),
            Err(ManormError::SingularFit { count: 3 })
        ));
    }

    #[test]
    fn test_two_points() {
        let result = huber_regression(&[1.0, 3.0], &[2.0, 6.0], &HuberSettings::default()).unwrap();
        approx::assert_abs_diff_eq!(result.fit.slope, 2.0, epsilon = 1e-12);
        approx::assert_abs_diff_eq!(result.fit.intercept, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_get_mad_scale() {
        assert_eq!(get_mad_scale(&[]), 0.0);

        // Odd count takes the middle absolute residual
        approx::assert_ulps_eq!(
            get_mad_scale(&[-3.0, 1.0, 2.0]),
            2.0 / MAD_NORMAL_CONSTANT,
            max_ulps = 4
        );

        // Even count averages the two middle absolute residuals
        approx::assert_ulps_eq!(
            get_mad_scale(&[4.0, -1.0, 3.0, -2.0]),
            2.5 / MAD_NORMAL_CONSTANT,
            max_ulps = 4
        );
    }
}
