//! Mathematical and statistical functions for M-A values and significance testing
//!

use statrs::function::factorial::ln_factorial;

use crate::errors::{ManormError, ManormResult};

/// Floor applied to the ln-transformed P-value, to prevent underflow to zero
const MIN_LN_P_VALUE: f64 = -500.0;

/// Convert read densities of two samples to (M, A) values
///
/// M = log2(x / y), A = log2(x * y) / 2
///
pub fn xy_to_ma(x: f64, y: f64) -> (f64, f64) {
    let lx = x.log2();
    let ly = y.log2();
    (lx - ly, (lx + ly) / 2.0)
}

/// Convert (M, A) values back to the read densities of two samples
///
pub fn ma_to_xy(m: f64, a: f64) -> (f64, f64) {
    (2f64.powf(a + m / 2.0), 2f64.powf(a - m / 2.0))
}

/// Round `x` to `decimals` decimal places
///
pub fn round_decimals(x: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (x * factor).round() / factor
}

/// Get the MAnorm P-value of observing read densities (x, y) given their sum
///
/// Inputs are rounded to the nearest integer (ties to even) and any zero is raised to one. The
/// returned value is the binomial probability of the split under p=0.5, scaled by 1/2:
///
/// P = (x+y)! / (x! y! 2^(x+y+1))
///
pub fn manorm_p(x: f64, y: f64) -> ManormResult<f64> {
    if x.is_nan() || y.is_nan() || x < 0.0 || y < 0.0 {
        return Err(ManormError::NegativeValue { x, y });
    }
    let to_count = |v: f64| std::cmp::max(v.round_ties_even() as u64, 1);
    let x = to_count(x);
    let y = to_count(y);

    let ln_p = ln_factorial(x + y)
        - ln_factorial(x)
        - ln_factorial(y)
        - (x + y + 1) as f64 * std::f64::consts::LN_2;
    Ok(ln_p.max(MIN_LN_P_VALUE).exp())
}
