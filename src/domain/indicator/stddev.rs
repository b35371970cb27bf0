//! Sample standard deviation of closes over a window.
//!
//! Sample (Bessel-corrected) deviation: divides by n-1, so a window needs at
//! least two bars to be defined.

use crate::domain::ohlcv::Bar;

/// Mean and sample standard deviation of the closes in `window`.
pub fn mean_and_sample_stddev(window: &[Bar]) -> Option<(f64, f64)> {
    let n = window.len();
    if n < 2 {
        return None;
    }
    let mean = window.iter().map(|b| b.close).sum::<f64>() / n as f64;
    let variance = window
        .iter()
        .map(|b| {
            let diff = b.close - mean;
            diff * diff
        })
        .sum::<f64>()
        / (n - 1) as f64;
    Some((mean, variance.sqrt()))
}
