//! Shared numeric helpers for the metric components.
//! Stateless functions; undefined results are `None` rather than NaN.

use std::cmp::Ordering;

use statrs::statistics::Statistics;

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.mean())
}

/// Sample standard deviation (n - 1 degrees of freedom).
/// Fewer than two samples is undefined.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let std = values.std_dev();
    std.is_finite().then_some(std)
}

/// Simple return between two prices. A zero base is undefined.
pub fn simple_return(base: f64, value: f64) -> Option<f64> {
    if base == 0.0 {
        return None;
    }
    let r = value / base - 1.0;
    r.is_finite().then_some(r)
}

/// Pearson correlation over paired observations.
/// `None` with fewer than two pairs or when either side has zero variance.
pub fn pearson(pairs: &[(f64, f64)]) -> Option<f64> {
    let n = pairs.len();
    if n < 2 {
        return None;
    }

    let mean_a = pairs.iter().map(|(a, _)| a).sum::<f64>() / n as f64;
    let mean_b = pairs.iter().map(|(_, b)| b).sum::<f64>() / n as f64;

    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;

    for (a, b) in pairs {
        let da = a - mean_a;
        let db = b - mean_b;
        cov += da * db;
        var_a += da * da;
        var_b += db * db;
    }

    let denom = (var_a * var_b).sqrt();
    if denom == 0.0 || !denom.is_finite() {
        return None;
    }
    Some((cov / denom).clamp(-1.0, 1.0))
}

/// Round half to even at `decimals` places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round_ties_even() / factor
}

/// Ordering for optional values: defined values first, in the requested direction,
/// undefined values last.
pub fn cmp_defined_first(a: Option<f64>, b: Option<f64>, descending: bool) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => {
            let ord = x.partial_cmp(&y).unwrap_or(Ordering::Equal);
            if descending {
                ord.reverse()
            } else {
                ord
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
