//! Location and scale estimators used by the zero-point fit.
//!
//! Callers pass finite values only.

/// Median absolute deviation to Gaussian sigma.
pub const MAD_TO_SIGMA: f64 = 1.482_602_218_505_602;

/// Median of `values`, sorting them in place.
pub fn median_mut(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        Some(values[mid])
    } else {
        Some((values[mid - 1] + values[mid]) / 2.0)
    }
}

pub fn median(values: &[f64]) -> Option<f64> {
    let mut work = values.to_vec();
    median_mut(&mut work)
}

/// Gaussian-equivalent sigma from the median absolute deviation about `center`.
pub fn mad_sigma(values: &[f64], center: f64) -> Option<f64> {
    let mut abs: Vec<f64> = values.iter().map(|v| (v - center).abs()).collect();
    median_mut(&mut abs).map(|mad| mad * MAD_TO_SIGMA)
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Weighted mean; `None` if the weights do not sum to a positive finite value.
pub fn weighted_mean(values: &[f64], weights: &[f64]) -> Option<f64> {
    let mut sw = 0.0;
    let mut swx = 0.0;
    for (&x, &w) in values.iter().zip(weights) {
        sw += w;
        swx += w * x;
    }
    if sw.is_finite() && sw > 0.0 {
        Some(swx / sw)
    } else {
        None
    }
}

/// Sample standard deviation (n - 1 denominator); `None` for fewer than 2 values.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    Some((ss / (values.len() as f64 - 1.0)).sqrt())
}

pub fn rms(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let ss: f64 = values.iter().map(|v| v * v).sum();
    Some((ss / values.len() as f64).sqrt())
}
