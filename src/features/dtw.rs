//! Dynamic time warping over scalar sequences
//!
//! Used to compare onset contours of an upload segment and a candidate's
//! preview, where the same material may be shifted or locally stretched.

/// Normalized DTW distance between two sequences
///
/// Cost of aligning `a[i]` with `b[j]` is `|a[i] - b[j]|`; the accumulated
/// cost of the cheapest monotone warping path is divided by
/// `a.len() + b.len()`.
///
/// Edge cases: two empty sequences are identical (0.0); exactly one empty
/// sequence cannot be aligned (`f32::INFINITY`).
///
/// Memory is two rows of `b.len() + 1` accumulators.
///
/// # Example
///
/// ```
/// use beatscan::features::dtw::align;
///
/// assert_eq!(align(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]), 0.0);
/// // A repeated value is absorbed by warping
/// assert_eq!(align(&[1.0, 2.0, 3.0], &[1.0, 2.0, 2.0, 3.0]), 0.0);
/// assert!(align(&[], &[1.0]).is_infinite());
/// ```
pub fn align(a: &[f32], b: &[f32]) -> f32 {
    match (a.is_empty(), b.is_empty()) {
        (true, true) => return 0.0,
        (true, false) | (false, true) => return f32::INFINITY,
        _ => {}
    }

    let m = b.len();
    let mut prev = vec![f32::INFINITY; m + 1];
    let mut curr = vec![f32::INFINITY; m + 1];
    prev[0] = 0.0;

    for &x in a {
        curr[0] = f32::INFINITY;
        for j in 1..=m {
            let cost = (x - b[j - 1]).abs();
            let best = prev[j - 1].min(prev[j]).min(curr[j - 1]);
            curr[j] = cost + best;
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[m] / (a.len() + m) as f32
}

/// Zero-mean, unit-variance copy of a sequence
///
/// Constant sequences become all zeros.
pub fn znormalize(values: &[f32]) -> Vec<f32> {
    if values.is_empty() {
        return Vec::new();
    }

    let n = values.len() as f32;
    let mean = values.iter().sum::<f32>() / n;
    let variance = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f32>() / n;
    let std = variance.sqrt();

    if std <= f32::EPSILON {
        return vec![0.0; values.len()];
    }

    values.iter().map(|v| (v - mean) / std).collect()
}

/// Linearly resample a contour to exactly `points` values
///
/// Endpoints are preserved. An empty input yields an empty output.
pub fn resample_contour(values: &[f32], points: usize) -> Vec<f32> {
    if values.is_empty() || points == 0 {
        return Vec::new();
    }
    if values.len() == 1 || points == 1 {
        return vec![values[0]; points];
    }

    let scale = (values.len() - 1) as f32 / (points - 1) as f32;
    (0..points)
        .map(|i| {
            let pos = i as f32 * scale;
            let idx = pos.floor() as usize;
            if idx + 1 >= values.len() {
                return values[values.len() - 1];
            }
            let frac = pos - idx as f32;
            values[idx] * (1.0 - frac) + values[idx + 1] * frac
        })
        .collect()
}
