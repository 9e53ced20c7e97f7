//! Local extrema of a 1D series
//!
//! Strict neighbour comparison: plateaus never qualify, and the first and
//! last elements are never extrema.

/// Indices `i` with `values[i-1] < values[i] > values[i+1]`
///
/// # Example
///
/// ```
/// use beatscan::segmentation::peaks::local_maxima;
///
/// let energy = vec![0.1, 0.5, 0.2, 0.2, 0.7, 0.7, 0.3];
/// assert_eq!(local_maxima(&energy), vec![1]);
/// ```
pub fn local_maxima(values: &[f32]) -> Vec<usize> {
    if values.len() < 3 {
        return vec![];
    }

    (1..values.len() - 1)
        .filter(|&i| values[i] > values[i - 1] && values[i] > values[i + 1])
        .collect()
}

/// Indices `i` with `values[i-1] > values[i] < values[i+1]`
pub fn local_minima(values: &[f32]) -> Vec<usize> {
    if values.len() < 3 {
        return vec![];
    }

    (1..values.len() - 1)
        .filter(|&i| values[i] < values[i - 1] && values[i] < values[i + 1])
        .collect()
}
