//! Silence detection and trimming utilities

use crate::error::ScanError;

/// Region kept after trimming leading and trailing silence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrimRange {
    /// First sample above the threshold
    pub start: usize,
    /// One past the last sample above the threshold
    pub end: usize,
}

impl TrimRange {
    /// Samples removed from the front
    pub fn leading(&self) -> usize {
        self.start
    }

    /// Samples removed from the back of a buffer of `total` samples
    pub fn trailing(&self, total: usize) -> usize {
        total.saturating_sub(self.end)
    }

    /// Kept sample count
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// True when nothing was kept
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

/// Find the non-silent region of a buffer
///
/// A sample is audible when its absolute value exceeds `threshold`. Only the
/// edges are trimmed; quiet passages in the middle are kept.
///
/// # Errors
///
/// Returns `ScanError::EmptyAudio` when no sample exceeds the threshold.
pub fn detect_trim_range(samples: &[f32], threshold: f32) -> Result<TrimRange, ScanError> {
    let start = samples.iter().position(|&x| x.abs() > threshold);
    let end = samples.iter().rposition(|&x| x.abs() > threshold);

    match (start, end) {
        (Some(start), Some(end)) => Ok(TrimRange {
            start,
            end: end + 1,
        }),
        _ => Err(ScanError::EmptyAudio(format!(
            "No samples above silence threshold {:.3} in {} samples",
            threshold,
            samples.len()
        ))),
    }
}

/// Trim leading and trailing silence, returning the kept samples and range
pub fn trim_silence(samples: &[f32], threshold: f32) -> Result<(Vec<f32>, TrimRange), ScanError> {
    let range = detect_trim_range(samples, threshold)?;

    log::debug!(
        "Silence trim: kept [{}, {}) of {} samples",
        range.start,
        range.end,
        samples.len()
    );

    Ok((samples[range.start..range.end].to_vec(), range))
}
