//! Linear-interpolation resampling
//!
//! Both sample-rate conversion and the tempo/pitch normalizers read the input
//! at a fractional step and interpolate linearly between neighbours. There is
//! no anti-aliasing filter.

use crate::error::ScanError;

/// Read `samples` at positions `0, step, 2*step, ...` producing `out_len` values
///
/// Positions past the last input sample hold the last sample.
pub fn interpolate_at_step(samples: &[f32], step: f64, out_len: usize) -> Vec<f32> {
    if samples.is_empty() || out_len == 0 {
        return Vec::new();
    }

    let last = samples.len() - 1;
    let mut output = Vec::with_capacity(out_len);

    for i in 0..out_len {
        let position = i as f64 * step;
        let index = position.floor() as usize;

        if index >= last {
            output.push(samples[last]);
            continue;
        }

        let frac = (position - index as f64) as f32;
        output.push(samples[index] * (1.0 - frac) + samples[index + 1] * frac);
    }

    output
}

/// Convert a buffer from `from_rate` to `to_rate`
///
/// Output length is `round(len * to_rate / from_rate)`. Equal rates return a
/// copy of the input.
pub fn resample_linear(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>, ScanError> {
    if from_rate == 0 || to_rate == 0 {
        return Err(ScanError::InvalidInput(format!(
            "Invalid sample rates: {} -> {}",
            from_rate, to_rate
        )));
    }

    if from_rate == to_rate {
        return Ok(samples.to_vec());
    }

    let ratio = to_rate as f64 / from_rate as f64;
    let out_len = (samples.len() as f64 * ratio).round() as usize;

    log::debug!(
        "Resampling {} samples {} Hz -> {} Hz ({} samples)",
        samples.len(),
        from_rate,
        to_rate,
        out_len
    );

    Ok(interpolate_at_step(samples, 1.0 / ratio, out_len))
}

/// Read the input `factor` times faster (factor > 1 shortens the signal)
///
/// Output length is `round(len / factor)`.
pub fn stretch_by_factor(samples: &[f32], factor: f64) -> Vec<f32> {
    let out_len = (samples.len() as f64 / factor).round() as usize;
    interpolate_at_step(samples, factor, out_len)
}
