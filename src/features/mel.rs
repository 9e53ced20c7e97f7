//! Mel-scale band mapping

/// Convert a frequency in Hz to mel: `2595 * log10(1 + f / 700)`
#[inline]
pub fn hz_to_mel(hz: f32) -> f32 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

/// Band index for every spectrum bin
///
/// Bin `k` of an `frame_size`-point spectrum sits at `k * sample_rate /
/// frame_size` Hz. Bands split `[0, mel(sample_rate / 2)]` evenly in mel; the
/// Nyquist bin and anything above fall into the last band.
///
/// # Example
///
/// ```
/// use beatscan::features::mel::band_map;
///
/// let map = band_map(256, 512, 44100, 128);
/// assert_eq!(map.len(), 256);
/// assert_eq!(map[0], 0);
/// assert!(map.windows(2).all(|w| w[0] <= w[1]));
/// ```
pub fn band_map(num_bins: usize, frame_size: usize, sample_rate: u32, bands: usize) -> Vec<usize> {
    if bands == 0 || frame_size == 0 {
        return vec![0; num_bins];
    }

    let mel_max = hz_to_mel(sample_rate as f32 / 2.0);

    (0..num_bins)
        .map(|k| {
            let hz = k as f32 * sample_rate as f32 / frame_size as f32;
            let position = hz_to_mel(hz) / mel_max * bands as f32;
            (position.floor() as usize).min(bands - 1)
        })
        .collect()
}
