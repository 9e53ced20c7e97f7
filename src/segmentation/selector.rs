//! Prioritized segment selection
//!
//! # Algorithm
//!
//! 1. Slide a window (1 s, 50% overlap by default) over the buffer and compute
//!    RMS energy and band-energy variance per window
//! 2. Peaks / valleys are strict local maxima / minima of the energy series
//! 3. Standard scans emit the full track, the most unique peak (60 s), a 40 s
//!    window at 40% and a 30 s window at 75%
//! 4. Deep scans add the next two most unique peaks and five 40 s coverage
//!    windows at 15/35/55/75/90%
//! 5. Sort by priority, then energy (descending), and truncate
//!
//! Offsets always refer to the preprocessed PCM buffer.

use std::cmp::Ordering;

use super::peaks::{local_maxima, local_minima};
use super::window_stats::{analyze_windows, band_energy_variance, WindowStats};
use super::{AudioSegment, Priority};
use crate::config::SegmentConfig;
use crate::error::ScanError;
use crate::preprocessing::normalization::rms;
use crate::preprocessing::PcmBuffer;

/// Length of peak-anchored windows
const PEAK_WINDOW_SECONDS: f32 = 60.0;

/// Fixed standard-mode windows: (name, position fraction, seconds)
const MID_WINDOW: (&str, f64, f32) = ("MID", 0.40, 40.0);
const LATE_WINDOW: (&str, f64, f32) = ("LATE", 0.75, 30.0);

/// Deep-mode coverage positions
const COVERAGE_POSITIONS: [f64; 5] = [0.15, 0.35, 0.55, 0.75, 0.90];
const COVERAGE_SECONDS: f32 = 40.0;

/// Synthetic energy decay per coverage window
const COVERAGE_DECAY: f32 = 0.1;

/// Number of peaks deep mode anchors windows on (including `PEAK`)
const DEEP_PEAK_COUNT: usize = 3;

/// Window-level analysis of a buffer
#[derive(Debug, Clone)]
pub struct SegmentAnalysis {
    /// Per-window statistics in time order
    pub windows: Vec<WindowStats>,
    /// Window indices of energy peaks
    pub peaks: Vec<usize>,
    /// Window indices of energy valleys
    pub valleys: Vec<usize>,
    /// RMS of the whole buffer
    pub track_rms: f32,
}

impl SegmentAnalysis {
    /// Peak window indices ordered by uniqueness (highest first, earlier wins ties)
    pub fn peaks_by_uniqueness(&self) -> Vec<usize> {
        let mut ranked = self.peaks.clone();
        ranked.sort_by(|&a, &b| {
            self.windows[b]
                .uniqueness
                .partial_cmp(&self.windows[a].uniqueness)
                .unwrap_or(Ordering::Equal)
                .then(a.cmp(&b))
        });
        ranked
    }
}

/// Run the window analysis without building segments
pub fn analyze_segments(
    buffer: &PcmBuffer,
    config: &SegmentConfig,
) -> Result<SegmentAnalysis, ScanError> {
    let window = (config.window_seconds * buffer.sample_rate() as f32).round() as usize;
    let hop = ((window as f32) * (1.0 - config.overlap)).round().max(1.0) as usize;

    let windows = analyze_windows(buffer.samples(), window, hop, config.bands)?;
    let energy: Vec<f32> = windows.iter().map(|w| w.energy).collect();

    let peaks = local_maxima(&energy);
    let valleys = local_minima(&energy);

    log::debug!(
        "Segment analysis: {} windows ({} samples, hop {}), {} peaks, {} valleys",
        windows.len(),
        window,
        hop,
        peaks.len(),
        valleys.len()
    );

    Ok(SegmentAnalysis {
        windows,
        peaks,
        valleys,
        track_rms: rms(buffer.samples()),
    })
}

/// Select segments with the default [`SegmentConfig`]
///
/// # Arguments
///
/// * `buffer` - Preprocessed mono buffer
/// * `target_count` - Maximum number of segments to return
/// * `deep_scan` - Emit the extended peak and coverage set
///
/// # Errors
///
/// `ScanError::InsufficientAudio` if the buffer is shorter than one window.
///
/// # Example
///
/// ```
/// use beatscan::preprocessing::PcmBuffer;
/// use beatscan::segmentation::{select_segments, Priority};
///
/// let buffer = PcmBuffer::new(vec![0.5; 44100 * 5], 44100);
/// let segments = select_segments(&buffer, 4, false)?;
/// assert_eq!(segments[0].name, "FULL_TRACK");
/// assert_eq!(segments[0].priority, Priority::High);
/// # Ok::<(), beatscan::ScanError>(())
/// ```
pub fn select_segments(
    buffer: &PcmBuffer,
    target_count: usize,
    deep_scan: bool,
) -> Result<Vec<AudioSegment>, ScanError> {
    select_segments_with(buffer, target_count, deep_scan, &SegmentConfig::default())
}

/// Select segments with explicit parameters
pub fn select_segments_with(
    buffer: &PcmBuffer,
    target_count: usize,
    deep_scan: bool,
    config: &SegmentConfig,
) -> Result<Vec<AudioSegment>, ScanError> {
    let analysis = analyze_segments(buffer, config)?;
    let builder = SegmentBuilder {
        buffer,
        bands: config.bands,
    };

    let mut segments = Vec::new();

    // Sorts ahead of every analysed window
    let max_window_energy = analysis
        .windows
        .iter()
        .map(|w| w.energy)
        .fold(0.0f32, f32::max);
    segments.push(AudioSegment {
        name: "FULL_TRACK".to_string(),
        start: 0,
        len: buffer.len(),
        sample_rate: buffer.sample_rate(),
        energy: max_window_energy.max(1.0),
        uniqueness: 1.0,
        priority: Priority::High,
    });

    let ranked_peaks = analysis.peaks_by_uniqueness();
    let peak_budget = if deep_scan { DEEP_PEAK_COUNT } else { 1 };

    for (rank, &peak) in ranked_peaks.iter().take(peak_budget).enumerate() {
        let stats = analysis.windows[peak];
        let name = if rank == 0 {
            "PEAK".to_string()
        } else {
            format!("PEAK_{}", rank + 1)
        };
        if let Some(segment) = builder.window(
            name,
            stats.start,
            PEAK_WINDOW_SECONDS,
            Priority::High,
            Some((stats.energy, stats.uniqueness)),
        ) {
            segments.push(segment);
        }
    }

    if ranked_peaks.is_empty() {
        log::debug!("No energy peaks found, peak segment omitted");
    }

    for (name, position, seconds) in [MID_WINDOW, LATE_WINDOW] {
        let start = builder.position(position);
        if let Some(segment) = builder.window(name.to_string(), start, seconds, Priority::Medium, None) {
            segments.push(segment);
        }
    }

    if deep_scan {
        for (i, &position) in COVERAGE_POSITIONS.iter().enumerate() {
            let priority = if i < 2 { Priority::Medium } else { Priority::Low };
            let start = builder.position(position);
            let name = format!("COVER_{}", (position * 100.0).round() as u32);
            let energy = analysis.track_rms * (1.0 - COVERAGE_DECAY * i as f32);

            if let Some(mut segment) = builder.window(name, start, COVERAGE_SECONDS, priority, None) {
                segment.energy = energy;
                segments.push(segment);
            }
        }
    }

    // Stable: equal keys keep emission order
    segments.sort_by(|a, b| {
        a.priority
            .cmp(&b.priority)
            .then(b.energy.partial_cmp(&a.energy).unwrap_or(Ordering::Equal))
    });
    segments.truncate(target_count);

    log::debug!(
        "Selected {} segment(s) ({} scan): {:?}",
        segments.len(),
        if deep_scan { "deep" } else { "standard" },
        segments.iter().map(|s| s.name.as_str()).collect::<Vec<_>>()
    );

    Ok(segments)
}

struct SegmentBuilder<'a> {
    buffer: &'a PcmBuffer,
    bands: usize,
}

impl SegmentBuilder<'_> {
    /// Sample index at a fraction of the buffer
    fn position(&self, fraction: f64) -> usize {
        (self.buffer.len() as f64 * fraction) as usize
    }

    /// Build a window clamped to the buffer; `None` if nothing remains
    ///
    /// Energy and uniqueness are measured over the window unless supplied.
    fn window(
        &self,
        name: String,
        start: usize,
        seconds: f32,
        priority: Priority,
        stats: Option<(f32, f32)>,
    ) -> Option<AudioSegment> {
        let wanted = (seconds * self.buffer.sample_rate() as f32).round() as usize;
        let start = start.min(self.buffer.len());
        let len = wanted.min(self.buffer.len() - start);

        if len == 0 {
            return None;
        }

        let (energy, uniqueness) = stats.unwrap_or_else(|| {
            let region = self.buffer.range(start, len);
            (rms(region), band_energy_variance(region, self.bands))
        });

        Some(AudioSegment {
            name,
            start,
            len,
            sample_rate: self.buffer.sample_rate(),
            energy,
            uniqueness,
            priority,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: u32 = 44100;

    /// Quiet 440 Hz bed with a loud burst between `burst_start` and `burst_end` seconds
    fn spike_buffer(seconds: f32, burst_start: f32, burst_end: f32) -> PcmBuffer {
        let n = (seconds * SR as f32) as usize;
        let from = (burst_start * SR as f32) as usize;
        let to = (burst_end * SR as f32) as usize;
        let samples = (0..n)
            .map(|i| {
                let phase = 2.0 * std::f32::consts::PI * 440.0 * i as f32 / SR as f32;
                let amplitude = if i >= from && i < to { 0.8 } else { 0.001 };
                phase.sin() * amplitude
            })
            .collect();
        PcmBuffer::new(samples, SR)
    }

    /// Deterministic noise with a slowly varying envelope, so it has many peaks
    fn textured_buffer(seconds: f32) -> PcmBuffer {
        let n = (seconds * SR as f32) as usize;
        let mut state: u32 = 12345;
        let samples = (0..n)
            .map(|i| {
                state = state.wrapping_mul(1_103_515_245).wrapping_add(12345);
                let noise = ((state >> 16) & 0x7fff) as f32 / 32768.0 - 0.5;
                let t = i as f32 / SR as f32;
                let envelope = 0.5 + 0.4 * (t * 0.7).sin() * (t * 0.13).cos();
                noise * envelope
            })
            .collect();
        PcmBuffer::new(samples, SR)
    }

    #[test]
    fn test_standard_full_track_first() {
        let buffer = textured_buffer(90.0);
        let segments = select_segments(&buffer, 4, false).unwrap();

        assert_eq!(segments.len(), 4);
        assert_eq!(segments[0].name, "FULL_TRACK");
        assert_eq!(segments[0].priority, Priority::High);
        assert_eq!(segments[0].uniqueness, 1.0);
        assert_eq!(segments[0].start, 0);
        assert_eq!(segments[0].len, buffer.len());

        let names: Vec<&str> = segments.iter().map(|s| s.name.as_str()).collect();
        assert!(names.contains(&"PEAK"));
        assert!(names.contains(&"MID"));
        assert!(names.contains(&"LATE"));
    }

    #[test]
    fn test_spike_at_half_becomes_peak() {
        // Burst covers 0.4 s of the window starting at 10.0 s and 0.2 s of its neighbours
        let buffer = spike_buffer(20.0, 10.3, 10.7);
        let segments = select_segments(&buffer, 4, false).unwrap();

        let peak = segments
            .iter()
            .find(|s| s.name == "PEAK")
            .expect("peak segment");
        let relative = peak.offset_seconds() / buffer.duration_seconds();
        assert!(
            (relative - 0.5).abs() < 0.05,
            "peak offset {:.2}s ({:.2} of track)",
            peak.offset_seconds(),
            relative
        );
        assert_eq!(peak.priority, Priority::High);
        // Clamped to the buffer end
        assert_eq!(peak.start + peak.len, buffer.len());
    }

    #[test]
    fn test_fixed_windows_positions() {
        let buffer = textured_buffer(100.0);
        let segments = select_segments(&buffer, 4, false).unwrap();

        let mid = segments.iter().find(|s| s.name == "MID").unwrap();
        assert!((mid.offset_seconds() - 40.0).abs() < 0.01);
        assert!((mid.duration_seconds() - 40.0).abs() < 0.01);
        assert_eq!(mid.priority, Priority::Medium);

        let late = segments.iter().find(|s| s.name == "LATE").unwrap();
        assert!((late.offset_seconds() - 75.0).abs() < 0.01);
        assert!((late.duration_seconds() - 25.0).abs() < 0.01);
    }

    #[test]
    fn test_deep_scan_adds_peaks_and_coverage() {
        let buffer = textured_buffer(120.0);
        let segments = select_segments(&buffer, 20, true).unwrap();

        let names: Vec<&str> = segments.iter().map(|s| s.name.as_str()).collect();
        for expected in [
            "FULL_TRACK", "PEAK", "PEAK_2", "PEAK_3", "MID", "LATE", "COVER_15", "COVER_35",
            "COVER_55", "COVER_75", "COVER_90",
        ] {
            assert!(names.contains(&expected), "missing {} in {:?}", expected, names);
        }
        assert_eq!(segments.len(), 11);

        // Priority never decreases along the list
        for pair in segments.windows(2) {
            assert!(pair[0].priority <= pair[1].priority);
            if pair[0].priority == pair[1].priority {
                assert!(pair[0].energy >= pair[1].energy);
            }
        }

        let cover_90 = segments.iter().find(|s| s.name == "COVER_90").unwrap();
        assert_eq!(cover_90.priority, Priority::Low);
        let cover_35 = segments.iter().find(|s| s.name == "COVER_35").unwrap();
        assert_eq!(cover_35.priority, Priority::Medium);
        let cover_15 = segments.iter().find(|s| s.name == "COVER_15").unwrap();
        assert!(cover_15.energy > cover_35.energy);
    }

    #[test]
    fn test_truncated_to_target_count() {
        let buffer = textured_buffer(120.0);
        let segments = select_segments(&buffer, 3, true).unwrap();
        assert_eq!(segments.len(), 3);
        assert!(segments.iter().all(|s| s.priority == Priority::High));
    }

    #[test]
    fn test_no_peaks_omits_peak_segment() {
        let buffer = PcmBuffer::new(vec![0.5f32; SR as usize * 5], SR);
        let segments = select_segments(&buffer, 4, false).unwrap();

        let names: Vec<&str> = segments.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["FULL_TRACK", "MID", "LATE"]);
    }

    #[test]
    fn test_shorter_than_window_fails() {
        let buffer = PcmBuffer::new(vec![0.5f32; 1000], SR);
        assert!(matches!(
            select_segments(&buffer, 4, false),
            Err(ScanError::InsufficientAudio { .. })
        ));
    }

    #[test]
    fn test_analysis_reports_valleys() {
        let buffer = textured_buffer(60.0);
        let analysis = analyze_segments(&buffer, &SegmentConfig::default()).unwrap();
        assert_eq!(analysis.windows.len(), 119);
        assert!(!analysis.peaks.is_empty());
        assert!(!analysis.valleys.is_empty());
        let ranked = analysis.peaks_by_uniqueness();
        for pair in ranked.windows(2) {
            assert!(
                analysis.windows[pair[0]].uniqueness >= analysis.windows[pair[1]].uniqueness
            );
        }
    }
}
