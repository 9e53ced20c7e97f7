//! Segment selection
//!
//! Chooses which parts of an upload are worth submitting for matching:
//! - Sliding-window energy and band-variance statistics
//! - Peak/valley picking on the energy series
//! - Prioritized, bounded segment lists for standard and deep scans

pub mod peaks;
pub mod selector;
pub mod window_stats;

use serde::{Deserialize, Serialize};

use crate::preprocessing::PcmBuffer;

pub use selector::{analyze_segments, select_segments, select_segments_with, SegmentAnalysis};

/// Submission priority of a segment
///
/// Orders `High < Medium < Low`, so an ascending sort puts the most
/// important segments first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Submitted first
    High,
    /// Coverage of the body of the track
    Medium,
    /// Late coverage, dropped first when the budget is small
    Low,
}

/// A time-bounded excerpt of the preprocessed upload
///
/// Offsets are sample indices into the decoded PCM buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioSegment {
    /// Human-readable label (`FULL_TRACK`, `PEAK`, `MID`, ...)
    pub name: String,
    /// First sample
    pub start: usize,
    /// Length in samples
    pub len: usize,
    /// Sample rate of the buffer the offsets refer to
    pub sample_rate: u32,
    /// RMS-like energy (synthetic for full-track and coverage windows)
    pub energy: f32,
    /// Band-energy variance, the spectral uniqueness proxy
    pub uniqueness: f32,
    /// Submission priority
    pub priority: Priority,
}

impl AudioSegment {
    /// Offset in seconds
    pub fn offset_seconds(&self) -> f32 {
        self.start as f32 / self.sample_rate as f32
    }

    /// Duration in seconds
    pub fn duration_seconds(&self) -> f32 {
        self.len as f32 / self.sample_rate as f32
    }

    /// The segment's samples within `buffer`
    pub fn samples<'a>(&self, buffer: &'a PcmBuffer) -> &'a [f32] {
        buffer.range(self.start, self.len)
    }
}
