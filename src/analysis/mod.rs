//! Scan results
//!
//! Combines the outputs of every stage into the final report:
//! - Ranked matches
//! - Submitted segments and preprocessing details
//! - Timings, counters and flags

pub mod result;

pub use result::{ScanFlag, ScanMetrics, ScanResult};
