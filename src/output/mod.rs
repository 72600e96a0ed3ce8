//! Output module for run summaries
//!
//! This module handles:
//! - Counting the events of a run from concurrent workers
//! - Printing the final statistics

pub mod stats;

pub use stats::{print_statistics, MirrorStatistics, RunCounters};
