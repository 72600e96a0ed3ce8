//! Media handling for the mirror
//!
//! This module contains:
//! - Media file name parsing (resolution prefix and base name)
//! - Resolution-aware deduplication shared by all workers
//! - The store that downloads media into the sharded tree

mod dedup;
mod name;
mod store;

pub use dedup::{MediaDecision, MediaDeduplicator};
pub use name::{MediaName, MediaNameError, ORIGINAL_RESOLUTION};
pub use store::{MediaOutcome, MediaRequest, MediaStore};
