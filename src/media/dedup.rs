use crate::media::ORIGINAL_RESOLUTION;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// What to do with a media request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaDecision {
    /// First request for this base name in the run
    Fresh,
    /// A strictly higher resolution than anything seen so far
    Upgrade { previous: u32 },
    /// An equal or better resolution is already recorded
    Skip { recorded: u32 },
}

impl MediaDecision {
    /// Returns true if the file has to be (re)downloaded
    pub fn should_download(&self) -> bool {
        !matches!(self, Self::Skip { .. })
    }
}

/// Tracks the best resolution requested for every media base name
///
/// The compare-and-record step is atomic, so concurrent workers asking for
/// the same asset see a monotonically increasing resolution. Each base name
/// also has an async gate that downloaders hold from decision to publication.
#[derive(Debug, Default)]
pub struct MediaDeduplicator {
    recorded: Mutex<HashMap<String, u32>>,
    gates: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl MediaDeduplicator {
    /// Creates an empty deduplicator
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, u32>> {
        self.recorded.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Decides whether `base` must be downloaded at `resolution`, recording
    /// the resolution when it is the first or a strictly higher one
    pub fn decide(&self, base: &str, resolution: u32) -> MediaDecision {
        let mut recorded = self.lock();
        match recorded.get(base).copied() {
            None => {
                recorded.insert(base.to_string(), resolution);
                MediaDecision::Fresh
            }
            Some(previous) if resolution > previous => {
                recorded.insert(base.to_string(), resolution);
                MediaDecision::Upgrade { previous }
            }
            Some(recorded) => MediaDecision::Skip { recorded },
        }
    }

    /// Lock serializing the requests for `base`
    ///
    /// While it is held, no other request for the same base name can decide
    /// or publish, so a `Skip` seen under the gate means the recorded copy
    /// is already on disk.
    pub fn gate(&self, base: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut gates = self.gates.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(gates.entry(base.to_string()).or_default())
    }

    /// Records a copy left by an earlier run
    ///
    /// Its resolution is unknown, so it is treated as the original and no
    /// request of this run replaces it.
    pub fn adopt_existing(&self, base: &str) {
        self.lock().insert(base.to_string(), ORIGINAL_RESOLUTION);
    }

    /// Undoes the record made for a download that failed
    ///
    /// Nothing changes if a higher resolution was recorded in the meantime.
    pub fn revert(&self, base: &str, resolution: u32, previous: Option<u32>) {
        let mut recorded = self.lock();
        if recorded.get(base).copied() != Some(resolution) {
            return;
        }
        match previous {
            Some(previous) => recorded.insert(base.to_string(), previous),
            None => recorded.remove(base),
        };
    }

    /// Returns true if the request should be downloaded; see [`Self::decide`]
    pub fn should_download(&self, base: &str, resolution: u32) -> bool {
        self.decide(base, resolution).should_download()
    }

    /// Best resolution recorded for `base`
    pub fn recorded(&self, base: &str) -> Option<u32> {
        self.lock().get(base).copied()
    }

    /// Runs `publish` while `resolution` is still the best one for `base`
    ///
    /// The record stays locked during `publish`, so no other worker can
    /// record a higher resolution between the check and the write. Returns
    /// `None` without calling `publish` when the resolution was superseded.
    pub fn commit<T>(&self, base: &str, resolution: u32, publish: impl FnOnce() -> T) -> Option<T> {
        let recorded = self.lock();
        if recorded.get(base).copied() == Some(resolution) {
            let result = publish();
            drop(recorded);
            Some(result)
        } else {
            None
        }
    }

    /// Number of distinct base names seen
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true if no media was seen yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_request_downloads() {
        let dedup = MediaDeduplicator::new();
        assert_eq!(dedup.decide("Logo.png", 200), MediaDecision::Fresh);
        assert_eq!(dedup.recorded("Logo.png"), Some(200));
    }

    #[test]
    fn test_lower_or_equal_resolution_is_skipped() {
        let dedup = MediaDeduplicator::new();
        dedup.decide("Logo.png", 200);

        assert_eq!(
            dedup.decide("Logo.png", 100),
            MediaDecision::Skip { recorded: 200 }
        );
        assert!(!dedup.should_download("Logo.png", 200));
        assert_eq!(dedup.recorded("Logo.png"), Some(200));
    }

    #[test]
    fn test_higher_resolution_upgrades() {
        let dedup = MediaDeduplicator::new();
        dedup.decide("Logo.png", 200);

        assert_eq!(
            dedup.decide("Logo.png", 400),
            MediaDecision::Upgrade { previous: 200 }
        );
        assert_eq!(
            dedup.decide("Logo.png", ORIGINAL_RESOLUTION),
            MediaDecision::Upgrade { previous: 400 }
        );
        assert!(!dedup.should_download("Logo.png", 4000));
    }

    #[test]
    fn test_monotonic_over_a_sequence() {
        let dedup = MediaDeduplicator::new();
        let requests = [120, 80, 300, 300, 220, 640, 10];
        let mut running_max = 0;

        for resolution in requests {
            let downloaded = dedup.should_download("Map.jpg", resolution);
            assert_eq!(downloaded, resolution > running_max, "at {}", resolution);
            running_max = running_max.max(resolution);
            assert_eq!(dedup.recorded("Map.jpg"), Some(running_max));
        }

        assert_eq!(dedup.recorded("Map.jpg"), requests.iter().copied().max());
    }

    #[test]
    fn test_base_names_are_independent() {
        let dedup = MediaDeduplicator::new();
        assert!(dedup.should_download("A.png", 100));
        assert!(dedup.should_download("B.png", 50));
        assert_eq!(dedup.len(), 2);
    }

    #[test]
    fn test_commit_only_for_current_resolution() {
        let dedup = MediaDeduplicator::new();
        dedup.decide("Logo.png", 200);
        assert_eq!(dedup.commit("Logo.png", 200, || "written"), Some("written"));

        dedup.decide("Logo.png", 400);
        let mut called = false;
        assert_eq!(dedup.commit("Logo.png", 200, || called = true), None);
        assert!(!called);
        assert!(dedup.commit("Logo.png", 400, || ()).is_some());
        assert!(dedup.commit("Other.png", 400, || ()).is_none());
    }

    #[test]
    fn test_adopted_copy_is_never_upgraded() {
        let dedup = MediaDeduplicator::new();
        dedup.decide("Logo.png", 100);
        dedup.adopt_existing("Logo.png");

        assert_eq!(
            dedup.decide("Logo.png", 200),
            MediaDecision::Skip {
                recorded: ORIGINAL_RESOLUTION
            }
        );
    }

    #[test]
    fn test_revert_failed_download() {
        let dedup = MediaDeduplicator::new();
        dedup.decide("Logo.png", 100);
        dedup.revert("Logo.png", 100, None);
        assert_eq!(dedup.recorded("Logo.png"), None);

        dedup.decide("Logo.png", 100);
        dedup.decide("Logo.png", 300);
        dedup.revert("Logo.png", 300, Some(100));
        assert_eq!(dedup.recorded("Logo.png"), Some(100));

        // A stale revert leaves a newer record alone
        dedup.decide("Logo.png", 500);
        dedup.revert("Logo.png", 300, Some(100));
        assert_eq!(dedup.recorded("Logo.png"), Some(500));
    }

    #[test]
    fn test_gate_is_shared_per_base_name() {
        let dedup = MediaDeduplicator::new();
        assert!(Arc::ptr_eq(&dedup.gate("Logo.png"), &dedup.gate("Logo.png")));
        assert!(!Arc::ptr_eq(&dedup.gate("Logo.png"), &dedup.gate("Map.jpg")));
    }

    #[test]
    fn test_concurrent_requests_record_the_maximum() {
        let dedup = Arc::new(MediaDeduplicator::new());

        let handles: Vec<_> = (1..=64u32)
            .map(|width| {
                let dedup = Arc::clone(&dedup);
                std::thread::spawn(move || dedup.should_download("Shared.png", width * 10))
            })
            .collect();
        let downloads = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|downloaded| *downloaded)
            .count();

        assert!(downloads >= 1);
        assert_eq!(dedup.recorded("Shared.png"), Some(640));
    }
}
