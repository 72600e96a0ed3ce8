//! Run statistics
//!
//! Workers record events into shared atomic [`RunCounters`]; a run ends with
//! a plain [`MirrorStatistics`] snapshot that is printed and returned.

use crate::media::MediaOutcome;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Summary of a mirror run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MirrorStatistics {
    /// Articles in the catalog
    pub articles_total: u64,

    /// Articles rewritten and written during this run
    pub articles_persisted: u64,

    /// Articles already present in the output tree
    pub articles_skipped: u64,

    /// Redirect aliases in the catalog
    pub redirects_total: u64,

    /// Redirect stubs written during this run
    pub redirects_written: u64,

    /// Redirect stubs already present
    pub redirects_skipped: u64,

    /// Media files written for the first time
    pub media_downloaded: u64,

    /// Media files replaced by a higher resolution
    pub media_upgraded: u64,

    /// Media requests needing no download
    pub media_skipped: u64,

    /// Shared assets (stylesheet, scripts, favicon, entry point) written
    pub assets_written: u64,

    /// Files written to the output tree, all kinds included
    pub files_written: u64,

    /// Wall clock duration of the run
    pub elapsed: Duration,
}

impl MirrorStatistics {
    /// Articles handled (written or skipped)
    pub fn articles_done(&self) -> u64 {
        self.articles_persisted + self.articles_skipped
    }
}

/// Event counters shared by the workers of a run
#[derive(Debug)]
pub struct RunCounters {
    started: Instant,
    articles_total: AtomicU64,
    articles_persisted: AtomicU64,
    articles_skipped: AtomicU64,
    redirects_total: AtomicU64,
    redirects_written: AtomicU64,
    redirects_skipped: AtomicU64,
    media_downloaded: AtomicU64,
    media_upgraded: AtomicU64,
    media_skipped: AtomicU64,
    assets_written: AtomicU64,
}

impl Default for RunCounters {
    fn default() -> Self {
        Self::new()
    }
}

impl RunCounters {
    /// Starts counting; the run clock starts now
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            articles_total: AtomicU64::new(0),
            articles_persisted: AtomicU64::new(0),
            articles_skipped: AtomicU64::new(0),
            redirects_total: AtomicU64::new(0),
            redirects_written: AtomicU64::new(0),
            redirects_skipped: AtomicU64::new(0),
            media_downloaded: AtomicU64::new(0),
            media_upgraded: AtomicU64::new(0),
            media_skipped: AtomicU64::new(0),
            assets_written: AtomicU64::new(0),
        }
    }

    /// Records the catalog sizes
    pub fn set_totals(&self, articles: usize, redirects: usize) {
        self.articles_total.store(articles as u64, Ordering::Relaxed);
        self.redirects_total.store(redirects as u64, Ordering::Relaxed);
    }

    pub fn article_persisted(&self) {
        self.articles_persisted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn article_skipped(&self) {
        self.articles_skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a redirect stub, written or already present
    pub fn redirect(&self, written: bool) {
        let counter = if written {
            &self.redirects_written
        } else {
            &self.redirects_skipped
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn media(&self, outcome: MediaOutcome) {
        let counter = match outcome {
            MediaOutcome::Downloaded => &self.media_downloaded,
            MediaOutcome::Upgraded => &self.media_upgraded,
            MediaOutcome::Skipped => &self.media_skipped,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn assets_written(&self, count: u64) {
        self.assets_written.fetch_add(count, Ordering::Relaxed);
    }

    /// Articles handled so far
    pub fn articles_done(&self) -> u64 {
        self.articles_persisted.load(Ordering::Relaxed) + self.articles_skipped.load(Ordering::Relaxed)
    }

    /// Time since the counters were created
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Freezes the counters into a summary
    pub fn snapshot(&self, files_written: u64) -> MirrorStatistics {
        MirrorStatistics {
            articles_total: self.articles_total.load(Ordering::Relaxed),
            articles_persisted: self.articles_persisted.load(Ordering::Relaxed),
            articles_skipped: self.articles_skipped.load(Ordering::Relaxed),
            redirects_total: self.redirects_total.load(Ordering::Relaxed),
            redirects_written: self.redirects_written.load(Ordering::Relaxed),
            redirects_skipped: self.redirects_skipped.load(Ordering::Relaxed),
            media_downloaded: self.media_downloaded.load(Ordering::Relaxed),
            media_upgraded: self.media_upgraded.load(Ordering::Relaxed),
            media_skipped: self.media_skipped.load(Ordering::Relaxed),
            assets_written: self.assets_written.load(Ordering::Relaxed),
            files_written,
            elapsed: self.elapsed(),
        }
    }
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &MirrorStatistics) {
    println!("=== Mirror Statistics ===\n");

    println!("Articles:");
    println!("  In catalog: {}", stats.articles_total);
    println!("  Written: {}", stats.articles_persisted);
    println!("  Already present: {}", stats.articles_skipped);
    println!();

    println!("Redirects:");
    println!("  In catalog: {}", stats.redirects_total);
    println!("  Written: {}", stats.redirects_written);
    println!("  Already present: {}", stats.redirects_skipped);
    println!();

    println!("Media:");
    println!("  Downloaded: {}", stats.media_downloaded);
    println!("  Upgraded: {}", stats.media_upgraded);
    println!("  Skipped: {}", stats.media_skipped);
    println!();

    println!("Shared assets written: {}", stats.assets_written);
    println!("Files written: {}", stats.files_written);

    let seconds = stats.elapsed.as_secs_f64();
    let rate = if seconds > 0.0 {
        stats.articles_persisted as f64 / seconds
    } else {
        0.0
    };
    println!(
        "Elapsed: {:.1}s ({:.2} articles/sec)",
        seconds, rate
    );
}
