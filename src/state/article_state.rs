/// Article state definitions for tracking mirror progress
///
/// An article moves `Pending -> Fetching -> Transforming -> Persisted`, or
/// straight from `Pending` to `Skipped` when its file is already on disk.
/// `Failed` can be reached from every non-terminal state.
use std::fmt;

/// Represents the current state of an article during a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArticleState {
    // ===== Active States =====
    /// Article is in the catalog and waiting for a worker
    Pending,

    /// The rendering is being downloaded
    Fetching,

    /// The rendering is being rewritten and its media downloaded
    Transforming,

    // ===== Terminal States =====
    /// The rewritten article was written to disk
    Persisted,

    /// The article file already existed
    Skipped,

    /// A fatal error stopped the article
    Failed,
}

impl ArticleState {
    /// Returns true if no further processing will happen
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Persisted | Self::Skipped | Self::Failed)
    }

    /// Returns true if the article is still being worked on
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// Returns true if the transition `self -> next` is allowed
    pub fn can_transition_to(&self, next: ArticleState) -> bool {
        use ArticleState::*;

        match (self, next) {
            (Pending, Fetching) | (Pending, Skipped) => true,
            (Fetching, Transforming) => true,
            (Transforming, Persisted) => true,
            (from, Failed) => from.is_active(),
            _ => false,
        }
    }

    /// Short lowercase name used in log lines
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Fetching => "fetching",
            Self::Transforming => "transforming",
            Self::Persisted => "persisted",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        }
    }

    /// Returns all possible article states
    pub fn all_states() -> Vec<Self> {
        vec![
            Self::Pending,
            Self::Fetching,
            Self::Transforming,
            Self::Persisted,
            Self::Skipped,
            Self::Failed,
        ]
    }
}

impl fmt::Display for ArticleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
