//! State module for tracking mirror progress
//!
//! # Components
//!
//! - `ArticleState`: the lifecycle of a single article within a run
//! - `ArticleProgress`: an article's current state with checked transitions

mod article_state;

pub use article_state::ArticleState;

use crate::MirrorError;

/// Tracks one article through its lifecycle, rejecting invalid transitions
#[derive(Debug, Clone)]
pub struct ArticleProgress {
    id: String,
    state: ArticleState,
}

impl ArticleProgress {
    /// Starts tracking an article in the `Pending` state
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            state: ArticleState::Pending,
        }
    }

    /// The article identifier
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The current state
    pub fn state(&self) -> ArticleState {
        self.state
    }

    /// Moves to `next`, or returns `MirrorError::InvalidTransition`
    pub fn advance(&mut self, next: ArticleState) -> Result<(), MirrorError> {
        if !self.state.can_transition_to(next) {
            return Err(MirrorError::InvalidTransition {
                id: self.id.clone(),
                from: self.state,
                to: next,
            });
        }
        tracing::trace!("{}: {} -> {}", self.id, self.state, next);
        self.state = next;
        Ok(())
    }
}
