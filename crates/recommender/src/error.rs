//! Error types for the recommendation layer.

use interactions::UserId;
use thiserror::Error;

/// Errors surfaced by the recommendation entry points
#[derive(Error, Debug)]
pub enum RecommendError {
    /// The engine cannot be fitted on an empty transaction log
    #[error("transaction log is empty")]
    EmptyTransactionLog,

    /// The user id has never been seen, neither at fit time nor registered
    /// since
    #[error("unknown user id {user}")]
    UnknownUser { user: UserId },

    /// Even after popularity padding the result list is short: the
    /// popularity pool itself holds fewer items than requested
    #[error("got {got} recommendations, requested {want}: popularity pool exhausted")]
    NotEnoughRecommendations { got: usize, want: usize },
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, RecommendError>;
