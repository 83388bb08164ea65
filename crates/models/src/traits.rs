//! Core trait for the recommendation models.
//!
//! Every model variant scores in internal index space against the matrix it
//! was fitted on, so the dispatch layer can treat all of them uniformly.

use crate::types::Scored;
use interactions::UserItemMatrix;

/// Common scoring surface for the model variants.
///
/// ## Design Note
/// - `Send + Sync` allows models to be shared across threads
/// - User indices at or beyond the trained row count return an empty list
///   rather than an error; such indices belong to users registered after
///   fitting, and the recommendation layer handles them via its popularity
///   fallback
pub trait ItemScorer: Send + Sync {
    /// Returns the name of this model (for logging/debugging)
    fn name(&self) -> &str;

    /// Score all items for a user and return the top `n`.
    ///
    /// # Arguments
    /// * `user_index` - Dense row index of the user
    /// * `matrix` - The user-item matrix the model was fitted on
    /// * `n` - Number of results requested
    /// * `filter_items` - Item indices to exclude from the results
    fn recommend(
        &self,
        user_index: usize,
        matrix: &UserItemMatrix,
        n: usize,
        filter_items: &[usize],
    ) -> Vec<Scored>;

    /// Score a selected subset of items for a user, returned in descending
    /// score order. Unlike [`ItemScorer::recommend`], zero scores are kept:
    /// the caller decides how much of the ranking it needs.
    fn rank_items(
        &self,
        user_index: usize,
        matrix: &UserItemMatrix,
        selected: &[usize],
    ) -> Vec<Scored>;

    /// The `n` items most similar to an item, best first.
    ///
    /// The query item itself is part of the result set (ranked first for
    /// every variant, since self-similarity is maximal).
    fn similar_items(&self, item_index: usize, n: usize) -> Vec<Scored>;
}
