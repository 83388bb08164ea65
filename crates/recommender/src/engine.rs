//! # Recommendation engine
//!
//! This module coordinates the whole recommendation flow:
//! 1. Aggregate the transaction log (popularity, per-user top purchases)
//! 2. Build the id maps and the user-item matrix
//! 3. Optionally reweight the matrix with BM25
//! 4. Fit the five model variants
//! 5. Serve per-variant recommendation and score queries, padded to a
//!    fixed length from the popularity ranking
//!
//! Every entry point returns exactly `n` results or fails with
//! [`RecommendError::NotEnoughRecommendations`] when the popularity pool
//! itself cannot cover the shortfall.

use std::collections::HashMap;

use interactions::{IdMap, ItemId, TransactionLog, UserId, UserItemMatrix, popularity};
use models::weighting::bm25_weight;
use models::{AlsConfig, AlsModel, ItemKnnConfig, ItemKnnModel, ItemScorer, Weighting};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::error::{RecommendError, Result};

/// Engine configuration.
#[derive(Debug, Clone, Copy)]
pub struct RecommenderConfig {
    /// Apply global BM25 weighting to the matrix before fitting
    pub weighting: bool,
    /// BM25 parameters for the global weighting pass
    pub weighting_k1: f32,
    pub weighting_b: f32,

    /// Sentinel "unknown item" id: excluded from popularity and top
    /// purchases, and filtered out of every model's results
    pub unknown_item: Option<ItemId>,

    /// ALS hyperparameters
    pub als: AlsConfig,
    /// Neighbourhood size of the cosine variant
    pub cosine_k: usize,
    /// Neighbourhood size of the BM25 and TF-IDF variants
    pub knn_k: usize,
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        Self {
            weighting: true,
            weighting_k1: 5.0,
            weighting_b: 0.1,
            unknown_item: Some(999_999),
            als: AlsConfig::default(),
            cosine_k: 2,
            knn_k: 20,
        }
    }
}

/// An external item id with its model score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredItem {
    pub item: ItemId,
    pub score: f32,
}

/// The fitted engine: matrix, id maps, popularity tables and the five
/// model variants behind the public entry points.
pub struct Recommender {
    config: RecommenderConfig,
    ids: IdMap,
    matrix: UserItemMatrix,
    overall_top: Vec<ItemId>,
    top_purchases: HashMap<UserId, Vec<(ItemId, u32)>>,
    als: AlsModel,
    bm25: ItemKnnModel,
    tfidf: ItemKnnModel,
    cosine: ItemKnnModel,
    own: ItemKnnModel,
}

impl Recommender {
    /// Fit the engine on a transaction log.
    #[instrument(skip(log, config))]
    pub fn fit(log: &TransactionLog, config: RecommenderConfig) -> Result<Self> {
        if log.is_empty() {
            return Err(RecommendError::EmptyTransactionLog);
        }

        let (users, items, records) = log.counts();
        info!("Fitting recommender on {users} users, {items} items, {records} records");

        let overall_top = popularity::overall_top_items(log, config.unknown_item);
        let top_purchases: HashMap<UserId, Vec<(ItemId, u32)>> = log
            .users()
            .into_iter()
            .map(|user| (user, popularity::top_purchases(log, user, config.unknown_item)))
            .collect();

        let ids = IdMap::build(&log.users(), &log.items());
        let mut matrix = UserItemMatrix::from_log(log, &ids);

        if config.weighting {
            // Items are the BM25 documents, so weight the item-major
            // orientation and transpose back
            matrix = bm25_weight(
                &matrix.transposed(),
                config.weighting_k1,
                config.weighting_b,
            )
            .transposed();
            info!(
                "Applied BM25 weighting (k1 = {}, b = {})",
                config.weighting_k1, config.weighting_b
            );
        }

        let als = AlsModel::fit(&matrix, config.als);
        info!("Fitted ALS");

        let bm25 = ItemKnnModel::fit(
            &matrix,
            ItemKnnConfig {
                k: config.knn_k,
                weighting: Weighting::Bm25 { k1: 1.2, b: 0.75 },
            },
        );
        let tfidf = ItemKnnModel::fit(
            &matrix,
            ItemKnnConfig {
                k: config.knn_k,
                weighting: Weighting::TfIdf,
            },
        );
        let cosine = ItemKnnModel::fit(
            &matrix,
            ItemKnnConfig {
                k: config.cosine_k,
                weighting: Weighting::Cosine,
            },
        );
        let own = ItemKnnModel::fit(
            &matrix,
            ItemKnnConfig {
                k: 1,
                weighting: Weighting::None,
            },
        );
        info!("Fitted item-item variants");

        Ok(Self {
            config,
            ids,
            matrix,
            overall_top,
            top_purchases,
            als,
            bm25,
            tfidf,
            cosine,
            own,
        })
    }

    // ------------------------------------------------------------------
    // Per-variant recommendations
    // ------------------------------------------------------------------

    #[instrument(skip(self))]
    pub fn get_als_recommendations(&mut self, user: UserId, n: usize) -> Result<Vec<ItemId>> {
        self.register_user(user);
        self.recommend_with(&self.als, user, n)
    }

    #[instrument(skip(self))]
    pub fn get_bm25_recommendations(&mut self, user: UserId, n: usize) -> Result<Vec<ItemId>> {
        self.register_user(user);
        self.recommend_with(&self.bm25, user, n)
    }

    #[instrument(skip(self))]
    pub fn get_tfidf_recommendations(&mut self, user: UserId, n: usize) -> Result<Vec<ItemId>> {
        self.register_user(user);
        self.recommend_with(&self.tfidf, user, n)
    }

    #[instrument(skip(self))]
    pub fn get_cosine_recommendations(&mut self, user: UserId, n: usize) -> Result<Vec<ItemId>> {
        self.register_user(user);
        self.recommend_with(&self.cosine, user, n)
    }

    /// Recommend among the items the user already bought
    #[instrument(skip(self))]
    pub fn get_own_recommendations(&mut self, user: UserId, n: usize) -> Result<Vec<ItemId>> {
        self.register_user(user);
        self.recommend_with(&self.own, user, n)
    }

    // ------------------------------------------------------------------
    // Per-variant scores
    // ------------------------------------------------------------------

    #[instrument(skip(self))]
    pub fn get_als_scores(&mut self, user: UserId, n: usize) -> Result<Vec<ScoredItem>> {
        self.register_user(user);
        self.scores_with(&self.als, user, n)
    }

    #[instrument(skip(self))]
    pub fn get_bm25_scores(&mut self, user: UserId, n: usize) -> Result<Vec<ScoredItem>> {
        self.register_user(user);
        self.scores_with(&self.bm25, user, n)
    }

    #[instrument(skip(self))]
    pub fn get_tfidf_scores(&mut self, user: UserId, n: usize) -> Result<Vec<ScoredItem>> {
        self.register_user(user);
        self.scores_with(&self.tfidf, user, n)
    }

    #[instrument(skip(self))]
    pub fn get_cosine_scores(&mut self, user: UserId, n: usize) -> Result<Vec<ScoredItem>> {
        self.register_user(user);
        self.scores_with(&self.cosine, user, n)
    }

    #[instrument(skip(self))]
    pub fn get_own_scores(&mut self, user: UserId, n: usize) -> Result<Vec<ScoredItem>> {
        self.register_user(user);
        self.scores_with(&self.own, user, n)
    }

    // ------------------------------------------------------------------
    // Similarity composites
    // ------------------------------------------------------------------

    /// Recommend items similar to the user's top `n` purchases: one
    /// nearest other item per purchase, popularity-padded.
    #[instrument(skip(self))]
    pub fn get_similar_items_recommendation(
        &mut self,
        user: UserId,
        n: usize,
    ) -> Result<Vec<ItemId>> {
        let top: Vec<ItemId> = self
            .top_purchases
            .get(&user)
            .map(|ranked| ranked.iter().take(n).map(|&(item, _)| item).collect())
            .unwrap_or_default();

        let mut items: Vec<ItemId> = top
            .into_iter()
            .filter_map(|item| self.similar_item(item))
            .collect();
        self.extend_with_top_popular(&mut items, n);
        self.check_len(items.len(), n)?;
        Ok(items)
    }

    /// Recommend the top pick of each of the user's `n` most similar
    /// users, popularity-padded.
    #[instrument(skip(self))]
    pub fn get_similar_users_recommendation(
        &mut self,
        user: UserId,
        n: usize,
    ) -> Result<Vec<ItemId>> {
        let user_index = self
            .ids
            .user_index(user)
            .ok_or(RecommendError::UnknownUser { user })?;

        let similar = self.als.similar_users(user_index, n + 1);
        debug!("Found {} similar users for user {}", similar.len(), user);

        let mut items = Vec::new();
        for scored in similar {
            if scored.index == user_index {
                continue;
            }
            let Some(similar_user) = self.ids.user_id(scored.index) else {
                continue;
            };
            items.extend(self.recommend_with(&self.own, similar_user, 1)?);
        }

        self.extend_with_top_popular(&mut items, n);
        self.check_len(items.len(), n)?;
        Ok(items)
    }

    // ------------------------------------------------------------------
    // Shared plumbing
    // ------------------------------------------------------------------

    /// The global popularity ranking (sentinel excluded), best first
    pub fn popular_items(&self, n: usize) -> Vec<ItemId> {
        self.overall_top.iter().take(n).copied().collect()
    }

    /// Make sure an inference-time user id has a dense index. New ids get
    /// appended without a matrix row, so their recommendations come from
    /// the popularity fallback.
    fn register_user(&mut self, user: UserId) {
        if self.ids.user_index(user).is_none() {
            let index = self.ids.register_user(user);
            debug!("Registered new user {} at index {}", user, index);
        }
    }

    fn recommend_with(&self, model: &dyn ItemScorer, user: UserId, n: usize) -> Result<Vec<ItemId>> {
        let user_index = self
            .ids
            .user_index(user)
            .ok_or(RecommendError::UnknownUser { user })?;
        let filter = self.filter_indices();

        let recs = model.recommend(user_index, &self.matrix, n, &filter);
        let mut items: Vec<ItemId> = recs
            .iter()
            .filter_map(|scored| self.ids.item_id(scored.index))
            .collect();

        self.extend_with_top_popular(&mut items, n);
        self.check_len(items.len(), n)?;
        Ok(items)
    }

    fn scores_with(&self, model: &dyn ItemScorer, user: UserId, n: usize) -> Result<Vec<ScoredItem>> {
        let user_index = self
            .ids
            .user_index(user)
            .ok_or(RecommendError::UnknownUser { user })?;
        let filter = self.filter_indices();

        let mut scored: Vec<ScoredItem> = model
            .recommend(user_index, &self.matrix, n, &filter)
            .into_iter()
            .filter_map(|s| {
                self.ids.item_id(s.index).map(|item| ScoredItem {
                    item,
                    score: s.score,
                })
            })
            .collect();

        if scored.len() < n {
            // Top up by ranking the popularity pool through the same model
            let selected: Vec<usize> = self
                .overall_top
                .iter()
                .filter_map(|&item| self.ids.item_index(item))
                .collect();
            let extra = model.rank_items(user_index, &self.matrix, &selected);
            scored.extend(extra.into_iter().filter_map(|s| {
                self.ids.item_id(s.index).map(|item| ScoredItem {
                    item,
                    score: s.score,
                })
            }));
        }

        scored.truncate(n);
        self.check_len(scored.len(), n)?;
        Ok(scored)
    }

    /// Nearest other item for one item, via the ALS factor space.
    ///
    /// The item itself and the sentinel item are not valid targets.
    fn similar_item(&self, item: ItemId) -> Option<ItemId> {
        let item_index = self.ids.item_index(item)?;
        let filter = self.filter_indices();
        self.als
            .similar_items(item_index, 2 + filter.len())
            .into_iter()
            .find(|scored| scored.index != item_index && !filter.contains(&scored.index))
            .and_then(|scored| self.ids.item_id(scored.index))
    }

    /// Pad a short list from the head of the popularity ranking.
    ///
    /// Deliberately no deduplication against the model results: padding
    /// mirrors `extend ++ truncate`.
    fn extend_with_top_popular(&self, items: &mut Vec<ItemId>, n: usize) {
        if items.len() < n {
            items.extend(self.overall_top.iter().take(n).copied());
            items.truncate(n);
        }
    }

    fn check_len(&self, got: usize, want: usize) -> Result<()> {
        if got != want {
            return Err(RecommendError::NotEnoughRecommendations { got, want });
        }
        Ok(())
    }

    fn filter_indices(&self) -> Vec<usize> {
        self.config
            .unknown_item
            .and_then(|item| self.ids.item_index(item))
            .into_iter()
            .collect()
    }
}
