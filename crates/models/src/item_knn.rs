//! Item-item K-nearest-neighbour models.
//!
//! ## Algorithm
//! 1. Reweight the item-major matrix per the configured scheme (plain
//!    co-occurrence, cosine, TF-IDF or BM25)
//! 2. Build the item-item similarity matrix row by row: scatter-accumulate
//!    over every user who bought the row's item, in parallel over items
//! 3. Prune each row to its K largest entries. Self-similarity is kept,
//!    so a user's own purchases can be recommended back to them -- with
//!    `K = 1` that is all that survives, which is exactly the "own items"
//!    recommender
//! 4. Recommendation scores are the pruned similarity matrix applied to
//!    the user's row: `score(i) = sum_j sim(j, i) * value(u, j)`

use crate::traits::ItemScorer;
use crate::types::{Scored, top_n};
use crate::weighting::{bm25_weight, tfidf_weight};
use interactions::UserItemMatrix;
use rayon::prelude::*;
use tracing::{debug, instrument};

/// Reweighting applied to the item-major matrix before the similarity
/// product.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Weighting {
    /// Plain co-occurrence dot product
    None,
    /// L2-normalized rows, similarity becomes cosine
    Cosine,
    /// `sqrt(tf) * idf`
    TfIdf,
    /// Okapi BM25 with the given parameters
    Bm25 { k1: f32, b: f32 },
}

/// Item-item model configuration.
#[derive(Debug, Clone, Copy)]
pub struct ItemKnnConfig {
    /// Neighbourhood size kept per item
    pub k: usize,
    pub weighting: Weighting,
}

impl Default for ItemKnnConfig {
    fn default() -> Self {
        Self {
            k: 20,
            weighting: Weighting::None,
        }
    }
}

/// A fitted item-item similarity model (pruned CSR, rows sorted by column).
pub struct ItemKnnModel {
    name: &'static str,
    n_items: usize,
    sim_indptr: Vec<usize>,
    sim_indices: Vec<u32>,
    sim_values: Vec<f32>,
}

fn normalize_rows(matrix: &UserItemMatrix) -> UserItemMatrix {
    let mut normalized = matrix.clone();
    let indptr = normalized.indptr().to_vec();
    let values = normalized.values_mut();
    for row in 0..indptr.len() - 1 {
        let slice = &mut values[indptr[row]..indptr[row + 1]];
        let norm: f32 = slice.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in slice.iter_mut() {
                *v /= norm;
            }
        }
    }
    normalized
}

impl ItemKnnModel {
    /// Fit the similarity matrix on a user-item matrix.
    #[instrument(skip(matrix), fields(n_items = matrix.n_cols(), k = config.k))]
    pub fn fit(matrix: &UserItemMatrix, config: ItemKnnConfig) -> Self {
        let item_major = matrix.transposed();
        let weighted = match config.weighting {
            Weighting::None => item_major,
            Weighting::Cosine => normalize_rows(&item_major),
            Weighting::TfIdf => tfidf_weight(&item_major),
            Weighting::Bm25 { k1, b } => bm25_weight(&item_major, k1, b),
        };
        let user_major = weighted.transposed();
        let n_items = weighted.n_rows();
        let k = config.k.max(1);

        // Row-wise top K in parallel
        let rows: Vec<(Vec<u32>, Vec<f32>)> = (0..n_items)
            .into_par_iter()
            .map(|item| {
                let (users, item_weights) = weighted.row(item);
                let mut scores = vec![0.0f32; n_items];
                for (&user, &w_iu) in users.iter().zip(item_weights) {
                    let (other_items, other_weights) = user_major.row(user as usize);
                    for (&j, &w_ju) in other_items.iter().zip(other_weights) {
                        scores[j as usize] += w_iu * w_ju;
                    }
                }

                let mut row: Vec<(f32, u32)> = scores
                    .into_iter()
                    .enumerate()
                    .filter(|&(_, score)| score > 0.0)
                    .map(|(j, score)| (score, j as u32))
                    .collect();

                let take = k.min(row.len());
                if take == 0 {
                    return (vec![], vec![]);
                }
                // Score descending; equal scores resolve to self first, then
                // lowest index, so pruning is deterministic and K = 1 always
                // keeps the self entry
                let by_score = |a: &(f32, u32), b: &(f32, u32)| {
                    b.0.partial_cmp(&a.0)
                        .unwrap_or(std::cmp::Ordering::Equal)
                        .then_with(|| (b.1 == item as u32).cmp(&(a.1 == item as u32)))
                        .then_with(|| a.1.cmp(&b.1))
                };
                row.select_nth_unstable_by(take - 1, by_score);
                row.truncate(take);
                // Sort by index so the pruned rows stay valid CSR
                row.sort_unstable_by_key(|&(_, j)| j);

                let indices: Vec<u32> = row.iter().map(|&(_, j)| j).collect();
                let values: Vec<f32> = row.iter().map(|&(score, _)| score).collect();
                (indices, values)
            })
            .collect();

        let mut sim_indptr = Vec::with_capacity(n_items + 1);
        sim_indptr.push(0);
        let mut total = 0;
        for (indices, _) in &rows {
            total += indices.len();
            sim_indptr.push(total);
        }

        let mut sim_indices = Vec::with_capacity(total);
        let mut sim_values = Vec::with_capacity(total);
        for (indices, values) in rows {
            sim_indices.extend(indices);
            sim_values.extend(values);
        }

        debug!(
            "Fitted {} similarity matrix: {} items, {} stored neighbours",
            variant_name(config.weighting),
            n_items,
            total
        );

        Self {
            name: variant_name(config.weighting),
            n_items,
            sim_indptr,
            sim_indices,
            sim_values,
        }
    }

    /// Dense similarity-weighted scores for one user row
    fn user_scores(&self, cols: &[u32], vals: &[f32]) -> Vec<f32> {
        let mut scores = vec![0.0f32; self.n_items];
        for (&col, &value) in cols.iter().zip(vals) {
            let j = col as usize;
            if j >= self.n_items {
                continue;
            }
            for idx in self.sim_indptr[j]..self.sim_indptr[j + 1] {
                scores[self.sim_indices[idx] as usize] += self.sim_values[idx] * value;
            }
        }
        scores
    }
}

fn variant_name(weighting: Weighting) -> &'static str {
    match weighting {
        Weighting::None => "item-item",
        Weighting::Cosine => "cosine",
        Weighting::TfIdf => "tfidf",
        Weighting::Bm25 { .. } => "bm25",
    }
}

impl ItemScorer for ItemKnnModel {
    fn name(&self) -> &str {
        self.name
    }

    fn recommend(
        &self,
        user_index: usize,
        matrix: &UserItemMatrix,
        n: usize,
        filter_items: &[usize],
    ) -> Vec<Scored> {
        let (cols, vals) = matrix.row(user_index);
        if cols.is_empty() {
            return Vec::new();
        }

        let scores = self.user_scores(cols, vals);
        let scored: Vec<(f32, usize)> = scores
            .into_iter()
            .enumerate()
            .filter(|&(i, score)| score > 0.0 && !filter_items.contains(&i))
            .map(|(i, score)| (score, i))
            .collect();
        top_n(scored, n)
    }

    fn rank_items(
        &self,
        user_index: usize,
        matrix: &UserItemMatrix,
        selected: &[usize],
    ) -> Vec<Scored> {
        let (cols, vals) = matrix.row(user_index);
        let scores = self.user_scores(cols, vals);

        let scored: Vec<(f32, usize)> = selected
            .iter()
            .filter(|&&i| i < self.n_items)
            .map(|&i| (scores[i], i))
            .collect();
        top_n(scored, selected.len())
    }

    fn similar_items(&self, item_index: usize, n: usize) -> Vec<Scored> {
        if item_index >= self.n_items {
            return Vec::new();
        }
        let scored: Vec<(f32, usize)> = (self.sim_indptr[item_index]
            ..self.sim_indptr[item_index + 1])
            .map(|idx| (self.sim_values[idx], self.sim_indices[idx] as usize))
            .collect();
        top_n(scored, n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use interactions::{IdMap, Transaction, TransactionLog};

    fn tx(user_id: u64, item_id: u64) -> Transaction {
        Transaction {
            user_id,
            item_id,
            quantity: 1,
        }
    }

    /// Users 1 and 2 share items 10 and 11; user 2 also buys 12;
    /// user 3 buys only item 13.
    fn create_test_matrix() -> (UserItemMatrix, IdMap) {
        let log = TransactionLog::from_transactions(vec![
            tx(1, 10),
            tx(1, 11),
            tx(2, 10),
            tx(2, 11),
            tx(2, 12),
            tx(3, 13),
        ]);
        let ids = IdMap::build(&log.users(), &log.items());
        let matrix = UserItemMatrix::from_log(&log, &ids);
        (matrix, ids)
    }

    #[test]
    fn test_cosine_similar_items_self_first() {
        let (matrix, ids) = create_test_matrix();
        let model = ItemKnnModel::fit(
            &matrix,
            ItemKnnConfig {
                k: 3,
                weighting: Weighting::Cosine,
            },
        );

        let idx_10 = ids.item_index(10).unwrap();
        let idx_11 = ids.item_index(11).unwrap();

        let similar = model.similar_items(idx_10, 3);
        assert_eq!(similar[0].index, idx_10);
        assert!((similar[0].score - 1.0).abs() < 1e-5);
        // item 11 shares both buyers with item 10
        assert_eq!(similar[1].index, idx_11);
    }

    #[test]
    fn test_recommend_surfaces_co_purchases() {
        let (matrix, ids) = create_test_matrix();
        let model = ItemKnnModel::fit(
            &matrix,
            ItemKnnConfig {
                k: 4,
                weighting: Weighting::Cosine,
            },
        );

        // user 1 (row 0) never bought item 12, but co-buyer user 2 did
        let idx_12 = ids.item_index(12).unwrap();
        let idx_13 = ids.item_index(13).unwrap();
        let recs = model.recommend(0, &matrix, 4, &[]);

        let indices: Vec<usize> = recs.iter().map(|s| s.index).collect();
        assert!(indices.contains(&idx_12));
        // item 13 shares no buyers: zero similarity, never recommended
        assert!(!indices.contains(&idx_13));
    }

    #[test]
    fn test_recommend_respects_filter() {
        let (matrix, ids) = create_test_matrix();
        let model = ItemKnnModel::fit(&matrix, ItemKnnConfig::default());

        let idx_10 = ids.item_index(10).unwrap();
        let recs = model.recommend(0, &matrix, 4, &[idx_10]);
        assert!(recs.iter().all(|s| s.index != idx_10));
    }

    #[test]
    fn test_own_items_variant_only_returns_purchases() {
        let (matrix, ids) = create_test_matrix();
        // K = 1 keeps self-similarity only
        let model = ItemKnnModel::fit(
            &matrix,
            ItemKnnConfig {
                k: 1,
                weighting: Weighting::None,
            },
        );

        let recs = model.recommend(0, &matrix, 5, &[]);
        let owned: Vec<usize> = vec![
            ids.item_index(10).unwrap(),
            ids.item_index(11).unwrap(),
        ];
        assert_eq!(recs.len(), 2);
        assert!(recs.iter().all(|s| owned.contains(&s.index)));
    }

    #[test]
    fn test_untrained_user_scores_empty() {
        let (matrix, _) = create_test_matrix();
        let model = ItemKnnModel::fit(&matrix, ItemKnnConfig::default());

        assert!(model.recommend(99, &matrix, 5, &[]).is_empty());
    }

    #[test]
    fn test_rank_items_keeps_zero_scores() {
        let (matrix, ids) = create_test_matrix();
        let model = ItemKnnModel::fit(&matrix, ItemKnnConfig::default());

        let idx_13 = ids.item_index(13).unwrap();
        let idx_10 = ids.item_index(10).unwrap();

        // item 13 scores zero for user 1 but must still be ranked
        let ranked = model.rank_items(0, &matrix, &[idx_13, idx_10]);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].index, idx_10);
        assert_eq!(ranked[1].index, idx_13);
        assert_eq!(ranked[1].score, 0.0);
    }

    #[test]
    fn test_bm25_variant_smoke() {
        let (matrix, ids) = create_test_matrix();
        let model = ItemKnnModel::fit(
            &matrix,
            ItemKnnConfig {
                k: 4,
                weighting: Weighting::Bm25 { k1: 1.2, b: 0.75 },
            },
        );

        let recs = model.recommend(0, &matrix, 4, &[]);
        assert!(!recs.is_empty());
        let idx_13 = ids.item_index(13).unwrap();
        assert!(recs.iter().all(|s| s.index != idx_13));
    }
}
