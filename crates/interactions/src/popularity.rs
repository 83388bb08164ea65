//! Popularity rankings derived from the transaction log.
//!
//! The global ranking backs the popularity fallback: whenever a model
//! produces fewer results than requested, the head of this list pads the
//! difference. The per-user ranking feeds the similar-items composite.
//! Both exclude the sentinel "unknown item" id when one is configured.

use crate::types::{ItemId, TransactionLog, UserId};

/// Item ids ranked by global interaction count, descending.
///
/// Ties break on ascending item id so the ranking is deterministic.
pub fn overall_top_items(log: &TransactionLog, exclude: Option<ItemId>) -> Vec<ItemId> {
    let mut ranked: Vec<(ItemId, u32)> = log
        .item_counts()
        .filter(|&(item, _)| Some(item) != exclude)
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.into_iter().map(|(item, _)| item).collect()
}

/// One user's items ranked by interaction count, descending.
///
/// Empty for users with no transactions.
pub fn top_purchases(
    log: &TransactionLog,
    user: UserId,
    exclude: Option<ItemId>,
) -> Vec<(ItemId, u32)> {
    let Some(counts) = log.user_item_counts(user) else {
        return Vec::new();
    };
    let mut ranked: Vec<(ItemId, u32)> = counts
        .iter()
        .map(|(&item, &count)| (item, count))
        .filter(|&(item, _)| Some(item) != exclude)
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked
}
