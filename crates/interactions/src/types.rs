//! Core domain types for the transaction log.
//!
//! The log is the source of truth for everything downstream: the user-item
//! matrix, the id-remapping tables and the popularity rankings are all
//! derived from it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// External identifier for a user, as it appears in the transaction table
pub type UserId = u64;

/// External identifier for an item, as it appears in the transaction table
pub type ItemId = u64;

/// A single purchase record.
///
/// `quantity` is carried through from the source table, but interaction
/// strength downstream is the *record count* per (user, item) pair, matching
/// the count aggregation the matrix builder applies.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Transaction {
    pub user_id: UserId,
    pub item_id: ItemId,
    pub quantity: u32,
}

/// In-memory store of all transactions plus aggregate indices.
///
/// BTreeMaps keep users and items in sorted id order, which fixes the
/// row/column order of the matrix built from this log.
#[derive(Debug, Default)]
pub struct TransactionLog {
    transactions: Vec<Transaction>,

    /// Interaction count per (user, item) pair -- one count per record
    user_item_counts: BTreeMap<UserId, BTreeMap<ItemId, u32>>,

    /// Interaction count per item across the whole log
    item_counts: BTreeMap<ItemId, u32>,
}

impl TransactionLog {
    /// Creates a new, empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a log from a batch of transactions
    pub fn from_transactions(transactions: Vec<Transaction>) -> Self {
        let mut log = Self::new();
        for tx in transactions {
            log.insert(tx);
        }
        log
    }

    /// Insert a transaction and update the aggregate indices
    pub fn insert(&mut self, tx: Transaction) {
        *self
            .user_item_counts
            .entry(tx.user_id)
            .or_default()
            .entry(tx.item_id)
            .or_insert(0) += 1;
        *self.item_counts.entry(tx.item_id).or_insert(0) += 1;
        self.transactions.push(tx);
    }

    /// All raw transaction records, in insertion order
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// All user ids seen in the log, sorted ascending
    pub fn users(&self) -> Vec<UserId> {
        self.user_item_counts.keys().copied().collect()
    }

    /// All item ids seen in the log, sorted ascending
    pub fn items(&self) -> Vec<ItemId> {
        self.item_counts.keys().copied().collect()
    }

    /// Interaction counts for one user, keyed by item id
    ///
    /// Returns `None` for users with no transactions.
    pub fn user_item_counts(&self, user_id: UserId) -> Option<&BTreeMap<ItemId, u32>> {
        self.user_item_counts.get(&user_id)
    }

    /// Global interaction count for an item
    pub fn item_count(&self, item_id: ItemId) -> u32 {
        self.item_counts.get(&item_id).copied().unwrap_or(0)
    }

    /// Iterate over (item id, global interaction count) pairs
    pub fn item_counts(&self) -> impl Iterator<Item = (ItemId, u32)> + '_ {
        self.item_counts.iter().map(|(&item, &count)| (item, count))
    }

    /// Get counts for debugging/validation
    pub fn counts(&self) -> (usize, usize, usize) {
        (
            self.user_item_counts.len(),
            self.item_counts.len(),
            self.transactions.len(),
        )
    }

    /// Whether the log holds no transactions at all
    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_updates_aggregates() {
        let mut log = TransactionLog::new();

        log.insert(Transaction {
            user_id: 1,
            item_id: 10,
            quantity: 2,
        });
        log.insert(Transaction {
            user_id: 1,
            item_id: 10,
            quantity: 1,
        });
        log.insert(Transaction {
            user_id: 2,
            item_id: 20,
            quantity: 5,
        });

        // Two records for (1, 10), regardless of quantity
        assert_eq!(log.user_item_counts(1).unwrap()[&10], 2);
        assert_eq!(log.item_count(10), 2);
        assert_eq!(log.item_count(20), 1);
        assert_eq!(log.counts(), (2, 2, 3));
    }

    #[test]
    fn test_sorted_users_and_items() {
        let log = TransactionLog::from_transactions(vec![
            Transaction {
                user_id: 5,
                item_id: 30,
                quantity: 1,
            },
            Transaction {
                user_id: 2,
                item_id: 10,
                quantity: 1,
            },
            Transaction {
                user_id: 9,
                item_id: 20,
                quantity: 1,
            },
        ]);

        assert_eq!(log.users(), vec![2, 5, 9]);
        assert_eq!(log.items(), vec![10, 20, 30]);
    }

    #[test]
    fn test_empty_queries() {
        let log = TransactionLog::new();

        assert!(log.is_empty());
        assert!(log.user_item_counts(999).is_none());
        assert_eq!(log.item_count(999), 0);
    }
}
