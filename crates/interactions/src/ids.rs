//! Bidirectional id remapping between external identifiers and dense
//! matrix indices.
//!
//! The models operate on dense integer-indexed matrices, not external ids,
//! so every user and item gets a dense index at build time. The four
//! mappings (index -> user id, user id -> index, and the item pair) must
//! stay bijective and in sync with the matrix's row/column order.
//!
//! Users first seen at inference time can be appended with a fresh index
//! via [`IdMap::register_user`]. No matrix row exists for such users, so
//! every trained model scores them empty and the recommendation layer falls
//! back to popularity.

use crate::types::{ItemId, UserId};
use std::collections::HashMap;

/// Dense-index <-> external-id bijection for users and items.
#[derive(Debug, Clone, Default)]
pub struct IdMap {
    users: Vec<UserId>,
    items: Vec<ItemId>,
    user_to_index: HashMap<UserId, usize>,
    item_to_index: HashMap<ItemId, usize>,
}

impl IdMap {
    /// Build the mappings from the matrix's row and column id sets.
    ///
    /// `users[i]` becomes row index `i`, `items[j]` column index `j`.
    pub fn build(users: &[UserId], items: &[ItemId]) -> Self {
        let user_to_index = users.iter().enumerate().map(|(i, &u)| (u, i)).collect();
        let item_to_index = items.iter().enumerate().map(|(j, &it)| (it, j)).collect();
        Self {
            users: users.to_vec(),
            items: items.to_vec(),
            user_to_index,
            item_to_index,
        }
    }

    /// Dense row index for an external user id
    pub fn user_index(&self, user: UserId) -> Option<usize> {
        self.user_to_index.get(&user).copied()
    }

    /// Dense column index for an external item id
    pub fn item_index(&self, item: ItemId) -> Option<usize> {
        self.item_to_index.get(&item).copied()
    }

    /// External user id for a dense row index
    pub fn user_id(&self, index: usize) -> Option<UserId> {
        self.users.get(index).copied()
    }

    /// External item id for a dense column index
    pub fn item_id(&self, index: usize) -> Option<ItemId> {
        self.items.get(index).copied()
    }

    /// Register a user id seen at inference time.
    ///
    /// Known users keep their index (no-op); unseen users are appended with
    /// the next unused index. The caller is responsible for remembering that
    /// appended indices have no matrix row.
    pub fn register_user(&mut self, user: UserId) -> usize {
        if let Some(&index) = self.user_to_index.get(&user) {
            return index;
        }
        let index = self.users.len();
        self.users.push(user);
        self.user_to_index.insert(user, index);
        index
    }

    /// Number of registered users (including inference-time additions)
    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    /// Number of registered items
    pub fn item_count(&self) -> usize {
        self.items.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_round_trip() {
        let ids = IdMap::build(&[10, 20, 30], &[100, 200]);

        assert_eq!(ids.user_count(), 3);
        assert_eq!(ids.item_count(), 2);

        for (index, user) in [10, 20, 30].into_iter().enumerate() {
            assert_eq!(ids.user_index(user), Some(index));
            assert_eq!(ids.user_id(index), Some(user));
        }
        assert_eq!(ids.item_index(200), Some(1));
        assert_eq!(ids.item_id(1), Some(200));
    }

    #[test]
    fn test_unknown_lookups() {
        let ids = IdMap::build(&[10], &[100]);

        assert_eq!(ids.user_index(999), None);
        assert_eq!(ids.item_index(999), None);
        assert_eq!(ids.user_id(5), None);
        assert_eq!(ids.item_id(5), None);
    }

    #[test]
    fn test_register_user_appends_fresh_index() {
        let mut ids = IdMap::build(&[10, 20], &[100]);

        let index = ids.register_user(99);
        assert_eq!(index, 2);
        assert_eq!(ids.user_index(99), Some(2));
        assert_eq!(ids.user_id(2), Some(99));
        assert_eq!(ids.user_count(), 3);
    }

    #[test]
    fn test_register_known_user_is_noop() {
        let mut ids = IdMap::build(&[10, 20], &[100]);

        assert_eq!(ids.register_user(20), 1);
        assert_eq!(ids.user_count(), 2);
    }
}
