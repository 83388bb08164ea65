//! # Interactions Crate
//!
//! This crate handles loading transaction data and reshaping it for the
//! recommendation models.
//!
//! ## Main Components
//!
//! - **types**: Core domain types (Transaction, TransactionLog)
//! - **parser**: Parse transaction CSV files into records
//! - **matrix**: Pivot the log into a CSR user-item matrix
//! - **ids**: Bidirectional external-id <-> dense-index remapping
//! - **popularity**: Global and per-user interaction rankings
//! - **error**: Error types for data loading
//!
//! ## Example Usage
//!
//! ```ignore
//! use interactions::{IdMap, TransactionLog, UserItemMatrix, parser};
//! use std::path::Path;
//!
//! let records = parser::parse_transactions(Path::new("data/transactions.csv"))?;
//! let log = TransactionLog::from_transactions(records);
//!
//! let ids = IdMap::build(&log.users(), &log.items());
//! let matrix = UserItemMatrix::from_log(&log, &ids);
//!
//! let (users, items, records) = log.counts();
//! println!("{users} users, {items} items, {records} records");
//! ```

// Public modules
pub mod error;
pub mod ids;
pub mod matrix;
pub mod parser;
pub mod popularity;
pub mod types;

// Re-export commonly used types for convenience
pub use error::{Result, TransactionLoadError};
pub use ids::IdMap;
pub use matrix::UserItemMatrix;
pub use types::{ItemId, Transaction, TransactionLog, UserId};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_matrix_ids_stay_in_sync() {
        let log = TransactionLog::from_transactions(vec![
            Transaction {
                user_id: 7,
                item_id: 70,
                quantity: 1,
            },
            Transaction {
                user_id: 3,
                item_id: 30,
                quantity: 1,
            },
        ]);
        let ids = IdMap::build(&log.users(), &log.items());
        let matrix = UserItemMatrix::from_log(&log, &ids);

        assert_eq!(matrix.n_rows(), ids.user_count());
        assert_eq!(matrix.n_cols(), ids.item_count());

        // user 3 sorts before user 7, so it owns row 0
        assert_eq!(ids.user_index(3), Some(0));
        let (cols, _) = matrix.row(0);
        assert_eq!(ids.item_id(cols[0] as usize), Some(30));
    }
}
