//! The user-item interaction matrix.
//!
//! A CSR pivot of the transaction log: rows = users, columns = items,
//! values = interaction counts as `f32`, zero-filled for absent pairs.
//! Row and column order follow the sorted id order of the log, matching
//! the [`crate::IdMap`] built alongside it.

use crate::ids::IdMap;
use crate::types::TransactionLog;
use rayon::prelude::*;
use tracing::debug;

/// Sparse user-item matrix in CSR layout.
#[derive(Debug, Clone)]
pub struct UserItemMatrix {
    n_rows: usize,
    n_cols: usize,
    indptr: Vec<usize>,
    indices: Vec<u32>,
    values: Vec<f32>,
}

impl UserItemMatrix {
    /// Pivot the transaction log into a CSR matrix.
    ///
    /// Rows follow the order of `ids`' users, columns the order of its
    /// items; both must have been built from the same log.
    pub fn from_log(log: &TransactionLog, ids: &IdMap) -> Self {
        let n_rows = ids.user_count();
        let n_cols = ids.item_count();

        let mut indptr = Vec::with_capacity(n_rows + 1);
        let mut indices = Vec::new();
        let mut values = Vec::new();

        indptr.push(0);
        for row in 0..n_rows {
            let user = ids.user_id(row).expect("row index within id map");
            if let Some(counts) = log.user_item_counts(user) {
                // BTreeMap iteration is in ascending item-id order, which is
                // exactly the column order, so indices stay sorted per row.
                for (&item, &count) in counts {
                    let col = ids.item_index(item).expect("item from log is mapped");
                    indices.push(col as u32);
                    values.push(count as f32);
                }
            }
            indptr.push(indices.len());
        }

        debug!(
            "Built user-item matrix: {} x {} with {} non-zeros",
            n_rows,
            n_cols,
            indices.len()
        );

        Self {
            n_rows,
            n_cols,
            indptr,
            indices,
            values,
        }
    }

    /// Assemble a matrix from raw CSR parts.
    ///
    /// `indptr` must have `n_rows + 1` monotonically non-decreasing entries
    /// and every index must be below `n_cols`.
    pub fn from_parts(
        n_rows: usize,
        n_cols: usize,
        indptr: Vec<usize>,
        indices: Vec<u32>,
        values: Vec<f32>,
    ) -> Self {
        debug_assert_eq!(indptr.len(), n_rows + 1);
        debug_assert_eq!(indices.len(), values.len());
        debug_assert!(indices.iter().all(|&c| (c as usize) < n_cols));
        Self {
            n_rows,
            n_cols,
            indptr,
            indices,
            values,
        }
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    /// Number of stored non-zero entries
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    /// One row as parallel (column indices, values) slices.
    ///
    /// Rows beyond `n_rows` are empty rather than a panic: indices appended
    /// by [`crate::IdMap::register_user`] have no trained row by design.
    pub fn row(&self, row: usize) -> (&[u32], &[f32]) {
        if row >= self.n_rows {
            return (&[], &[]);
        }
        let start = self.indptr[row];
        let end = self.indptr[row + 1];
        (&self.indices[start..end], &self.values[start..end])
    }

    pub fn indptr(&self) -> &[usize] {
        &self.indptr
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut [f32] {
        &mut self.values
    }

    /// Counting-sort transpose: returns the item-major view of this matrix.
    pub fn transposed(&self) -> UserItemMatrix {
        let nnz = self.nnz();
        let mut col_counts = vec![0usize; self.n_cols];
        for &c in &self.indices {
            col_counts[c as usize] += 1;
        }

        let mut indptr = vec![0usize; self.n_cols + 1];
        for c in 0..self.n_cols {
            indptr[c + 1] = indptr[c] + col_counts[c];
        }

        let mut indices = vec![0u32; nnz];
        let mut values = vec![0.0f32; nnz];
        let mut pos = indptr[..self.n_cols].to_vec();
        for row in 0..self.n_rows {
            let start = self.indptr[row];
            let end = self.indptr[row + 1];
            for idx in start..end {
                let col = self.indices[idx] as usize;
                let p = pos[col];
                indices[p] = row as u32;
                values[p] = self.values[idx];
                pos[col] += 1;
            }
        }

        UserItemMatrix {
            n_rows: self.n_cols,
            n_cols: self.n_rows,
            indptr,
            indices,
            values,
        }
    }

    /// Per-column count of non-zero entries (document frequency when rows
    /// are read as documents)
    pub fn column_nnz(&self) -> Vec<u32> {
        let mut counts = vec![0u32; self.n_cols];
        for &c in &self.indices {
            counts[c as usize] += 1;
        }
        counts
    }

    /// Per-row sum of stored values
    pub fn row_sums(&self) -> Vec<f32> {
        (0..self.n_rows)
            .into_par_iter()
            .map(|row| {
                let (_, values) = self.row(row);
                values.iter().sum()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Transaction;

    fn create_test_log() -> TransactionLog {
        // user 1: item 10 twice, item 20 once
        // user 2: item 20 once
        TransactionLog::from_transactions(vec![
            Transaction {
                user_id: 1,
                item_id: 10,
                quantity: 1,
            },
            Transaction {
                user_id: 1,
                item_id: 10,
                quantity: 3,
            },
            Transaction {
                user_id: 1,
                item_id: 20,
                quantity: 1,
            },
            Transaction {
                user_id: 2,
                item_id: 20,
                quantity: 2,
            },
        ])
    }

    #[test]
    fn test_pivot_counts_records() {
        let log = create_test_log();
        let ids = IdMap::build(&log.users(), &log.items());
        let matrix = UserItemMatrix::from_log(&log, &ids);

        assert_eq!(matrix.n_rows(), 2);
        assert_eq!(matrix.n_cols(), 2);
        assert_eq!(matrix.nnz(), 3);

        let (cols, vals) = matrix.row(0);
        assert_eq!(cols, &[0, 1]);
        assert_eq!(vals, &[2.0, 1.0]);

        let (cols, vals) = matrix.row(1);
        assert_eq!(cols, &[1]);
        assert_eq!(vals, &[1.0]);
    }

    #[test]
    fn test_row_out_of_range_is_empty() {
        let log = create_test_log();
        let ids = IdMap::build(&log.users(), &log.items());
        let matrix = UserItemMatrix::from_log(&log, &ids);

        let (cols, vals) = matrix.row(99);
        assert!(cols.is_empty());
        assert!(vals.is_empty());
    }

    #[test]
    fn test_transpose_round_trip() {
        let log = create_test_log();
        let ids = IdMap::build(&log.users(), &log.items());
        let matrix = UserItemMatrix::from_log(&log, &ids);

        let t = matrix.transposed();
        assert_eq!(t.n_rows(), 2);
        assert_eq!(t.n_cols(), 2);

        // item 10 (row 0) was bought only by user 0
        let (cols, vals) = t.row(0);
        assert_eq!(cols, &[0]);
        assert_eq!(vals, &[2.0]);

        // item 20 (row 1) by both users
        let (cols, vals) = t.row(1);
        assert_eq!(cols, &[0, 1]);
        assert_eq!(vals, &[1.0, 1.0]);

        let back = t.transposed();
        assert_eq!(back.indptr(), matrix.indptr());
        assert_eq!(back.indices(), matrix.indices());
        assert_eq!(back.values(), matrix.values());
    }

    #[test]
    fn test_column_nnz_and_row_sums() {
        let log = create_test_log();
        let ids = IdMap::build(&log.users(), &log.items());
        let matrix = UserItemMatrix::from_log(&log, &ids);

        assert_eq!(matrix.column_nnz(), vec![1, 2]);
        assert_eq!(matrix.row_sums(), vec![3.0, 1.0]);
    }
}
