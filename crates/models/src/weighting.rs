//! BM25 and TF-IDF matrix weighting.
//!
//! Both transforms read the matrix rows as documents and the columns as
//! terms. For the interaction matrices here the item-major orientation is
//! the usual input: items are the documents, users the terms, and the
//! document frequency of a user is the number of distinct items they
//! bought.

use interactions::UserItemMatrix;

/// TF-IDF reweighting: `sqrt(tf) * idf` with `idf = ln(N / (1 + df))`.
pub fn tfidf_weight(matrix: &UserItemMatrix) -> UserItemMatrix {
    let n_docs = matrix.n_rows() as f32;
    let idf: Vec<f32> = matrix
        .column_nnz()
        .iter()
        .map(|&df| n_docs.ln() - (1.0 + df as f32).ln())
        .collect();

    let mut weighted = matrix.clone();
    reweight(&mut weighted, |_, col, value| value.sqrt() * idf[col]);
    weighted
}

/// BM25 reweighting:
/// `idf * tf * (k1 + 1) / (k1 * ((1 - b) + b * |d| / avgdl) + tf)`.
pub fn bm25_weight(matrix: &UserItemMatrix, k1: f32, b: f32) -> UserItemMatrix {
    let n_docs = matrix.n_rows() as f32;
    let idf: Vec<f32> = matrix
        .column_nnz()
        .iter()
        .map(|&df| n_docs.ln() - (1.0 + df as f32).ln())
        .collect();

    let row_sums = matrix.row_sums();
    let total: f32 = row_sums.iter().sum();
    let average_length = if matrix.n_rows() > 0 {
        total / matrix.n_rows() as f32
    } else {
        0.0
    };

    let length_norm: Vec<f32> = row_sums
        .iter()
        .map(|&len| {
            if average_length > 0.0 {
                (1.0 - b) + b * len / average_length
            } else {
                1.0
            }
        })
        .collect();

    let mut weighted = matrix.clone();
    reweight(&mut weighted, |row, col, value| {
        idf[col] * value * (k1 + 1.0) / (k1 * length_norm[row] + value)
    });
    weighted
}

fn reweight(matrix: &mut UserItemMatrix, f: impl Fn(usize, usize, f32) -> f32) {
    let indptr = matrix.indptr().to_vec();
    let indices = matrix.indices().to_vec();
    let values = matrix.values_mut();
    for row in 0..indptr.len() - 1 {
        for idx in indptr[row]..indptr[row + 1] {
            values[idx] = f(row, indices[idx] as usize, values[idx]);
        }
    }
}
