//! Implicit-feedback alternating least squares.
//!
//! ## Algorithm
//! 1. Interaction values become confidences `c = 1 + alpha * value`
//! 2. User and item factor matrices are initialized from a seeded xorshift
//!    generator, so training is deterministic
//! 3. Each iteration alternates sides: every user row solves
//!    `(YtY + Yt(Cu - I)Y + lambda*I) x_u = Yt Cu p(u)` against the fixed
//!    item factors, then the item side solves against the fixed user
//!    factors over the transposed matrix
//! 4. The k x k normal equations are dense and solved by Cholesky per row,
//!    with rows distributed over the rayon pool
//!
//! Recommendation is a dot product of the user factor against every item
//! factor; similar items/users are cosine neighbours in factor space.

use crate::traits::ItemScorer;
use crate::types::{Scored, top_n};
use interactions::UserItemMatrix;
use rayon::prelude::*;
use tracing::{debug, instrument};

/// ALS hyperparameters.
#[derive(Debug, Clone, Copy)]
pub struct AlsConfig {
    /// Dimensionality of the factor space
    pub factors: usize,
    /// L2 regularization added to the normal-equation diagonal
    pub regularization: f32,
    /// Number of alternating iterations
    pub iterations: usize,
    /// Confidence scale: `c = 1 + alpha * value`
    pub alpha: f32,
    /// Seed for the factor initialization
    pub seed: u64,
}

impl Default for AlsConfig {
    fn default() -> Self {
        Self {
            factors: 512,
            regularization: 0.04,
            iterations: 20,
            alpha: 1.0,
            seed: 42,
        }
    }
}

/// A fitted ALS factorization.
pub struct AlsModel {
    factors: usize,
    regularization: f32,
    alpha: f32,
    n_users: usize,
    n_items: usize,
    user_factors: Vec<f32>,
    item_factors: Vec<f32>,
    /// Cached YtY over the item factors, reused by [`AlsModel::rank_items`]
    /// to recompute user factors without touching the full item set again
    item_gram: Vec<f32>,
}

#[inline]
fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[inline]
fn axpy(alpha: f32, x: &[f32], y: &mut [f32]) {
    for (yi, &xi) in y.iter_mut().zip(x) {
        *yi += alpha * xi;
    }
}

/// Deterministic xorshift initialization, scaled by 1/sqrt(k)
fn random_factors(n: usize, k: usize, seed: u64) -> Vec<f32> {
    let mut out = vec![0.0f32; n * k];
    let mut s = seed | 1;
    let scale = 1.0 / (k as f32).sqrt();
    for v in out.iter_mut() {
        s ^= s << 13;
        s ^= s >> 7;
        s ^= s << 17;
        *v = ((s & 0xFFFF) as f32) / (0xFFFF as f32) * scale;
    }
    out
}

/// Gram matrix FtF of a row-major n x k factor block
fn gramian(factors: &[f32], k: usize) -> Vec<f32> {
    factors
        .par_chunks(k)
        .fold(
            || vec![0.0f32; k * k],
            |mut acc, row| {
                for a in 0..k {
                    let ra = row[a];
                    if ra != 0.0 {
                        axpy(ra, row, &mut acc[a * k..(a + 1) * k]);
                    }
                }
                acc
            },
        )
        .reduce(
            || vec![0.0f32; k * k],
            |mut acc, local| {
                for (x, y) in acc.iter_mut().zip(local) {
                    *x += y;
                }
                acc
            },
        )
}

/// In-place LLt factorization and solve; `a` is a row-major k x k system,
/// `b` the right-hand side (overwritten with the solution).
///
/// Returns false when the system is not positive definite; callers leave
/// the factor row at zero in that case.
fn cholesky_solve_inplace(a: &mut [f32], b: &mut [f32], k: usize) -> bool {
    for j in 0..k {
        let mut d = a[j * k + j];
        for p in 0..j {
            d -= a[j * k + p] * a[j * k + p];
        }
        if d <= 1e-10 {
            return false;
        }
        let d = d.sqrt();
        a[j * k + j] = d;
        for i in (j + 1)..k {
            let mut s = a[i * k + j];
            for p in 0..j {
                s -= a[i * k + p] * a[j * k + p];
            }
            a[i * k + j] = s / d;
        }
    }
    for i in 0..k {
        let mut s = b[i];
        for p in 0..i {
            s -= a[i * k + p] * b[p];
        }
        b[i] = s / a[i * k + i];
    }
    for i in (0..k).rev() {
        let mut s = b[i];
        for p in (i + 1)..k {
            s -= a[p * k + i] * b[p];
        }
        b[i] = s / a[i * k + i];
    }
    true
}

/// Solve one row's normal equations against the fixed other-side factors.
fn solve_single(
    cols: &[u32],
    vals: &[f32],
    other: &[f32],
    gram: &[f32],
    k: usize,
    lambda: f32,
    alpha: f32,
) -> Vec<f32> {
    let mut x = vec![0.0f32; k];
    if cols.is_empty() {
        return x;
    }

    let mut a = gram.to_vec();
    let mut b = vec![0.0f32; k];
    for j in 0..k {
        a[j * k + j] += lambda;
    }

    for (&col, &val) in cols.iter().zip(vals) {
        let i = col as usize;
        let c = 1.0 + alpha * val;
        let yi = &other[i * k..(i + 1) * k];
        axpy(c, yi, &mut b);

        let w = c - 1.0;
        for r in 0..k {
            let wr = w * yi[r];
            axpy(wr, yi, &mut a[r * k..(r + 1) * k]);
        }
    }

    if cholesky_solve_inplace(&mut a, &mut b, k) {
        x.copy_from_slice(&b);
    }
    x
}

/// One alternating half-step: re-solve every row of `matrix` against the
/// fixed `other` factors.
fn solve_side(
    matrix: &UserItemMatrix,
    other: &[f32],
    gram: &[f32],
    k: usize,
    lambda: f32,
    alpha: f32,
) -> Vec<f32> {
    let mut out = vec![0.0f32; matrix.n_rows() * k];
    out.par_chunks_mut(k).enumerate().for_each(|(row, xr)| {
        let (cols, vals) = matrix.row(row);
        if cols.is_empty() {
            return;
        }
        let x = solve_single(cols, vals, other, gram, k, lambda, alpha);
        xr.copy_from_slice(&x);
    });
    out
}

impl AlsModel {
    /// Fit the factorization on a user-item matrix.
    #[instrument(skip(matrix), fields(n_users = matrix.n_rows(), n_items = matrix.n_cols()))]
    pub fn fit(matrix: &UserItemMatrix, config: AlsConfig) -> Self {
        let k = config.factors.max(1);
        let lambda = config.regularization.max(1e-6);
        let n_users = matrix.n_rows();
        let n_items = matrix.n_cols();
        let transposed = matrix.transposed();

        let mut user_factors = random_factors(n_users, k, config.seed);
        let mut item_factors = random_factors(n_items, k, config.seed ^ 0x9e37_79b9_7f4a_7c15);

        for iteration in 0..config.iterations {
            let item_gram = gramian(&item_factors, k);
            user_factors = solve_side(matrix, &item_factors, &item_gram, k, lambda, config.alpha);

            let user_gram = gramian(&user_factors, k);
            item_factors =
                solve_side(&transposed, &user_factors, &user_gram, k, lambda, config.alpha);

            debug!(
                "ALS iteration {}/{} complete",
                iteration + 1,
                config.iterations
            );
        }

        let item_gram = gramian(&item_factors, k);

        Self {
            factors: k,
            regularization: lambda,
            alpha: config.alpha,
            n_users,
            n_items,
            user_factors,
            item_factors,
            item_gram,
        }
    }

    /// Recompute a user factor from the live matrix row instead of the
    /// trained one. Users without a row come back as the zero factor.
    fn recalculated_user_factor(&self, user_index: usize, matrix: &UserItemMatrix) -> Vec<f32> {
        let (cols, vals) = matrix.row(user_index);
        solve_single(
            cols,
            vals,
            &self.item_factors,
            &self.item_gram,
            self.factors,
            self.regularization,
            self.alpha,
        )
    }

    fn factor_row<'a>(factors: &'a [f32], index: usize, k: usize) -> &'a [f32] {
        &factors[index * k..(index + 1) * k]
    }

    /// Cosine neighbours of a row within one factor block
    fn cosine_neighbours(factors: &[f32], k: usize, count: usize, index: usize, n: usize) -> Vec<Scored> {
        if index >= count {
            return Vec::new();
        }
        let query = Self::factor_row(factors, index, k);
        let query_norm = dot(query, query).sqrt();
        if query_norm == 0.0 {
            return Vec::new();
        }

        let scored: Vec<(f32, usize)> = (0..count)
            .map(|i| {
                let row = Self::factor_row(factors, i, k);
                let norm = dot(row, row).sqrt();
                let score = if norm == 0.0 {
                    0.0
                } else {
                    dot(query, row) / (query_norm * norm)
                };
                (score, i)
            })
            .collect();
        top_n(scored, n)
    }

    /// The `n` users most similar to a user, best first (the query user is
    /// included, ranked first).
    pub fn similar_users(&self, user_index: usize, n: usize) -> Vec<Scored> {
        Self::cosine_neighbours(&self.user_factors, self.factors, self.n_users, user_index, n)
    }
}

impl ItemScorer for AlsModel {
    fn name(&self) -> &str {
        "als"
    }

    fn recommend(
        &self,
        user_index: usize,
        _matrix: &UserItemMatrix,
        n: usize,
        filter_items: &[usize],
    ) -> Vec<Scored> {
        if user_index >= self.n_users {
            return Vec::new();
        }
        let xu = Self::factor_row(&self.user_factors, user_index, self.factors);

        let scored: Vec<(f32, usize)> = (0..self.n_items)
            .filter(|i| !filter_items.contains(i))
            .map(|i| {
                let yi = Self::factor_row(&self.item_factors, i, self.factors);
                (dot(xu, yi), i)
            })
            .collect();
        top_n(scored, n)
    }

    fn rank_items(
        &self,
        user_index: usize,
        matrix: &UserItemMatrix,
        selected: &[usize],
    ) -> Vec<Scored> {
        let xu = self.recalculated_user_factor(user_index, matrix);

        let scored: Vec<(f32, usize)> = selected
            .iter()
            .filter(|&&i| i < self.n_items)
            .map(|&i| {
                let yi = Self::factor_row(&self.item_factors, i, self.factors);
                (dot(&xu, yi), i)
            })
            .collect();
        top_n(scored, selected.len())
    }

    fn similar_items(&self, item_index: usize, n: usize) -> Vec<Scored> {
        Self::cosine_neighbours(&self.item_factors, self.factors, self.n_items, item_index, n)
    }
}
