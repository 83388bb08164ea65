//! # Models Crate
//!
//! This crate implements the recommendation models that score users
//! against the user-item matrix.
//!
//! ## Components
//!
//! ### ALS (`als`)
//! Implicit-feedback alternating least squares: confidence-weighted
//! factorization trained with per-row Cholesky solves, parallelized with
//! rayon. Also provides similar-item and similar-user queries in factor
//! space.
//!
//! ### Item-item KNN (`item_knn`)
//! Item-item similarity with top-K pruning and pluggable weighting:
//! plain co-occurrence, cosine, TF-IDF or BM25. The `K = 1` plain variant
//! is the "own items" recommender.
//!
//! ### Weighting (`weighting`)
//! Standalone BM25/TF-IDF matrix transforms, also used to reweight the
//! whole interaction matrix before fitting.
//!
//! All variants implement [`ItemScorer`], so the dispatch layer treats
//! them uniformly.

// Public modules
pub mod als;
pub mod item_knn;
pub mod traits;
pub mod types;
pub mod weighting;

// Re-export commonly used types
pub use als::{AlsConfig, AlsModel};
pub use item_knn::{ItemKnnConfig, ItemKnnModel, Weighting};
pub use traits::ItemScorer;
pub use types::Scored;
