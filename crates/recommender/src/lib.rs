//! # Recommender Crate
//!
//! The dispatch layer over the fitted models. It owns the user-item
//! matrix, the id-remapping tables, the popularity rankings and the five
//! model variants, and normalizes every model's output into fixed-length
//! recommendation lists.
//!
//! ## Example Usage
//!
//! ```ignore
//! use interactions::TransactionLog;
//! use recommender::{Recommender, RecommenderConfig};
//!
//! let log = TransactionLog::from_transactions(records);
//! let mut engine = Recommender::fit(&log, RecommenderConfig::default())?;
//!
//! let recs = engine.get_als_recommendations(user_id, 5)?;
//! let scores = engine.get_bm25_scores(user_id, 5)?;
//! let similar = engine.get_similar_items_recommendation(user_id, 5)?;
//! ```
//!
//! Every entry point either returns exactly the requested number of items
//! or fails with [`RecommendError::NotEnoughRecommendations`].

// Public modules
pub mod engine;
pub mod error;

// Re-export commonly used types
pub use engine::{Recommender, RecommenderConfig, ScoredItem};
pub use error::{RecommendError, Result};
