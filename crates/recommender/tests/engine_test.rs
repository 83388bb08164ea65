//! Integration tests for the recommendation engine.
//!
//! These tests exercise every public entry point against a synthetic
//! transaction log and verify the fixed-length contract end to end.

use interactions::{Transaction, TransactionLog};
use models::AlsConfig;
use recommender::{RecommendError, Recommender, RecommenderConfig};

fn tx(user_id: u64, item_id: u64) -> Transaction {
    Transaction {
        user_id,
        item_id,
        quantity: 1,
    }
}

/// Eight real items across two taste clusters, six users, some sentinel
/// records sprinkled in.
fn create_test_log() -> TransactionLog {
    let mut records = Vec::new();

    // Cluster A: users 1-3 buy items 10-13 with varying intensity
    for user in [1, 2, 3] {
        for item in [10, 11, 12, 13] {
            records.push(tx(user, item));
        }
    }
    records.push(tx(1, 10));
    records.push(tx(1, 10));
    records.push(tx(2, 11));

    // Cluster B: users 4-6 buy items 20-23
    for user in [4, 5, 6] {
        for item in [20, 21, 22, 23] {
            records.push(tx(user, item));
        }
    }
    records.push(tx(4, 20));

    // Sentinel purchases must never surface anywhere
    records.push(tx(1, 999_999));
    records.push(tx(5, 999_999));

    TransactionLog::from_transactions(records)
}

fn create_test_engine() -> Recommender {
    let config = RecommenderConfig {
        weighting: false,
        als: AlsConfig {
            factors: 4,
            iterations: 10,
            seed: 11,
            ..AlsConfig::default()
        },
        ..RecommenderConfig::default()
    };
    Recommender::fit(&create_test_log(), config).expect("fit succeeds on non-empty log")
}

#[test]
fn every_entry_point_returns_exactly_n() {
    let mut engine = create_test_engine();
    let n = 3;
    let user = 1;

    assert_eq!(engine.get_als_recommendations(user, n).unwrap().len(), n);
    assert_eq!(engine.get_bm25_recommendations(user, n).unwrap().len(), n);
    assert_eq!(engine.get_tfidf_recommendations(user, n).unwrap().len(), n);
    assert_eq!(engine.get_cosine_recommendations(user, n).unwrap().len(), n);
    assert_eq!(engine.get_own_recommendations(user, n).unwrap().len(), n);

    assert_eq!(engine.get_als_scores(user, n).unwrap().len(), n);
    assert_eq!(engine.get_bm25_scores(user, n).unwrap().len(), n);
    assert_eq!(engine.get_tfidf_scores(user, n).unwrap().len(), n);
    assert_eq!(engine.get_cosine_scores(user, n).unwrap().len(), n);
    assert_eq!(engine.get_own_scores(user, n).unwrap().len(), n);

    assert_eq!(
        engine.get_similar_items_recommendation(user, n).unwrap().len(),
        n
    );
    assert_eq!(
        engine.get_similar_users_recommendation(user, n).unwrap().len(),
        n
    );
}

#[test]
fn sentinel_item_never_surfaces() {
    let mut engine = create_test_engine();
    let n = 5;

    // user 1 bought the sentinel item, yet it must never be recommended
    for recs in [
        engine.get_als_recommendations(1, n).unwrap(),
        engine.get_bm25_recommendations(1, n).unwrap(),
        engine.get_tfidf_recommendations(1, n).unwrap(),
        engine.get_cosine_recommendations(1, n).unwrap(),
        engine.get_own_recommendations(1, n).unwrap(),
        engine.get_similar_items_recommendation(1, n).unwrap(),
        engine.get_similar_users_recommendation(1, n).unwrap(),
    ] {
        assert!(!recs.contains(&999_999), "sentinel leaked: {recs:?}");
    }

    for scores in [
        engine.get_als_scores(1, n).unwrap(),
        engine.get_own_scores(1, n).unwrap(),
    ] {
        assert!(scores.iter().all(|s| s.item != 999_999));
    }
}

#[test]
fn own_recommendations_stay_within_purchases() {
    let mut engine = create_test_engine();

    // user 2 bought items 10-13; with n below the basket size no padding
    // happens, so everything returned must come from the basket
    let recs = engine.get_own_recommendations(2, 3).unwrap();
    for item in recs {
        assert!((10..=13).contains(&item), "item {item} was never bought");
    }
}

#[test]
fn new_user_degenerates_to_popularity() {
    let mut engine = create_test_engine();
    let n = 4;

    let expected = engine.popular_items(n);
    for recs in [
        engine.get_als_recommendations(777, n).unwrap(),
        engine.get_bm25_recommendations(777, n).unwrap(),
        engine.get_own_recommendations(777, n).unwrap(),
        engine.get_similar_items_recommendation(777, n).unwrap(),
    ] {
        assert_eq!(recs, expected);
    }
}

#[test]
fn similar_items_prefers_the_users_cluster() {
    let mut engine = create_test_engine();

    // user 4 lives in cluster B; nearest-other-item hops stay in 20-23
    let recs = engine.get_similar_items_recommendation(4, 3).unwrap();
    for item in recs {
        assert!((20..=23).contains(&item), "item {item} is cross-cluster");
    }
}

#[test]
fn similar_users_unknown_user_fails() {
    let mut engine = create_test_engine();

    assert!(matches!(
        engine.get_similar_users_recommendation(12345, 3),
        Err(RecommendError::UnknownUser { user: 12345 })
    ));
}

#[test]
fn oversized_request_exhausts_popularity_pool() {
    let mut engine = create_test_engine();

    // 8 real items in the catalogue; even model results plus the whole
    // popularity list cannot reach 50
    let err = engine.get_als_recommendations(1, 50).unwrap_err();
    match err {
        RecommendError::NotEnoughRecommendations { got, want } => {
            assert_eq!(want, 50);
            assert!(got < want);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn scores_are_ordered_descending() {
    let mut engine = create_test_engine();

    let scores = engine.get_own_scores(1, 3).unwrap();
    for pair in scores.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
}
