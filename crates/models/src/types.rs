//! Shared scoring types and top-N selection.

/// An internal item (or user) index with its model score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scored {
    pub index: usize,
    pub score: f32,
}

/// Keep the `n` highest-scoring entries, returned in descending score order.
///
/// Uses a partial sort so only the selected prefix pays the ordering cost.
pub(crate) fn top_n(mut scored: Vec<(f32, usize)>, n: usize) -> Vec<Scored> {
    let take = n.min(scored.len());
    if take == 0 {
        return Vec::new();
    }
    scored.select_nth_unstable_by(take - 1, |a, b| {
        b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal)
    });
    scored.truncate(take);
    scored.sort_unstable_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    scored
        .into_iter()
        .map(|(score, index)| Scored { index, score })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_n_orders_descending() {
        let scored = vec![(0.1, 0), (0.9, 1), (0.5, 2), (0.7, 3)];
        let top = top_n(scored, 2);

        assert_eq!(top.len(), 2);
        assert_eq!(top[0].index, 1);
        assert_eq!(top[1].index, 3);
    }

    #[test]
    fn test_top_n_short_input() {
        let top = top_n(vec![(1.0, 5)], 10);
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].index, 5);
    }

    #[test]
    fn test_top_n_empty() {
        assert!(top_n(Vec::new(), 3).is_empty());
        assert!(top_n(vec![(1.0, 0)], 0).is_empty());
    }
}
