//! Linear scoring of aggregated candidates
//!
//! The rank of a candidate is the weighted sum of its feature values.
//! The default table is the production weight vector; tests and offline
//! experiments inject their own via the constructor instead of mutating
//! a global.

use std::collections::HashMap;

/// Weight vector applied to the feature map
#[derive(Debug, Clone)]
pub struct RankingWeights {
    weights: HashMap<&'static str, f32>,
}

impl Default for RankingWeights {
    fn default() -> Self {
        let weights: HashMap<&'static str, f32> = HashMap::from([
            ("account_liked_author_status_count", 10.0),
            ("account_liked_status_count", 0.0),
            ("account_liked_tag_status_count", 10.0),
            ("account_rebloged_author_status_count", 30.0),
            ("account_rebloged_status_count", 0.0),
            ("account_rebloged_tag_status_count", 20.0),
            ("author_follower_count", 0.004),
            ("author_like_count", 0.4),
            ("author_reblog_count", 0.8),
            ("author_reply_count", 0.6),
            ("candidate_status_like_count", 1.0),
            ("candidate_status_reblog_count", 2.0),
            ("candidate_status_reply_count", 1.5),
            ("average_like_embedding_similarity", 2.0),
            ("average_reblog_embedding_similarity", 3.0),
            ("account_liked_status_with_similar_embedding", 8.0),
            ("account_rebloged_status_with_similar_embedding", 15.0),
        ]);
        Self { weights }
    }
}

impl RankingWeights {
    /// Build a custom weight table (constructor injection for tests)
    pub fn new(weights: HashMap<&'static str, f32>) -> Self {
        Self { weights }
    }

    /// Weight for a feature; unknown features weigh nothing
    pub fn weight(&self, feature: &str) -> f32 {
        self.weights.get(feature).copied().unwrap_or(0.0)
    }

    /// Weighted sum over a feature map. Arithmetic is f32 end to end and
    /// the result may be negative via the similarity adjustments.
    pub fn score(&self, aggregates: &HashMap<String, i64>) -> f32 {
        aggregates
            .iter()
            .map(|(name, value)| self.weight(name) * *value as f32)
            .sum()
    }

    /// The feature names this table covers
    pub fn feature_names(&self) -> Vec<&'static str> {
        self.weights.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::REGISTRY;
    use std::collections::HashSet;

    #[test]
    fn test_default_table_covers_exactly_the_registry() {
        let weighted: HashSet<&str> = RankingWeights::default().feature_names().into_iter().collect();
        let extracted: HashSet<&str> = REGISTRY.iter().map(|(name, _)| *name).collect();
        assert_eq!(weighted, extracted);
    }

    #[test]
    fn test_score_single_feature() {
        // 42 followers at 0.004 a piece
        let weights = RankingWeights::default();
        let mut aggregates = HashMap::new();
        for (name, _) in REGISTRY {
            aggregates.insert(name.to_string(), 0);
        }
        aggregates.insert("author_follower_count".to_string(), 42);
        let score = weights.score(&aggregates);
        assert!((score - 0.168).abs() < 1e-5);
    }

    #[test]
    fn test_score_can_be_negative() {
        let weights = RankingWeights::default();
        let mut aggregates = HashMap::new();
        aggregates.insert("average_like_embedding_similarity".to_string(), -3000);
        assert!(weights.score(&aggregates) < 0.0);
    }

    #[test]
    fn test_unknown_feature_weighs_nothing() {
        let weights = RankingWeights::default();
        let mut aggregates = HashMap::new();
        aggregates.insert("brand_new_feature".to_string(), 1_000_000);
        assert_eq!(weights.score(&aggregates), 0.0);
    }

    #[test]
    fn test_injected_weights_override_defaults() {
        let weights = RankingWeights::new(HashMap::from([("candidate_status_like_count", 5.0)]));
        let mut aggregates = HashMap::new();
        aggregates.insert("candidate_status_like_count".to_string(), 3);
        aggregates.insert("author_follower_count".to_string(), 1000);
        assert_eq!(weights.score(&aggregates), 15.0);
    }
}
