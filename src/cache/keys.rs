//! Cache key definitions.
//!
//! One variant per cached aggregate partition. Card-scoped partitions carry
//! a card id, user-scoped partitions a user id.

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// A card document by id.
    CardById(String),
    /// A user profile document by id.
    UserById(String),
    /// The regular review queue for a user.
    ReviewQueue(String),
    /// The focus review set for a card.
    FocusReview(String),
    /// The focus quiz set for a card.
    FocusQuiz(String),
    /// The assembled quiz set for a user.
    QuizSet(String),
    /// The progress overview for a user.
    Overview(String),
}

impl CacheKey {
    /// Stable partition label, used for metrics and log fields.
    pub fn partition(&self) -> &'static str {
        match self {
            Self::CardById(_) => "card_by_id",
            Self::UserById(_) => "user_by_id",
            Self::ReviewQueue(_) => "review_queue",
            Self::FocusReview(_) => "focus_review",
            Self::FocusQuiz(_) => "focus_quiz",
            Self::QuizSet(_) => "quiz_set",
            Self::Overview(_) => "overview",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_equality_by_variant_and_id() {
        assert_eq!(
            CacheKey::CardById("a".to_string()),
            CacheKey::CardById("a".to_string())
        );
        assert_ne!(
            CacheKey::CardById("a".to_string()),
            CacheKey::UserById("a".to_string())
        );
        assert_ne!(
            CacheKey::Overview("u1".to_string()),
            CacheKey::Overview("u2".to_string())
        );
    }

    #[test]
    fn partition_labels_are_distinct() {
        let keys = [
            CacheKey::CardById(String::new()),
            CacheKey::UserById(String::new()),
            CacheKey::ReviewQueue(String::new()),
            CacheKey::FocusReview(String::new()),
            CacheKey::FocusQuiz(String::new()),
            CacheKey::QuizSet(String::new()),
            CacheKey::Overview(String::new()),
        ];
        let labels: std::collections::HashSet<_> =
            keys.iter().map(|key| key.partition()).collect();
        assert_eq!(labels.len(), keys.len());
    }
}
