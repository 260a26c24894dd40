//! Invalidation plan resolution.
//!
//! Maps the facts extracted from one successful mutation (ids, update
//! classification and skip flags) to the set of cache keys that are now
//! stale.

use std::collections::HashSet;
use std::fmt;

use crate::domain::cards::UpdateKind;

use super::keys::CacheKey;
use super::resolver::MutationRequest;

/// The set of cache entries a mutation made stale.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct InvalidationPlan {
    pub stale: HashSet<CacheKey>,
}

impl InvalidationPlan {
    /// Resolve a plan from a request snapshot.
    ///
    /// A card id always stales the card document; a user id always stales
    /// the user document and overview (any successful mutation by a user
    /// can move their dashboard). The classification decides which derived
    /// partitions follow, and skip flags opt out of single categories.
    /// Unknown classifications are conservative: with no idea what changed,
    /// everything reachable from the extracted ids is dropped.
    pub fn resolve(request: &MutationRequest) -> Self {
        let mut plan = Self::default();

        let card = request.card_id();
        let user = request.user_id();
        let skip = request.skip_flags();
        let kind = request.update_kind();

        if let Some(card) = &card {
            plan.stale.insert(CacheKey::CardById(card.clone()));
        }
        if let Some(user) = &user {
            plan.stale.insert(CacheKey::UserById(user.clone()));
            plan.stale.insert(CacheKey::Overview(user.clone()));
        }

        let (reviews_stale, quizzes_stale) = match kind {
            UpdateKind::Flashcards => (true, false),
            UpdateKind::Quiz => (false, true),
            UpdateKind::Overview => (false, false),
            UpdateKind::Unknown => (true, true),
        };

        if reviews_stale {
            if let Some(user) = &user
                && !skip.regular_review
            {
                plan.stale.insert(CacheKey::ReviewQueue(user.clone()));
            }
            if let Some(card) = &card
                && !skip.focus_review
            {
                plan.stale.insert(CacheKey::FocusReview(card.clone()));
            }
        }

        if quizzes_stale {
            if let Some(user) = &user {
                plan.stale.insert(CacheKey::QuizSet(user.clone()));
            }
            if let Some(card) = &card
                && !skip.focus_quiz
            {
                plan.stale.insert(CacheKey::FocusQuiz(card.clone()));
            }
        }

        // Sub-resource mutations stale their focus partitions directly.
        if let Some(review) = request.review_id()
            && !skip.focus_review
        {
            plan.stale.insert(CacheKey::FocusReview(review));
        }
        if let Some(quiz) = request.quiz_id()
            && !skip.focus_quiz
        {
            plan.stale.insert(CacheKey::FocusQuiz(quiz));
        }

        plan
    }

    pub fn is_empty(&self) -> bool {
        self.stale.is_empty()
    }
}

impl fmt::Display for InvalidationPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut partitions: Vec<&'static str> =
            self.stale.iter().map(|key| key.partition()).collect();
        partitions.sort_unstable();
        partitions.dedup();
        write!(
            f,
            "InvalidationPlan {{ stale: {}, partitions: {} }}",
            self.stale.len(),
            partitions.join(",")
        )
    }
}
