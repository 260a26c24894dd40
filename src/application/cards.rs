//! Card use-cases.
//!
//! `CardService` mediates between the HTTP handlers and the repository.
//! Read paths for aggregates (single card, overview, review queue, quiz
//! set) go through the aggregate cache; write paths only touch the
//! repository and rely on the invalidation middleware to drop stale
//! aggregates afterwards.

use std::sync::Arc;

use serde_json::{Value, json};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tracing::debug;

use crate::{
    cache::{AggregateStore, CacheKey},
    domain::{
        cards::{Card, Flashcard, QuizItem, UpdatePayload},
        error::DomainError,
    },
    infra::repo::CardRepo,
};

use super::error::AppError;

/// Upper bound on the number of cards in a review queue response.
const REVIEW_QUEUE_LIMIT: usize = 20;

/// Input for creating a card, already validated for ownership upstream.
#[derive(Debug, Clone)]
pub struct NewCard {
    pub user_id: String,
    pub title: String,
    pub description: String,
    pub category: Option<String>,
    pub flashcards: Vec<Flashcard>,
    pub quiz: Vec<QuizItem>,
}

#[derive(Clone)]
pub struct CardService {
    repo: Arc<CardRepo>,
    cache: Arc<AggregateStore>,
}

impl CardService {
    pub fn new(repo: Arc<CardRepo>, cache: Arc<AggregateStore>) -> Self {
        Self { repo, cache }
    }

    pub fn list(&self) -> Vec<Card> {
        self.repo.list()
    }

    /// Fetch a single card, read-through cached under its id.
    pub fn get(&self, id: &str) -> Result<Card, AppError> {
        let key = CacheKey::CardById(id.to_string());
        if let Some(cached) = self.cache.get(&key)
            && let Ok(card) = serde_json::from_value::<Card>(cached)
        {
            return Ok(card);
        }

        let card = self.find(id)?;
        self.cache_card(&card);
        Ok(card)
    }

    pub fn create(&self, new: NewCard) -> Result<Card, AppError> {
        if new.title.trim().is_empty() {
            return Err(AppError::validation("title must not be empty"));
        }

        let mut card = Card::new(new.user_id, new.title);
        card.description = new.description;
        card.category = new.category;
        card.flashcards = new.flashcards;
        card.quiz = new.quiz;

        self.repo.insert(card.clone());
        debug!(card_id = %card.id, user_id = %card.user_id, "card created");
        Ok(card)
    }

    pub fn update(&self, id: &str, payload: &UpdatePayload) -> Result<Card, AppError> {
        let mut card = self.find(id)?;
        card.apply_update(payload)?;
        self.repo.insert(card.clone());
        debug!(card_id = %card.id, kind = payload.kind().as_str(), "card updated");
        Ok(card)
    }

    pub fn delete(&self, id: &str) -> Result<(), AppError> {
        self.repo
            .remove(id)
            .ok_or_else(|| DomainError::not_found("card"))?;
        debug!(card_id = %id, "card deleted");
        Ok(())
    }

    /// Record a completed review pass over the card's flashcards.
    pub fn record_review(&self, card_id: &str) -> Result<Card, AppError> {
        let mut card = self.find(card_id)?;
        let now = OffsetDateTime::now_utc();
        card.review_count += 1;
        card.last_reviewed_at = Some(now);
        card.updated_at = now;
        self.repo.insert(card.clone());
        Ok(card)
    }

    /// Record a completed quiz attempt against the card.
    pub fn record_quiz(&self, card_id: &str) -> Result<Card, AppError> {
        let mut card = self.find(card_id)?;
        let now = OffsetDateTime::now_utc();
        card.quiz_count += 1;
        card.last_reviewed_at = Some(now);
        card.updated_at = now;
        self.repo.insert(card.clone());
        Ok(card)
    }

    /// Progress overview for a user, read-through cached.
    pub fn overview(&self, user_id: &str) -> Value {
        let key = CacheKey::Overview(user_id.to_string());
        if let Some(cached) = self.cache.get(&key) {
            return cached;
        }

        let cards = self.repo.list_for_user(user_id);
        let total_flashcards: usize = cards.iter().map(|card| card.flashcards.len()).sum();
        let total_reviews: u64 = cards.iter().map(|card| card.review_count).sum();
        let mut categories: Vec<&str> = cards
            .iter()
            .filter_map(|card| card.category.as_deref())
            .collect();
        categories.sort_unstable();
        categories.dedup();
        let last_studied = cards
            .iter()
            .filter_map(|card| card.last_reviewed_at)
            .max()
            .and_then(|at| at.format(&Rfc3339).ok());

        let overview = json!({
            "userId": user_id,
            "totalCards": cards.len(),
            "totalFlashcards": total_flashcards,
            "totalReviews": total_reviews,
            "categories": categories,
            "lastStudied": last_studied,
        });
        self.cache.put(key, overview.clone());
        overview
    }

    /// Cards most in need of review, read-through cached. Never-reviewed
    /// cards sort first, then the longest-unreviewed.
    pub fn review_queue(&self, user_id: &str) -> Value {
        let key = CacheKey::ReviewQueue(user_id.to_string());
        if let Some(cached) = self.cache.get(&key) {
            return cached;
        }

        let mut cards = self.repo.list_for_user(user_id);
        cards.sort_by_key(|card| card.last_reviewed_at);
        let queue: Vec<Value> = cards
            .iter()
            .take(REVIEW_QUEUE_LIMIT)
            .map(|card| {
                json!({
                    "cardId": card.id,
                    "title": card.title,
                    "flashcards": card.flashcards.len(),
                    "lastReviewedAt": card
                        .last_reviewed_at
                        .and_then(|at| at.format(&Rfc3339).ok()),
                })
            })
            .collect();

        let queue = Value::Array(queue);
        self.cache.put(key, queue.clone());
        queue
    }

    /// Focus review set for one card: its flashcards, starred faces first,
    /// read-through cached.
    pub fn focus_review(&self, card_id: &str) -> Result<Value, AppError> {
        let key = CacheKey::FocusReview(card_id.to_string());
        if let Some(cached) = self.cache.get(&key) {
            return Ok(cached);
        }

        let card = self.find(card_id)?;
        let mut flashcards = card.flashcards;
        flashcards.sort_by_key(|face| !face.starred);
        let set = json!({
            "cardId": card.id,
            "flashcards": flashcards,
        });
        self.cache.put(key, set.clone());
        Ok(set)
    }

    /// Focus quiz for one card, read-through cached.
    pub fn focus_quiz(&self, card_id: &str) -> Result<Value, AppError> {
        let key = CacheKey::FocusQuiz(card_id.to_string());
        if let Some(cached) = self.cache.get(&key) {
            return Ok(cached);
        }

        let card = self.find(card_id)?;
        let quiz = json!({
            "cardId": card.id,
            "quiz": card.quiz,
        });
        self.cache.put(key, quiz.clone());
        Ok(quiz)
    }

    /// Quiz set assembled from every card of the user that has quiz
    /// items, read-through cached.
    pub fn quiz_set(&self, user_id: &str) -> Value {
        let key = CacheKey::QuizSet(user_id.to_string());
        if let Some(cached) = self.cache.get(&key) {
            return cached;
        }

        let set: Vec<Value> = self
            .repo
            .list_for_user(user_id)
            .iter()
            .filter(|card| !card.quiz.is_empty())
            .map(|card| {
                json!({
                    "cardId": card.id,
                    "title": card.title,
                    "questions": card.quiz.len(),
                })
            })
            .collect();

        let set = Value::Array(set);
        self.cache.put(key, set.clone());
        set
    }

    fn find(&self, id: &str) -> Result<Card, AppError> {
        self.repo
            .get(id)
            .ok_or_else(|| DomainError::not_found("card").into())
    }

    fn cache_card(&self, card: &Card) {
        if let Ok(value) = serde_json::to_value(card) {
            self.cache
                .put(CacheKey::CardById(card.id.clone()), value);
        }
    }
}
