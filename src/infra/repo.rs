//! In-memory card repository.
//!
//! Stands in for the document database behind the API. Lock-free map
//! keyed by card id; user-scoped listings scan and sort, which is fine
//! at the cardinality this serves and keeps the repository free of
//! secondary-index bookkeeping.

use dashmap::DashMap;

use crate::domain::cards::Card;

use super::health::{ConnectionState, ConnectionStateProvider};

#[derive(Default)]
pub struct CardRepo {
    cards: DashMap<String, Card>,
}

impl CardRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, card: Card) {
        self.cards.insert(card.id.clone(), card);
    }

    pub fn get(&self, id: &str) -> Option<Card> {
        self.cards.get(id).map(|entry| entry.clone())
    }

    pub fn remove(&self, id: &str) -> Option<Card> {
        self.cards.remove(id).map(|(_, card)| card)
    }

    pub fn list(&self) -> Vec<Card> {
        let mut cards: Vec<Card> = self.cards.iter().map(|entry| entry.clone()).collect();
        cards.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        cards
    }

    pub fn list_for_user(&self, user_id: &str) -> Vec<Card> {
        let mut cards: Vec<Card> = self
            .cards
            .iter()
            .filter(|entry| entry.user_id == user_id)
            .map(|entry| entry.clone())
            .collect();
        cards.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

impl ConnectionStateProvider for CardRepo {
    // The in-memory store has no connection lifecycle to lose.
    fn current_state(&self) -> ConnectionState {
        ConnectionState::Connected
    }
}
