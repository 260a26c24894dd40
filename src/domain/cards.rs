//! Card domain model.
//!
//! A `Card` is a study set owned by a user: flashcard faces for review,
//! quiz items for self-testing, and overview metadata (title, description,
//! category) shown on the progress dashboard.
//!
//! Updates arrive as free-form JSON from clients. `UpdatePayload` converts
//! that untyped shape into a tagged variant exactly once, at the boundary;
//! everything downstream matches on the variant instead of re-inspecting
//! keys.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;
use uuid::Uuid;

use super::error::DomainError;

/// Top-level body fields that mark an update as touching flashcard content.
const FLASHCARD_FIELDS: &[&str] = &["flashcards", "front", "back", "starred"];
/// Fields that mark an update as touching quiz content.
const QUIZ_FIELDS: &[&str] = &["quiz", "quizAnswers", "score"];
/// Fields that mark an update as touching overview metadata.
const OVERVIEW_FIELDS: &[&str] = &["title", "description", "category", "tags"];

/// One front/back face in a card's flashcard list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flashcard {
    pub front: String,
    pub back: String,
    #[serde(default)]
    pub starred: bool,
}

/// One multiple-choice question in a card's quiz list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizItem {
    pub prompt: String,
    pub choices: Vec<String>,
    pub answer: usize,
}

/// A study set owned by a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: String,
    pub user_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub flashcards: Vec<Flashcard>,
    #[serde(default)]
    pub quiz: Vec<QuizItem>,
    #[serde(default)]
    pub review_count: u64,
    #[serde(default)]
    pub quiz_count: u64,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub last_reviewed_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Card {
    /// Create a fresh card for a user with a generated id.
    pub fn new(user_id: impl Into<String>, title: impl Into<String>) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            title: title.into(),
            description: String::new(),
            category: None,
            flashcards: Vec::new(),
            quiz: Vec::new(),
            review_count: 0,
            quiz_count: 0,
            last_reviewed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a classified update payload to this card.
    ///
    /// All recognized fields in the payload are applied regardless of the
    /// payload's classification; the classification only drives cache
    /// invalidation. Unrecognized fields are ignored, matching document-store
    /// update semantics.
    pub fn apply_update(&mut self, payload: &UpdatePayload) -> Result<(), DomainError> {
        let fields = payload.fields();

        if let Some(value) = fields.get("title") {
            match value.as_str() {
                Some(title) if !title.trim().is_empty() => self.title = title.to_string(),
                _ => return Err(DomainError::validation("title must be a non-empty string")),
            }
        }
        if let Some(value) = fields.get("description") {
            match value.as_str() {
                Some(text) => self.description = text.to_string(),
                None => {
                    return Err(DomainError::validation("description must be a string"));
                }
            }
        }
        if let Some(value) = fields.get("category") {
            self.category = match value {
                Value::Null => None,
                Value::String(name) => Some(name.clone()),
                _ => {
                    return Err(DomainError::validation("category must be a string or null"));
                }
            };
        }
        if let Some(value) = fields.get("flashcards") {
            self.flashcards = serde_json::from_value(value.clone())
                .map_err(|err| DomainError::validation(format!("invalid flashcards: {err}")))?;
        }
        if let Some(value) = fields.get("quiz") {
            self.quiz = serde_json::from_value(value.clone())
                .map_err(|err| DomainError::validation(format!("invalid quiz: {err}")))?;
        }

        self.updated_at = OffsetDateTime::now_utc();
        Ok(())
    }
}

/// Which part of a card an update payload touches.
///
/// Derived from top-level key presence only, first match wins, in the fixed
/// priority flashcards → quiz → overview. Values are never inspected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateKind {
    Flashcards,
    Quiz,
    Overview,
    Unknown,
}

impl UpdateKind {
    /// Classify an arbitrary JSON value. Non-objects are `Unknown`.
    pub fn classify(payload: &Value) -> Self {
        match payload.as_object() {
            Some(map) => Self::classify_fields(map),
            None => Self::Unknown,
        }
    }

    fn classify_fields(fields: &Map<String, Value>) -> Self {
        if FLASHCARD_FIELDS.iter().any(|key| fields.contains_key(*key)) {
            Self::Flashcards
        } else if QUIZ_FIELDS.iter().any(|key| fields.contains_key(*key)) {
            Self::Quiz
        } else if OVERVIEW_FIELDS.iter().any(|key| fields.contains_key(*key)) {
            Self::Overview
        } else {
            Self::Unknown
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Flashcards => "flashcards",
            Self::Quiz => "quiz",
            Self::Overview => "overview",
            Self::Unknown => "unknown",
        }
    }
}

/// A card update, tagged by classification.
///
/// The presence-based shape inspection happens here, once, when the raw
/// body is converted. Each variant carries the raw fields so the
/// application layer can apply them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdatePayload {
    Flashcards(Map<String, Value>),
    Quiz(Map<String, Value>),
    Overview(Map<String, Value>),
    Unknown(Map<String, Value>),
}

impl UpdatePayload {
    /// Convert a raw JSON body into a tagged payload. Total: non-object
    /// bodies become an empty `Unknown` payload.
    pub fn from_value(value: Value) -> Self {
        let fields = match value {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        match UpdateKind::classify_fields(&fields) {
            UpdateKind::Flashcards => Self::Flashcards(fields),
            UpdateKind::Quiz => Self::Quiz(fields),
            UpdateKind::Overview => Self::Overview(fields),
            UpdateKind::Unknown => Self::Unknown(fields),
        }
    }

    pub fn kind(&self) -> UpdateKind {
        match self {
            Self::Flashcards(_) => UpdateKind::Flashcards,
            Self::Quiz(_) => UpdateKind::Quiz,
            Self::Overview(_) => UpdateKind::Overview,
            Self::Unknown(_) => UpdateKind::Unknown,
        }
    }

    pub fn fields(&self) -> &Map<String, Value> {
        match self {
            Self::Flashcards(fields)
            | Self::Quiz(fields)
            | Self::Overview(fields)
            | Self::Unknown(fields) => fields,
        }
    }
}
