//! Request-scoped invalidation facts.
//!
//! `MutationRequest` is an owned snapshot of one incoming write request:
//! method, route params, query params, parsed JSON body, and the
//! authenticated principal attached by upstream middleware. Its accessors
//! derive everything the invalidation planner needs: entity ids, skip
//! flags, and the update classification.
//!
//! Several call sites pass the same logical id in different positions
//! (route param vs. body vs. query), so each extractor centralizes one
//! precedence chain. Every accessor is total: absent or malformed input
//! resolves to `None` or `false`, never an error. A missed invalidation
//! costs a stale read, not data corruption.

use std::collections::HashMap;

use axum::http::{Method, StatusCode};
use serde_json::Value;

use crate::domain::cards::UpdateKind;

/// The one affirmative literal accepted from query strings.
const TRUE_LITERAL: &str = "true";

/// Owned snapshot of one incoming request, recomputed per request.
#[derive(Debug, Clone, Default)]
pub struct MutationRequest {
    pub method: Method,
    pub params: HashMap<String, String>,
    pub query: HashMap<String, String>,
    pub body: Option<Value>,
    /// Authenticated user id, when upstream auth attached one.
    pub principal: Option<String>,
}

/// Per-request opt-outs for individual invalidation categories.
///
/// A caller doing a bulk import (or any intentionally-stale operation) can
/// disable one category without disabling the middleware entirely.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SkipFlags {
    pub focus_quiz: bool,
    pub focus_review: bool,
    pub regular_review: bool,
}

impl MutationRequest {
    /// True iff this request can change stored data. The resolver is never
    /// consulted for reads.
    pub fn is_mutation(&self) -> bool {
        self.method != Method::GET
    }

    /// Card id, by precedence: path `id`, path `cardId`, body `_id`,
    /// body `cardId`, query `cardId`.
    pub fn card_id(&self) -> Option<String> {
        self.param("id")
            .or_else(|| self.param("cardId"))
            .or_else(|| self.body_id("_id"))
            .or_else(|| self.body_id("cardId"))
            .or_else(|| self.query_param("cardId"))
    }

    /// User id, by precedence: path `id`, path `userId`, body `userId`,
    /// query `userId`, then the authenticated principal. The principal
    /// fallback models "an authenticated user mutating their own resource
    /// implicitly targets themselves".
    pub fn user_id(&self) -> Option<String> {
        self.param("id")
            .or_else(|| self.param("userId"))
            .or_else(|| self.body_id("userId"))
            .or_else(|| self.query_param("userId"))
            .or_else(|| self.principal.clone().filter(|id| !id.is_empty()))
    }

    /// Review id, by precedence: path `reviewId`, body `reviewId`, body
    /// `card_id`, query `reviewId`. The `card_id` body field is shared with
    /// quiz extraction; clients use it for "the owning card" in both
    /// contexts.
    pub fn review_id(&self) -> Option<String> {
        self.param("reviewId")
            .or_else(|| self.body_id("reviewId"))
            .or_else(|| self.body_id("card_id"))
            .or_else(|| self.query_param("reviewId"))
    }

    /// Quiz id, by precedence: path `quizId`, body `quizId`, body
    /// `card_id`, query `quizId`.
    pub fn quiz_id(&self) -> Option<String> {
        self.param("quizId")
            .or_else(|| self.body_id("quizId"))
            .or_else(|| self.body_id("card_id"))
            .or_else(|| self.query_param("quizId"))
    }

    /// Read the three skip flags from either the query string or the body.
    pub fn skip_flags(&self) -> SkipFlags {
        SkipFlags {
            focus_quiz: self.flag("skipFocusQuizInvalidation"),
            focus_review: self.flag("skipFocusReviewInvalidation"),
            regular_review: self.flag("skipRegularReviewInvalidation"),
        }
    }

    /// Classification of the update body; `Unknown` when there is no body.
    pub fn update_kind(&self) -> UpdateKind {
        match &self.body {
            Some(body) => UpdateKind::classify(body),
            None => UpdateKind::Unknown,
        }
    }

    fn param(&self, name: &str) -> Option<String> {
        self.params.get(name).filter(|v| !v.is_empty()).cloned()
    }

    fn query_param(&self, name: &str) -> Option<String> {
        self.query.get(name).filter(|v| !v.is_empty()).cloned()
    }

    fn body_id(&self, name: &str) -> Option<String> {
        id_value(self.body.as_ref()?.get(name)?)
    }

    fn flag(&self, name: &str) -> bool {
        let in_query = self
            .query
            .get(name)
            .is_some_and(|value| value == TRUE_LITERAL);
        let in_body = self
            .body
            .as_ref()
            .and_then(|body| body.get(name))
            .is_some_and(affirmative);
        in_query || in_body
    }
}

/// Single boundary rule for flag truthiness: JSON `true` or the string
/// `"true"`. Everything else (`"TRUE"`, `1`, `"yes"`) is false.
pub(crate) fn affirmative(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::String(text) => text == TRUE_LITERAL,
        _ => false,
    }
}

/// Accept an id as a non-empty JSON string, or a number rendered as text.
fn id_value(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

/// True iff the status falls in [200, 300). Invalidation only runs for
/// successful mutations; a failed write changed nothing.
pub fn is_success(status: StatusCode) -> bool {
    status.is_success()
}
