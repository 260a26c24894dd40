//! JSON API handlers and router wiring.

use axum::{
    Extension, Json, Router,
    extract::{FromRef, Path, State},
    http::StatusCode,
    middleware,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::Value;

use crate::{
    application::{
        cards::{CardService, NewCard},
        error::AppError,
    },
    cache::{CacheState, invalidate_on_write},
    domain::cards::{Card, Flashcard, QuizItem, UpdatePayload},
    infra::health::{HealthState, health},
};

use super::middleware::{Principal, attach_principal, log_responses, set_request_context};

#[derive(Clone)]
pub struct ApiState {
    pub cards: CardService,
}

/// Combined router state; each handler extracts the slice it needs.
#[derive(Clone)]
pub struct RouterState {
    pub api: ApiState,
    pub cache: CacheState,
    pub health: HealthState,
}

impl FromRef<RouterState> for ApiState {
    fn from_ref(state: &RouterState) -> Self {
        state.api.clone()
    }
}

impl FromRef<RouterState> for CacheState {
    fn from_ref(state: &RouterState) -> Self {
        state.cache.clone()
    }
}

impl FromRef<RouterState> for HealthState {
    fn from_ref(state: &RouterState) -> Self {
        state.health.clone()
    }
}

/// Build the application router.
///
/// Layer order matters: request context and principal are attached before
/// response logging and invalidation run, and invalidation sits closest to
/// the routes so it sees resolved path params.
pub fn build_router(state: RouterState) -> Router {
    let cache = state.cache.clone();

    Router::new()
        .route("/api/cards", get(list_cards).post(create_card))
        .route(
            "/api/cards/{id}",
            get(get_card).patch(update_card).delete(delete_card),
        )
        .route("/api/cards/{id}/review", get(focus_review))
        .route("/api/cards/{id}/quiz", get(focus_quiz))
        .route("/api/cards/{id}/reviews/{reviewId}", post(record_review))
        .route("/api/cards/{id}/quizzes/{quizId}", post(record_quiz))
        .route("/api/users/{userId}/overview", get(user_overview))
        .route("/api/users/{userId}/review-queue", get(user_review_queue))
        .route("/api/users/{userId}/quiz-set", get(user_quiz_set))
        .route("/health", get(health))
        .with_state(state)
        .layer(middleware::from_fn_with_state(cache, invalidate_on_write))
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(attach_principal))
        .layer(middleware::from_fn(set_request_context))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateCardRequest {
    #[serde(default)]
    user_id: Option<String>,
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    flashcards: Vec<Flashcard>,
    #[serde(default)]
    quiz: Vec<QuizItem>,
}

async fn list_cards(State(api): State<ApiState>) -> Json<Vec<Card>> {
    Json(api.cards.list())
}

async fn create_card(
    State(api): State<ApiState>,
    principal: Option<Extension<Principal>>,
    Json(body): Json<CreateCardRequest>,
) -> Result<(StatusCode, Json<Card>), AppError> {
    let user_id = body
        .user_id
        .or_else(|| principal.map(|Extension(principal)| principal.user_id))
        .ok_or_else(|| AppError::validation("userId is required when unauthenticated"))?;

    let card = api.cards.create(NewCard {
        user_id,
        title: body.title,
        description: body.description,
        category: body.category,
        flashcards: body.flashcards,
        quiz: body.quiz,
    })?;
    Ok((StatusCode::CREATED, Json(card)))
}

async fn get_card(
    State(api): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<Card>, AppError> {
    Ok(Json(api.cards.get(&id)?))
}

async fn update_card(
    State(api): State<ApiState>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<Card>, AppError> {
    let payload = UpdatePayload::from_value(body);
    Ok(Json(api.cards.update(&id, &payload)?))
}

async fn delete_card(
    State(api): State<ApiState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    api.cards.delete(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn focus_review(
    State(api): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    Ok(Json(api.cards.focus_review(&id)?))
}

async fn focus_quiz(
    State(api): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    Ok(Json(api.cards.focus_quiz(&id)?))
}

async fn record_review(
    State(api): State<ApiState>,
    Path((card_id, _review_id)): Path<(String, String)>,
) -> Result<Json<Card>, AppError> {
    Ok(Json(api.cards.record_review(&card_id)?))
}

async fn record_quiz(
    State(api): State<ApiState>,
    Path((card_id, _quiz_id)): Path<(String, String)>,
) -> Result<Json<Card>, AppError> {
    Ok(Json(api.cards.record_quiz(&card_id)?))
}

async fn user_overview(
    State(api): State<ApiState>,
    Path(user_id): Path<String>,
) -> Json<Value> {
    Json(api.cards.overview(&user_id))
}

async fn user_review_queue(
    State(api): State<ApiState>,
    Path(user_id): Path<String>,
) -> Json<Value> {
    Json(api.cards.review_queue(&user_id))
}

async fn user_quiz_set(
    State(api): State<ApiState>,
    Path(user_id): Path<String>,
) -> Json<Value> {
    Json(api.cards.quiz_set(&user_id))
}
