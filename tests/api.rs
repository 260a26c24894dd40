//! End-to-end tests over the full router: handlers, principal middleware,
//! and write-path cache invalidation together.

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use serde_json::{Value, json};
use tower::ServiceExt;

use mnemo::{
    application::cards::CardService,
    cache::{AggregateStore, CacheConfig, CacheKey, CacheState},
    domain::cards::Card,
    infra::{
        health::HealthState,
        http::{ApiState, RouterState, build_router},
        repo::CardRepo,
    },
};

struct TestApp {
    router: Router,
    store: Arc<AggregateStore>,
    repo: Arc<CardRepo>,
}

fn app() -> TestApp {
    let config = CacheConfig::default();
    let store = Arc::new(AggregateStore::new(&config));
    let repo = Arc::new(CardRepo::new());

    let state = RouterState {
        api: ApiState {
            cards: CardService::new(Arc::clone(&repo), Arc::clone(&store)),
        },
        cache: CacheState {
            config,
            store: Arc::clone(&store),
        },
        health: HealthState {
            database: repo.clone(),
        },
    };

    TestApp {
        router: build_router(state),
        store,
        repo,
    }
}

impl TestApp {
    /// Seed a card with a fixed id so tests can address it in URLs.
    fn seed_card(&self, id: &str, user_id: &str, title: &str) -> Card {
        let mut card = Card::new(user_id, title);
        card.id = id.to_string();
        self.repo.insert(card.clone());
        card
    }

    async fn send(&self, request: Request<Body>) -> axum::response::Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible router")
    }
}

fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-user-id", "u1")
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn bare_request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("x-user-id", "u1")
        .body(Body::empty())
        .expect("request")
}

async fn response_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json body")
}

#[tokio::test]
async fn create_then_read_card() {
    let app = app();

    let response = app
        .send(json_request(
            Method::POST,
            "/api/cards",
            json!({ "userId": "u1", "title": "Biology" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = response_json(response).await;
    let id = created["id"].as_str().expect("card id").to_string();

    let response = app
        .send(bare_request(Method::GET, &format!("/api/cards/{id}")))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let card = response_json(response).await;
    assert_eq!(card["title"], "Biology");
    assert_eq!(card["userId"], "u1");
}

#[tokio::test]
async fn create_falls_back_to_principal_for_ownership() {
    let app = app();

    let response = app
        .send(json_request(
            Method::POST,
            "/api/cards",
            json!({ "title": "Chemistry" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let card = response_json(response).await;
    assert_eq!(card["userId"], "u1");
}

#[tokio::test]
async fn create_without_any_user_is_rejected() {
    let app = app();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/cards")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "title": "Orphan" }).to_string()))
        .expect("request");

    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn overview_refreshes_after_invalidating_write() {
    let app = app();

    app.send(json_request(
        Method::POST,
        "/api/cards",
        json!({ "userId": "u1", "title": "First" }),
    ))
    .await;

    let overview = response_json(
        app.send(bare_request(Method::GET, "/api/users/u1/overview"))
            .await,
    )
    .await;
    assert_eq!(overview["totalCards"], 1);

    // The second create must drop the now-stale cached overview.
    app.send(json_request(
        Method::POST,
        "/api/cards",
        json!({ "userId": "u1", "title": "Second" }),
    ))
    .await;

    let overview = response_json(
        app.send(bare_request(Method::GET, "/api/users/u1/overview"))
            .await,
    )
    .await;
    assert_eq!(overview["totalCards"], 2);
}

#[tokio::test]
async fn failed_update_leaves_aggregates_cached() {
    let app = app();
    app.store
        .put(CacheKey::CardById("ghost".to_string()), json!({}));

    let response = app
        .send(json_request(
            Method::PATCH,
            "/api/cards/ghost",
            json!({ "title": "renamed" }),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(
        app.store
            .get(&CacheKey::CardById("ghost".to_string()))
            .is_some()
    );
}

#[tokio::test]
async fn skip_flag_preserves_review_queue() {
    let app = app();
    app.seed_card("c1", "u1", "Biology");

    // Path ids drive both the card and user precedence chains here.
    app.store
        .put(CacheKey::ReviewQueue("c1".to_string()), json!([]));
    app.store
        .put(CacheKey::FocusReview("c1".to_string()), json!([]));

    let response = app
        .send(json_request(
            Method::PATCH,
            "/api/cards/c1?skipRegularReviewInvalidation=true",
            json!({ "flashcards": [] }),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        app.store
            .get(&CacheKey::ReviewQueue("c1".to_string()))
            .is_some()
    );
    assert!(
        app.store
            .get(&CacheKey::FocusReview("c1".to_string()))
            .is_none()
    );
}

#[tokio::test]
async fn flashcard_update_refreshes_focus_review() {
    let app = app();
    app.seed_card("c1", "u1", "Biology");

    // Populate the focus partition through the endpoint itself.
    let response = app
        .send(bare_request(Method::GET, "/api/cards/c1/review"))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        app.store
            .get(&CacheKey::FocusReview("c1".to_string()))
            .is_some()
    );

    let response = app
        .send(json_request(
            Method::PATCH,
            "/api/cards/c1",
            json!({ "flashcards": [{ "front": "cell", "back": "basic unit of life" }] }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        app.store
            .get(&CacheKey::FocusReview("c1".to_string()))
            .is_none()
    );

    let set = response_json(
        app.send(bare_request(Method::GET, "/api/cards/c1/review"))
            .await,
    )
    .await;
    assert_eq!(set["flashcards"][0]["front"], "cell");
}

#[tokio::test]
async fn reads_do_not_invalidate() {
    let app = app();
    app.seed_card("c1", "u1", "Biology");
    app.store
        .put(CacheKey::Overview("u1".to_string()), json!({ "totalCards": 9 }));

    let response = app.send(bare_request(Method::GET, "/api/cards/c1")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let cached = app
        .store
        .get(&CacheKey::Overview("u1".to_string()))
        .expect("overview untouched by read");
    assert_eq!(cached["totalCards"], 9);
}

#[tokio::test]
async fn recording_a_review_drops_user_and_card_aggregates() {
    let app = app();
    app.seed_card("c1", "u1", "Biology");
    app.store
        .put(CacheKey::ReviewQueue("c1".to_string()), json!([]));
    app.store
        .put(CacheKey::Overview("c1".to_string()), json!({}));
    app.store
        .put(CacheKey::FocusReview("r9".to_string()), json!([]));

    let response = app
        .send(bare_request(Method::POST, "/api/cards/c1/reviews/r9"))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let card = response_json(response).await;
    assert_eq!(card["reviewCount"], 1);

    // Bodyless mutation: classification is unknown, so the plan is
    // conservative and reaches every partition keyed by the path ids.
    assert!(
        app.store
            .get(&CacheKey::ReviewQueue("c1".to_string()))
            .is_none()
    );
    assert!(
        app.store
            .get(&CacheKey::Overview("c1".to_string()))
            .is_none()
    );
    assert!(
        app.store
            .get(&CacheKey::FocusReview("r9".to_string()))
            .is_none()
    );
}

#[tokio::test]
async fn delete_returns_no_content_and_invalidates() {
    let app = app();
    app.seed_card("c1", "u1", "Biology");
    app.store
        .put(CacheKey::CardById("c1".to_string()), json!({}));

    let response = app
        .send(bare_request(Method::DELETE, "/api/cards/c1"))
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(
        app.store
            .get(&CacheKey::CardById("c1".to_string()))
            .is_none()
    );
    assert!(app.repo.get("c1").is_none());
}

#[tokio::test]
async fn quiz_set_lists_only_quizzable_cards() {
    let app = app();
    app.seed_card("c1", "u1", "No quiz");
    let mut quizzed = Card::new("u1", "Quizzed");
    quizzed.id = "c2".to_string();
    quizzed.quiz = serde_json::from_value(json!([
        { "prompt": "2 + 2?", "choices": ["3", "4"], "answer": 1 }
    ]))
    .expect("quiz items");
    app.repo.insert(quizzed);

    let response = app
        .send(bare_request(Method::GET, "/api/users/u1/quiz-set"))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let set = response_json(response).await;
    let set = set.as_array().expect("array");
    assert_eq!(set.len(), 1);
    assert_eq!(set[0]["cardId"], "c2");
}

#[tokio::test]
async fn health_reports_no_content() {
    let app = app();
    let response = app.send(bare_request(Method::GET, "/health")).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}
