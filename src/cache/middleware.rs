//! Write-path invalidation middleware.
//!
//! Layered over the API router. Reads pass through untouched; mutations
//! are snapshotted (method, route params, query, JSON body, principal)
//! and run, and only a 2xx response gets resolved into an invalidation
//! plan whose keys are dropped from the aggregate store.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::{Body, to_bytes},
    extract::{RawPathParams, State},
    http::{Method, Request, header},
    middleware::Next,
    response::Response,
};
use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::infra::http::Principal;

use super::config::CacheConfig;
use super::plan::InvalidationPlan;
use super::resolver::{MutationRequest, is_success};
use super::store::AggregateStore;

/// Shared cache state for the middleware layer.
#[derive(Clone)]
pub struct CacheState {
    pub config: CacheConfig,
    pub store: Arc<AggregateStore>,
}

/// Invalidate stale aggregates after successful mutations.
#[instrument(skip_all, fields(method = %request.method(), path = %request.uri().path()))]
pub async fn invalidate_on_write(
    State(cache): State<CacheState>,
    params: RawPathParams,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !cache.config.enabled {
        return next.run(request).await;
    }

    // The resolver is never consulted for reads. HEAD and OPTIONS are
    // served from read routes and change nothing.
    let method = request.method();
    if method == Method::GET || method == Method::HEAD || method == Method::OPTIONS {
        return next.run(request).await;
    }

    let method = request.method().clone();
    let params: HashMap<String, String> = params
        .iter()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect();
    let query = parse_query(request.uri().query().unwrap_or(""));
    let principal = request
        .extensions()
        .get::<Principal>()
        .map(|principal| principal.user_id.clone());

    let (request, body) =
        buffer_json_body(request, cache.config.max_buffered_body_bytes).await;

    let response = next.run(request).await;

    // A failed write changed nothing; invalidating would be wasted work.
    if !is_success(response.status()) {
        return response;
    }

    let snapshot = MutationRequest {
        method,
        params,
        query,
        body,
        principal,
    };
    let plan = InvalidationPlan::resolve(&snapshot);
    if plan.is_empty() {
        return response;
    }

    info!(stale = plan.stale.len(), plan = %plan, "consuming invalidation plan");
    for key in &plan.stale {
        if cache.store.invalidate(key) {
            debug!(partition = key.partition(), "dropped stale aggregate");
        }
    }

    response
}

fn parse_query(query: &str) -> HashMap<String, String> {
    url::form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect()
}

/// Buffer a JSON request body so invalidation facts can be read from it,
/// then rebuild the request for the handler. Non-JSON bodies pass through
/// unread. A body whose declared length exceeds the buffering limit is
/// forwarded untouched with no facts; the layer must never reject a
/// request the handler would accept. Only an unreadable chunked body is
/// forwarded emptied.
async fn buffer_json_body(request: Request<Body>, limit: usize) -> (Request<Body>, Option<Value>) {
    let is_json = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"));
    if !is_json {
        return (request, None);
    }

    let declared_len = request
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<usize>().ok());
    if declared_len.is_some_and(|len| len > limit) {
        return (request, None);
    }

    let (parts, body) = request.into_parts();
    match to_bytes(body, limit).await {
        Ok(bytes) => {
            let parsed = serde_json::from_slice(&bytes).ok();
            (Request::from_parts(parts, Body::from(bytes)), parsed)
        }
        Err(_) => (Request::from_parts(parts, Body::empty()), None),
    }
}
