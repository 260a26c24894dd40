//! Health endpoint backed by an injected connection-state capability.
//!
//! The handler never reads connection state from a module-wide singleton;
//! whoever builds the router supplies a [`ConnectionStateProvider`], which
//! makes degraded states trivially fakeable in tests.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::application::error::ErrorReport;

/// Lifecycle states of the backing database connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    Connecting,
    Disconnecting,
    Disconnected,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::Connecting => "connecting",
            Self::Disconnecting => "disconnecting",
            Self::Disconnected => "disconnected",
        }
    }
}

/// Capability interface for reading the live connection state.
pub trait ConnectionStateProvider: Send + Sync {
    fn current_state(&self) -> ConnectionState;
}

#[derive(Clone)]
pub struct HealthState {
    pub database: Arc<dyn ConnectionStateProvider>,
}

/// 204 when the database connection is up, 503 otherwise.
pub async fn health(State(state): State<HealthState>) -> Response {
    match state.database.current_state() {
        ConnectionState::Connected => StatusCode::NO_CONTENT.into_response(),
        other => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_message(
                "infra::health",
                StatusCode::SERVICE_UNAVAILABLE,
                format!("database connection state: {}", other.as_str()),
            )
            .attach(&mut response);
            response
        }
    }
}
