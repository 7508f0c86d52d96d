use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::metrics;
use crate::services::identity::IdentityError;
use crate::services::quiz_session::TransitionError;
use crate::services::AppState;

pub mod sessions;

pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let identity_configured = state.identity.is_configured();
    let bank_size = state.bank.len();
    let active_sessions = state.sessions.len().await;
    let users_with_history = state.history.read().await.user_count();

    // The quiz still runs without a token; only identification is unavailable
    let status = if identity_configured && bank_size > 0 {
        "healthy"
    } else {
        "degraded"
    };

    (
        StatusCode::OK,
        Json(json!({
            "status": status,
            "service": "gitquiz-api",
            "version": env!("CARGO_PKG_VERSION"),
            "question_bank_size": bank_size,
            "identity_configured": identity_configured,
            "active_sessions": active_sessions,
            "users_with_history": users_with_history,
        })),
    )
}

pub async fn metrics_handler() -> impl IntoResponse {
    match metrics::render_metrics() {
        Ok(metrics_text) => (StatusCode::OK, metrics_text),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to render metrics: {}", e),
        ),
    }
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    SessionNotFound(Uuid),
    Identity(IdentityError),
    Transition(TransitionError),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    fn parts(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ApiError::SessionNotFound(_) => (StatusCode::NOT_FOUND, "session_not_found"),
            ApiError::Identity(err) => {
                let status = match err {
                    IdentityError::MissingToken | IdentityError::Configuration(_) => {
                        StatusCode::SERVICE_UNAVAILABLE
                    }
                    IdentityError::EmptyUsername => StatusCode::BAD_REQUEST,
                    IdentityError::NotFound(_) => StatusCode::NOT_FOUND,
                    IdentityError::Unauthorized
                    | IdentityError::Upstream { .. }
                    | IdentityError::Transport { .. }
                    | IdentityError::InvalidResponse(_) => StatusCode::BAD_GATEWAY,
                };
                (status, err.kind())
            }
            ApiError::Transition(err) => match err {
                TransitionError::InvalidTransition { .. } => {
                    (StatusCode::CONFLICT, "invalid_transition")
                }
                TransitionError::NoQuestions => (StatusCode::SERVICE_UNAVAILABLE, "no_questions"),
                TransitionError::InvalidOption { .. } => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "invalid_option")
                }
                TransitionError::StateInconsistency(_) => {
                    (StatusCode::CONFLICT, "state_inconsistency")
                }
            },
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::BadRequest(message) => message.clone(),
            ApiError::SessionNotFound(id) => format!("Session {} not found", id),
            ApiError::Identity(err) => err.to_string(),
            ApiError::Transition(err) => err.to_string(),
        }
    }
}

impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
        ApiError::Identity(err)
    }
}

impl From<TransitionError> for ApiError {
    fn from(err: TransitionError) -> Self {
        ApiError::Transition(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = self.parts();
        let message = self.message();

        if status.is_server_error() {
            tracing::error!("{}: {}", kind, message);
        } else {
            tracing::warn!("{}: {}", kind, message);
        }

        (
            status,
            Json(json!({
                "error": kind,
                "message": message,
            })),
        )
            .into_response()
    }
}
