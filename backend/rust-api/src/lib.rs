use std::sync::Arc;

use axum::{
    http::{header, HeaderName, Method},
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod config;
pub mod extractors;
pub mod handlers;
pub mod metrics;
pub mod middlewares;
pub mod models;
pub mod services;

pub use config::Config;
pub use services::AppState;

pub fn create_router(app_state: Arc<AppState>) -> Router {
    // The quiz UI is served from a different origin
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static(middlewares::trace::TRACE_ID_HEADER),
        ])
        .expose_headers([HeaderName::from_static(
            middlewares::trace::TRACE_ID_HEADER,
        )])
        .allow_origin(tower_http::cors::Any);

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics_handler))
        .nest("/api/v1/sessions", sessions_routes().layer(cors))
        .with_state(app_state)
        .layer(middleware::from_fn(
            middlewares::metrics::metrics_middleware,
        ))
        .layer(middleware::from_fn(
            middlewares::trace::trace_context_middleware,
        ))
        .layer(TraceLayer::new_for_http())
}

fn sessions_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(handlers::sessions::create_session))
        .route(
            "/{id}",
            get(handlers::sessions::get_session).delete(handlers::sessions::delete_session),
        )
        .route("/{id}/identify", post(handlers::sessions::identify))
        .route("/{id}/start", post(handlers::sessions::start_quiz))
        .route("/{id}/chat", post(handlers::sessions::chat))
        .route("/{id}/answers", post(handlers::sessions::submit_answer))
        .route("/{id}/next", post(handlers::sessions::next_question))
        .route("/{id}/results", get(handlers::sessions::get_results))
        .route("/{id}/history", get(handlers::sessions::get_history))
        .route("/{id}/retake", post(handlers::sessions::retake))
        .route("/{id}/logout", post(handlers::sessions::logout))
}
