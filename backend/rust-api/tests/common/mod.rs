#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use gitquiz_api::{
    config::Config,
    create_router,
    models::{question::Question, user::UserRecord},
    services::{
        identity::{IdentityError, IdentityProvider},
        question_bank::QuestionBank,
        AppState,
    },
};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

/// Fixed GitLab directory: `octo` and `ada` exist, `locked` trips auth.
pub struct StubIdentityProvider;

#[async_trait]
impl IdentityProvider for StubIdentityProvider {
    async fn lookup(&self, username: &str) -> Result<UserRecord, IdentityError> {
        let username = username.trim();
        match username {
            "" => Err(IdentityError::EmptyUsername),
            "octo" => Ok(UserRecord {
                id: 1,
                username: "octo".to_string(),
                name: Some("Octo Cat".to_string()),
                avatar_url: None,
                web_url: Some("https://gitlab.com/octo".to_string()),
            }),
            "ada" => Ok(UserRecord {
                id: 2,
                username: "ada".to_string(),
                name: None,
                avatar_url: None,
                web_url: None,
            }),
            "locked" => Err(IdentityError::Unauthorized),
            other => Err(IdentityError::NotFound(other.to_string())),
        }
    }
}

pub fn create_test_app() -> Router {
    create_test_app_with(Config::default())
}

pub fn create_test_app_with(config: Config) -> Router {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();

    let bank = QuestionBank::builtin().expect("bundled question bank is valid");
    let app_state = Arc::new(AppState::with_parts(
        config,
        bank,
        Arc::new(StubIdentityProvider),
    ));

    create_router(app_state)
}

/// Sends a request and returns the status with the JSON body (`Null` when empty).
pub async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            panic!(
                "non-JSON body for {} {}: {}",
                method,
                uri,
                String::from_utf8_lossy(&bytes)
            )
        })
    };
    (status, json)
}

pub async fn create_session(app: &Router) -> String {
    let (status, json) = send(app, "POST", "/api/v1/sessions", None).await;
    assert_eq!(status, StatusCode::CREATED);
    json["session_id"].as_str().unwrap().to_string()
}

/// New session with `username` identified.
pub async fn identified_session(app: &Router, username: &str) -> String {
    let session_id = create_session(app).await;
    let (status, json) = send(
        app,
        "POST",
        &format!("/api/v1/sessions/{}/identify", session_id),
        Some(serde_json::json!({ "username": username })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "identify failed: {}", json);
    session_id
}

pub fn bundled_question(id: u64) -> Question {
    QuestionBank::builtin()
        .unwrap()
        .questions()
        .iter()
        .find(|q| u64::from(q.id) == id)
        .cloned()
        .unwrap_or_else(|| panic!("question {} not in bundled bank", id))
}

/// Answers every remaining question, correctly or with the first wrong option.
/// Returns the first view that is no longer `in_progress`.
pub async fn play_through(app: &Router, session_id: &str, correct: bool) -> Value {
    let base = format!("/api/v1/sessions/{}", session_id);
    loop {
        let (status, view) = send(app, "GET", &base, None).await;
        assert_eq!(status, StatusCode::OK);
        if view["state"] != "in_progress" {
            return view;
        }

        let question = bundled_question(view["question"]["id"].as_u64().unwrap());
        let option = if correct {
            question.correct_answer.clone()
        } else {
            question
                .options
                .iter()
                .find(|option| **option != question.correct_answer)
                .cloned()
                .unwrap()
        };

        let (status, view) = send(
            app,
            "POST",
            &format!("{}/answers", base),
            Some(serde_json::json!({ "option": option })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "answer failed: {}", view);
        assert_eq!(view["state"], "feedback");
        assert_eq!(view["feedback"]["is_correct"], correct);

        let (status, _) = send(app, "POST", &format!("{}/next", base), None).await;
        assert_eq!(status, StatusCode::OK);
    }
}
