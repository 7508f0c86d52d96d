use axum::http::StatusCode;
use serde_json::json;
use uuid::Uuid;

use gitquiz_api::config::Config;

mod common;

use common::{create_session, create_test_app, identified_session, play_through, send};

#[tokio::test]
async fn test_create_session_awaits_user() {
    let app = create_test_app();

    let (status, json) = send(&app, "POST", "/api/v1/sessions", None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["state"], "awaiting_user");

    let session_id = json["session_id"].as_str().unwrap();
    let (status, view) = send(&app, "GET", &format!("/api/v1/sessions/{}", session_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["state"], "awaiting_user");
    assert!(view["user"].is_null());
    assert!(view["question"].is_null());
}

#[tokio::test]
async fn test_identify_greets_user_by_display_name() {
    let app = create_test_app();
    let session_id = identified_session(&app, "octo").await;

    let (_, view) = send(&app, "GET", &format!("/api/v1/sessions/{}", session_id), None).await;
    assert_eq!(view["state"], "user_identified");
    assert_eq!(view["user"]["display_name"], "Octo Cat");
    assert!(view["messages"][0]["content"]
        .as_str()
        .unwrap()
        .contains("Octo Cat"));
}

#[tokio::test]
async fn test_identify_unknown_user_returns_404_and_stays_awaiting() {
    let app = create_test_app();
    let session_id = create_session(&app).await;
    let base = format!("/api/v1/sessions/{}", session_id);

    let (status, json) = send(
        &app,
        "POST",
        &format!("{}/identify", base),
        Some(json!({ "username": "nobody" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "not_found");

    let (_, view) = send(&app, "GET", &base, None).await;
    assert_eq!(view["state"], "awaiting_user");
}

#[tokio::test]
async fn test_identify_upstream_auth_failure_is_bad_gateway() {
    let app = create_test_app();
    let session_id = create_session(&app).await;

    let (status, json) = send(
        &app,
        "POST",
        &format!("/api/v1/sessions/{}/identify", session_id),
        Some(json!({ "username": "locked" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["error"], "authorization_error");
}

#[tokio::test]
async fn test_identify_rejects_empty_username_and_bad_json() {
    let app = create_test_app();
    let session_id = create_session(&app).await;
    let uri = format!("/api/v1/sessions/{}/identify", session_id);

    let (status, json) = send(&app, "POST", &uri, Some(json!({ "username": "" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "bad_request");

    let (status, json) = send(&app, "POST", &uri, Some(json!({ "name": "octo" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "bad_request");
}

#[tokio::test]
async fn test_identify_twice_is_conflict() {
    let app = create_test_app();
    let session_id = identified_session(&app, "octo").await;

    let (status, json) = send(
        &app,
        "POST",
        &format!("/api/v1/sessions/{}/identify", session_id),
        Some(json!({ "username": "ada" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"], "invalid_transition");
}

#[tokio::test]
async fn test_start_before_identify_is_conflict() {
    let app = create_test_app();
    let session_id = create_session(&app).await;

    let (status, json) = send(
        &app,
        "POST",
        &format!("/api/v1/sessions/{}/start", session_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"], "invalid_transition");
}

#[tokio::test]
async fn test_unknown_session_returns_404() {
    let app = create_test_app();
    let missing = Uuid::new_v4();

    let (status, json) = send(&app, "GET", &format!("/api/v1/sessions/{}", missing), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "session_not_found");

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/v1/sessions/{}/next", missing),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_chat_waits_for_start_keyword() {
    let app = create_test_app();
    let session_id = identified_session(&app, "ada").await;
    let uri = format!("/api/v1/sessions/{}/chat", session_id);

    let (status, view) = send(&app, "POST", &uri, Some(json!({ "message": "what is this?" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["state"], "user_identified");
    assert_eq!(view["messages"].as_array().unwrap().len(), 3);

    let (status, view) = send(&app, "POST", &uri, Some(json!({ "message": "Start quiz" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["state"], "in_progress");
    assert_eq!(view["question"]["number"], 1);
}

#[tokio::test]
async fn test_full_quiz_all_correct() {
    let app = create_test_app();
    let session_id = identified_session(&app, "octo").await;
    let base = format!("/api/v1/sessions/{}", session_id);

    let (status, view) = send(&app, "POST", &format!("{}/start", base), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["state"], "in_progress");
    // The bundled bank has only 4 High questions, so a 15-question draw yields 14
    assert_eq!(view["total_questions"], 14);

    let view = play_through(&app, &session_id, true).await;
    assert_eq!(view["state"], "completed");
    assert_eq!(view["score"], 14);
    assert_eq!(view["answered"], 14);

    let (status, results) = send(&app, "GET", &format!("{}/results", base), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(results["score"], 14);
    assert_eq!(results["total_questions"], 14);
    assert_eq!(results["percentage"], 100.0);
    assert_eq!(results["band"], "excellent");
    assert_eq!(results["display_name"], "Octo Cat");
    assert!(results["incorrect_answers"].as_array().unwrap().is_empty());

    let by_difficulty = &results["summary"]["by_difficulty"];
    assert_eq!(by_difficulty["Low"]["total_count"], 5);
    assert_eq!(by_difficulty["Medium"]["total_count"], 5);
    assert_eq!(by_difficulty["High"]["total_count"], 4);
    assert_eq!(by_difficulty["High"]["percentage"], 100.0);
}

#[tokio::test]
async fn test_invalid_option_is_rejected_and_stays_in_progress() {
    let app = create_test_app();
    let session_id = identified_session(&app, "octo").await;
    let base = format!("/api/v1/sessions/{}", session_id);
    send(&app, "POST", &format!("{}/start", base), None).await;

    let (status, json) = send(
        &app,
        "POST",
        &format!("{}/answers", base),
        Some(json!({ "option": "definitely not an option" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["error"], "invalid_option");

    let (_, view) = send(&app, "GET", &base, None).await;
    assert_eq!(view["state"], "in_progress");
    assert_eq!(view["answered"], 0);

    let (status, json) = send(&app, "POST", &format!("{}/answers", base), Some(json!({ "option": "" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "bad_request");
    assert!(json["message"]
        .as_str()
        .unwrap()
        .contains("Please select an answer."));
}

#[tokio::test]
async fn test_refreshing_feedback_does_not_double_score() {
    let app = create_test_app();
    let session_id = identified_session(&app, "octo").await;
    let base = format!("/api/v1/sessions/{}", session_id);
    let (_, view) = send(&app, "POST", &format!("{}/start", base), None).await;

    let question = common::bundled_question(view["question"]["id"].as_u64().unwrap());
    let (status, view) = send(
        &app,
        "POST",
        &format!("{}/answers", base),
        Some(json!({ "option": question.correct_answer })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["score"], 1);

    for _ in 0..3 {
        let (_, view) = send(&app, "GET", &base, None).await;
        assert_eq!(view["state"], "feedback");
        assert_eq!(view["score"], 1);
        assert_eq!(view["answered"], 1);
        assert_eq!(view["feedback"]["correct_answer"], question.correct_answer.as_str());
    }

    // A second submission for the same question is not a valid transition
    let (status, _) = send(
        &app,
        "POST",
        &format!("{}/answers", base),
        Some(json!({ "option": question.correct_answer })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, view) = send(&app, "POST", &format!("{}/next", base), None).await;
    assert_eq!(view["state"], "in_progress");
    assert_eq!(view["question"]["number"], 2);
}

#[tokio::test]
async fn test_refreshing_results_saves_attempt_once() {
    let app = create_test_app();
    let session_id = identified_session(&app, "octo").await;
    let base = format!("/api/v1/sessions/{}", session_id);
    send(&app, "POST", &format!("{}/start", base), None).await;
    play_through(&app, &session_id, false).await;

    for _ in 0..3 {
        let (status, results) = send(&app, "GET", &format!("{}/results", base), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(results["saved"], false);
        assert_eq!(results["band"], "needs_improvement");
        assert_eq!(results["incorrect_answers"].as_array().unwrap().len(), 14);
        send(&app, "GET", &base, None).await;
    }

    let (status, history) = send(&app, "GET", &format!("{}/history", base), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history["user_id"], 1);
    assert_eq!(history["attempts"].as_array().unwrap().len(), 1);
    assert_eq!(history["attempts"][0]["score"], 0);
}

#[tokio::test]
async fn test_results_before_completion_is_conflict() {
    let app = create_test_app();
    let session_id = identified_session(&app, "octo").await;
    let base = format!("/api/v1/sessions/{}", session_id);
    send(&app, "POST", &format!("{}/start", base), None).await;

    let (status, _) = send(&app, "GET", &format!("{}/results", base), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_retake_records_new_attempt_newest_first() {
    let mut config = Config::default();
    config.quiz.save_debounce_secs = 0;
    let app = common::create_test_app_with(config);

    let session_id = identified_session(&app, "ada").await;
    let base = format!("/api/v1/sessions/{}", session_id);

    send(&app, "POST", &format!("{}/start", base), None).await;
    play_through(&app, &session_id, true).await;

    let (status, view) = send(&app, "POST", &format!("{}/retake", base), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["state"], "user_identified");
    assert_eq!(view["score"], 0);
    assert_eq!(view["user"]["username"], "ada");

    send(&app, "POST", &format!("{}/start", base), None).await;
    play_through(&app, &session_id, false).await;

    let (_, history) = send(&app, "GET", &format!("{}/history", base), None).await;
    let attempts = history["attempts"].as_array().unwrap();
    assert!(attempts.len() >= 2);
    assert_eq!(attempts[0]["score"], 0);
    assert_eq!(attempts[0]["attempt_number"], attempts.len());
    assert_eq!(attempts.last().unwrap()["score"], 14);
    assert_eq!(attempts.last().unwrap()["attempt_number"], 1);
}

#[tokio::test]
async fn test_logout_keeps_history_per_user() {
    let app = create_test_app();
    let session_id = identified_session(&app, "octo").await;
    let base = format!("/api/v1/sessions/{}", session_id);
    send(&app, "POST", &format!("{}/start", base), None).await;
    play_through(&app, &session_id, true).await;

    let (status, view) = send(&app, "POST", &format!("{}/logout", base), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["state"], "awaiting_user");
    assert!(view["user"].is_null());

    let (status, _) = send(&app, "GET", &format!("{}/history", base), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    // A different user on the same session sees none of octo's attempts
    send(
        &app,
        "POST",
        &format!("{}/identify", base),
        Some(json!({ "username": "ada" })),
    )
    .await;
    let (_, history) = send(&app, "GET", &format!("{}/history", base), None).await;
    assert_eq!(history["user_id"], 2);
    assert!(history["attempts"].as_array().unwrap().is_empty());

    // octo's attempt is still there from a brand new session
    let other = identified_session(&app, "octo").await;
    let (_, history) = send(&app, "GET", &format!("/api/v1/sessions/{}/history", other), None).await;
    assert_eq!(history["attempts"].as_array().unwrap().len(), 1);
    assert_eq!(history["attempts"][0]["score"], 14);
}

#[tokio::test]
async fn test_logout_mid_quiz_discards_attempt() {
    let app = create_test_app();
    let session_id = identified_session(&app, "octo").await;
    let base = format!("/api/v1/sessions/{}", session_id);
    send(&app, "POST", &format!("{}/start", base), None).await;

    let (status, view) = send(&app, "POST", &format!("{}/logout", base), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["state"], "awaiting_user");
    assert_eq!(view["total_questions"], 0);
}

#[tokio::test]
async fn test_delete_session() {
    let app = create_test_app();
    let session_id = create_session(&app).await;
    let uri = format!("/api/v1/sessions/{}", session_id);

    let (status, _) = send(&app, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health_check() {
    let app = create_test_app();

    let (status, json) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["question_bank_size"], 15);
    assert_eq!(json["identity_configured"], true);
    assert_eq!(json["active_sessions"], 0);
    assert_eq!(json["users_with_history"], 0);
}

#[tokio::test]
async fn test_health_counts_sessions_and_users_with_history() {
    let app = create_test_app();
    let session_id = identified_session(&app, "octo").await;
    send(&app, "POST", &format!("/api/v1/sessions/{}/start", session_id), None).await;
    play_through(&app, &session_id, true).await;
    create_session(&app).await;

    let (status, json) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["active_sessions"], 2);
    assert_eq!(json["users_with_history"], 1);
}

#[tokio::test]
async fn test_metrics_exposes_quiz_counters() {
    use axum::{body::Body, http::Request};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    let app = create_test_app();
    create_session(&app).await;

    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("quiz_sessions_total"));
    assert!(text.contains("http_requests_total"));
}
