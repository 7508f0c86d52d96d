use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use super::ApiError;
use crate::{
    extractors::AppJson,
    metrics::QUIZ_SESSIONS_TOTAL,
    models::{
        answer::SubmitAnswerRequest,
        attempt::{HistoryResponse, PerformanceBand, ResultsResponse},
        user::IdentifyRequest,
        ChatRequest, CreateSessionResponse, QuizState, SessionView,
    },
    services::{
        history::{AttemptHistory, RecordOutcome},
        quiz_session::{QuizSession, TransitionError},
        results, AppState,
    },
};

/// POST /api/v1/sessions - Open a quiz session awaiting identification
pub async fn create_session(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let (session_id, created_at) = state.sessions.create(Utc::now()).await;

    (
        StatusCode::CREATED,
        Json(CreateSessionResponse {
            session_id,
            state: QuizState::AwaitingUser,
            created_at,
        }),
    )
}

/// GET /api/v1/sessions/{id} - Render the current screen
///
/// Rendering re-runs the entry action of `feedback` and `completed`; both are
/// idempotent, so refreshing neither double-scores nor double-saves.
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    tracing::debug!("Rendering session: {}", session_id);

    let now = Utc::now();
    let mut history = state.history.write().await;
    let view = state
        .sessions
        .update(session_id, now, |session| {
            render(session, &mut history, now)
        })
        .await;

    found(view, session_id).map(Json)
}

/// POST /api/v1/sessions/{id}/identify - Resolve a GitLab username
pub async fn identify(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
    AppJson(req): AppJson<IdentifyRequest>,
) -> Result<Json<SessionView>, ApiError> {
    req.validate()
        .map_err(|e| ApiError::bad_request(format!("Validation error: {}", e)))?;

    tracing::info!("Identifying user '{}' for session {}", req.username, session_id);

    // Check the state before spending a network round trip
    let session = state
        .sessions
        .snapshot(session_id)
        .await
        .ok_or(ApiError::SessionNotFound(session_id))?;
    if session.state() != QuizState::AwaitingUser {
        return Err(TransitionError::InvalidTransition {
            action: "identify a user",
            state: session.state(),
        }
        .into());
    }

    // No lock is held across the lookup
    let user = state.identity.lookup(&req.username).await?;

    let view = state
        .sessions
        .update(session_id, Utc::now(), |session| {
            session.identify(user)?;
            session.view()
        })
        .await;
    let view = found(view, session_id)?;

    QUIZ_SESSIONS_TOTAL.with_label_values(&["identified"]).inc();
    Ok(Json(view))
}

/// POST /api/v1/sessions/{id}/start - Draw questions and begin an attempt
pub async fn start_quiz(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    tracing::info!("Starting quiz for session: {}", session_id);

    let view = state
        .sessions
        .update(session_id, Utc::now(), |session| {
            session.begin_attempt(state.draw_questions())?;
            session.view()
        })
        .await;
    let view = found(view, session_id)?;

    QUIZ_SESSIONS_TOTAL.with_label_values(&["started"]).inc();
    Ok(Json(view))
}

/// POST /api/v1/sessions/{id}/chat - Chat prompt on the welcome screen
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
    AppJson(req): AppJson<ChatRequest>,
) -> Result<Json<SessionView>, ApiError> {
    req.validate()
        .map_err(|e| ApiError::bad_request(format!("Validation error: {}", e)))?;

    let result = state
        .sessions
        .update(session_id, Utc::now(), |session| {
            let started = session.chat(&req.message, || state.draw_questions())?;
            session.view().map(|view| (started, view))
        })
        .await;
    let (started, view) = found(result, session_id)?;

    if started {
        QUIZ_SESSIONS_TOTAL.with_label_values(&["started"]).inc();
    }
    Ok(Json(view))
}

/// POST /api/v1/sessions/{id}/answers - Submit an option for the current question
pub async fn submit_answer(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
    AppJson(req): AppJson<SubmitAnswerRequest>,
) -> Result<Json<SessionView>, ApiError> {
    req.validate()
        .map_err(|e| ApiError::bad_request(format!("Validation error: {}", e)))?;

    tracing::info!("Submitting answer for session: {}", session_id);

    let view = state
        .sessions
        .update(session_id, Utc::now(), |session| {
            session.submit(&req.option)?;
            session.view()
        })
        .await;

    found(view, session_id).map(Json)
}

/// POST /api/v1/sessions/{id}/next - Leave feedback for the next question or the results
pub async fn next_question(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    let now = Utc::now();
    let mut history = state.history.write().await;
    let view = state
        .sessions
        .update(session_id, now, |session| {
            if session.advance()? == QuizState::Completed {
                session.finalize_and_record(&mut history, now)?;
            }
            session.view()
        })
        .await;
    let view = found(view, session_id)?;

    if view.state == QuizState::Completed {
        QUIZ_SESSIONS_TOTAL.with_label_values(&["completed"]).inc();
    }
    Ok(Json(view))
}

/// GET /api/v1/sessions/{id}/results - Score summary of the finished attempt
pub async fn get_results(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<ResultsResponse>, ApiError> {
    tracing::info!("Getting results for session: {}", session_id);

    let now = Utc::now();
    let mut history = state.history.write().await;
    let response = state
        .sessions
        .update(session_id, now, |session| {
            let outcome = session.finalize_and_record(&mut history, now)?;
            Ok(results_response(session, outcome))
        })
        .await;

    found(response, session_id).map(Json)
}

/// GET /api/v1/sessions/{id}/history - Past attempts of the identified user
pub async fn get_history(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let session = state
        .sessions
        .snapshot(session_id)
        .await
        .ok_or(ApiError::SessionNotFound(session_id))?;
    let user_id = session.user().map(|user| user.id).ok_or_else(|| {
        ApiError::from(TransitionError::InvalidTransition {
            action: "view attempt history",
            state: session.state(),
        })
    })?;

    let attempts = state.history.read().await.entries_for(user_id);
    Ok(Json(HistoryResponse { user_id, attempts }))
}

/// POST /api/v1/sessions/{id}/retake - Same user, new attempt
pub async fn retake(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    let view = state
        .sessions
        .update(session_id, Utc::now(), |session| {
            session.retake()?;
            session.view()
        })
        .await;
    let view = found(view, session_id)?;

    QUIZ_SESSIONS_TOTAL.with_label_values(&["retake"]).inc();
    Ok(Json(view))
}

/// POST /api/v1/sessions/{id}/logout - Forget the user, keep everyone's history
pub async fn logout(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    let view = state
        .sessions
        .update(session_id, Utc::now(), |session| {
            session.logout();
            session.view()
        })
        .await;
    let view = found(view, session_id)?;

    QUIZ_SESSIONS_TOTAL.with_label_values(&["logout"]).inc();
    Ok(Json(view))
}

/// DELETE /api/v1/sessions/{id}
pub async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if state.sessions.remove(session_id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::SessionNotFound(session_id))
    }
}

fn render(
    session: &mut QuizSession,
    history: &mut AttemptHistory,
    now: DateTime<Utc>,
) -> Result<SessionView, TransitionError> {
    match session.state() {
        QuizState::Feedback => {
            session.confirm_feedback()?;
        }
        QuizState::Completed => {
            session.finalize_and_record(history, now)?;
        }
        QuizState::AwaitingUser | QuizState::UserIdentified | QuizState::InProgress => {}
    }
    session.view()
}

fn results_response(session: &QuizSession, outcome: RecordOutcome) -> ResultsResponse {
    let attempt = session.attempt();
    let percentage = attempt.percentage();

    ResultsResponse {
        display_name: session
            .user()
            .map(|user| user.display_name().to_string())
            .unwrap_or_default(),
        score: attempt.score(),
        total_questions: attempt.total_questions(),
        percentage,
        band: PerformanceBand::for_percentage(percentage),
        summary: results::aggregate(attempt.answers()),
        incorrect_answers: results::incorrect_answers(attempt.answers()),
        saved: outcome == RecordOutcome::Saved,
    }
}

fn found<T>(result: Option<Result<T, TransitionError>>, session_id: Uuid) -> Result<T, ApiError> {
    result
        .ok_or(ApiError::SessionNotFound(session_id))?
        .map_err(ApiError::from)
}
