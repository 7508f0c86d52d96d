use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

pub mod answer;
pub mod attempt;
pub mod question;
pub mod user;

use answer::FeedbackView;
use question::QuestionView;
use user::UserSummary;

/// Screens of a quiz session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuizState {
    AwaitingUser,
    UserIdentified,
    InProgress,
    Feedback,
    Completed,
}

impl QuizState {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuizState::AwaitingUser => "awaiting_user",
            QuizState::UserIdentified => "user_identified",
            QuizState::InProgress => "in_progress",
            QuizState::Feedback => "feedback",
            QuizState::Completed => "completed",
        }
    }
}

impl std::fmt::Display for QuizState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    Assistant,
    User,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChatRequest {
    #[validate(length(min = 1, max = 500))]
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct CreateSessionResponse {
    pub session_id: Uuid,
    pub state: QuizState,
    pub created_at: DateTime<Utc>,
}

/// Everything a front end needs to draw the current screen.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session_id: Uuid,
    pub state: QuizState,
    pub user: Option<UserSummary>,
    pub question: Option<QuestionView>,
    pub feedback: Option<FeedbackView>,
    pub score: usize,
    pub answered: usize,
    pub total_questions: usize,
    pub messages: Vec<ChatMessage>,
}
