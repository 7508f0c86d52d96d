use std::collections::HashMap;

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::metrics::{ANSWERS_SUBMITTED_TOTAL, STATE_RESETS_TOTAL};
use crate::models::answer::{Answer, FeedbackView};
use crate::models::attempt::CompletedAttemptRecord;
use crate::models::question::{Question, QuestionView};
use crate::models::user::{UserRecord, UserSummary};
use crate::models::{ChatMessage, QuizState, SessionView};
use crate::services::history::{AttemptHistory, RecordOutcome};
use crate::services::results;

const START_KEYWORDS: [&str; 5] = ["start", "yes", "begin", "ok", "sure"];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("cannot {action} while the quiz is {state}")]
    InvalidTransition {
        action: &'static str,
        state: QuizState,
    },
    #[error("no quiz questions available, cannot start the quiz")]
    NoQuestions,
    #[error("{option:?} is not an option for question {question_id}")]
    InvalidOption { question_id: u32, option: String },
    #[error("inconsistent quiz state ({0}), the attempt was reset")]
    StateInconsistency(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedbackOutcome {
    pub question_id: u32,
    pub is_correct: bool,
    /// False when the answer for this question had already been recorded.
    pub newly_recorded: bool,
}

/// Questions, cursor and answers of the attempt in progress.
#[derive(Debug, Clone, Default)]
pub struct QuizAttempt {
    questions: Vec<Question>,
    cursor: usize,
    answers: Vec<Answer>,
    answer_positions: HashMap<u32, usize>,
    score: usize,
    pending_submission: Option<String>,
}

impl QuizAttempt {
    fn new(questions: Vec<Question>) -> Self {
        Self {
            questions,
            ..Self::default()
        }
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Answers in the order they were given.
    pub fn answers(&self) -> &[Answer] {
        &self.answers
    }

    pub fn answer_for(&self, question_id: u32) -> Option<&Answer> {
        self.answer_positions
            .get(&question_id)
            .and_then(|&position| self.answers.get(position))
    }

    pub fn score(&self) -> usize {
        self.score
    }

    pub fn pending_submission(&self) -> Option<&str> {
        self.pending_submission.as_deref()
    }

    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    pub fn percentage(&self) -> f64 {
        results::percentage(self.score, self.questions.len())
    }

    /// Appends `answer` unless its question already has one. Score moves only
    /// with a newly appended correct answer.
    fn record(&mut self, answer: Answer) -> bool {
        if self.answer_positions.contains_key(&answer.question_id) {
            return false;
        }
        if answer.is_correct {
            self.score += 1;
        }
        self.answer_positions
            .insert(answer.question_id, self.answers.len());
        self.answers.push(answer);
        debug_assert_eq!(
            self.score,
            self.answers.iter().filter(|a| a.is_correct).count()
        );
        true
    }
}

/// One browser session's quiz context. Every transition goes through here.
#[derive(Debug, Clone)]
pub struct QuizSession {
    id: Uuid,
    state: QuizState,
    user: Option<UserRecord>,
    attempt: QuizAttempt,
    messages: Vec<ChatMessage>,
    created_at: DateTime<Utc>,
    last_active_at: DateTime<Utc>,
}

impl QuizSession {
    pub fn new(id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id,
            state: QuizState::AwaitingUser,
            user: None,
            attempt: QuizAttempt::default(),
            messages: Vec::new(),
            created_at: now,
            last_active_at: now,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> QuizState {
        self.state
    }

    pub fn user(&self) -> Option<&UserRecord> {
        self.user.as_ref()
    }

    pub fn attempt(&self) -> &QuizAttempt {
        &self.attempt
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_active_at(&self) -> DateTime<Utc> {
        self.last_active_at
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_active_at = now;
    }

    pub fn identify(&mut self, user: UserRecord) -> Result<(), TransitionError> {
        self.expect_state(QuizState::AwaitingUser, "identify a user")?;

        self.messages = vec![ChatMessage::assistant(format!(
            "Hi {}! Ready to test your Git & GitLab knowledge? Type 'start quiz' or 'yes'.",
            user.display_name()
        ))];
        tracing::info!(session_id = %self.id, user_id = user.id, "User identified");
        self.user = Some(user);
        self.state = QuizState::UserIdentified;
        Ok(())
    }

    pub fn begin_attempt(&mut self, questions: Vec<Question>) -> Result<(), TransitionError> {
        self.expect_state(QuizState::UserIdentified, "start a quiz")?;
        if questions.is_empty() {
            tracing::error!(session_id = %self.id, "No questions drawn, quiz not started");
            return Err(TransitionError::NoQuestions);
        }

        tracing::info!(
            session_id = %self.id,
            questions = questions.len(),
            "Quiz attempt started"
        );
        self.attempt = QuizAttempt::new(questions);
        self.state = QuizState::InProgress;
        Ok(())
    }

    /// The question under the cursor. A cursor past the end resets the
    /// session to `UserIdentified` and reports the inconsistency.
    pub fn current_question(&mut self) -> Result<&Question, TransitionError> {
        let index = self.checked_cursor()?;
        Ok(&self.attempt.questions[index])
    }

    pub fn submit(&mut self, option: &str) -> Result<FeedbackOutcome, TransitionError> {
        self.expect_state(QuizState::InProgress, "submit an answer")?;
        let question = self.current_question()?;
        if !question.has_option(option) {
            return Err(TransitionError::InvalidOption {
                question_id: question.id,
                option: option.to_string(),
            });
        }

        self.attempt.pending_submission = Some(option.to_string());
        self.state = QuizState::Feedback;
        self.confirm_feedback()
    }

    /// Entry action of `Feedback`. Safe to run any number of times: the
    /// answer is recorded, and scored, only the first time.
    pub fn confirm_feedback(&mut self) -> Result<FeedbackOutcome, TransitionError> {
        self.expect_state(QuizState::Feedback, "confirm feedback")?;
        let Some(selected) = self.attempt.pending_submission.clone() else {
            return Err(self.force_reset("feedback without a submitted answer".to_string()));
        };

        let index = self.checked_cursor()?;
        let answer = Answer::for_question(&self.attempt.questions[index], &selected);
        let outcome = FeedbackOutcome {
            question_id: answer.question_id,
            is_correct: answer.is_correct,
            newly_recorded: self.attempt.record(answer),
        };

        if outcome.newly_recorded {
            ANSWERS_SUBMITTED_TOTAL
                .with_label_values(&[if outcome.is_correct { "true" } else { "false" }])
                .inc();
            tracing::debug!(
                session_id = %self.id,
                question_id = outcome.question_id,
                correct = outcome.is_correct,
                score = self.attempt.score,
                "Answer recorded"
            );
        }

        Ok(outcome)
    }

    pub fn advance(&mut self) -> Result<QuizState, TransitionError> {
        self.expect_state(QuizState::Feedback, "move to the next question")?;

        self.attempt.pending_submission = None;
        self.attempt.cursor += 1;
        self.state = if self.attempt.cursor >= self.attempt.questions.len() {
            tracing::info!(
                session_id = %self.id,
                score = self.attempt.score,
                total = self.attempt.questions.len(),
                "Quiz attempt completed"
            );
            QuizState::Completed
        } else {
            QuizState::InProgress
        };
        Ok(self.state)
    }

    /// Entry action of `Completed`: appends the attempt to the user's history
    /// unless the debounce in `AttemptHistory` recognises it as a repeat.
    pub fn finalize_and_record(
        &mut self,
        history: &mut AttemptHistory,
        now: DateTime<Utc>,
    ) -> Result<RecordOutcome, TransitionError> {
        self.expect_state(QuizState::Completed, "record results")?;
        let Some(user_id) = self.user.as_ref().map(|user| user.id) else {
            return Err(self.force_reset("completed attempt without a user".to_string()));
        };

        let record = self.completed_record(now);
        Ok(history.record(user_id, record, now))
    }

    pub fn completed_record(&self, now: DateTime<Utc>) -> CompletedAttemptRecord {
        CompletedAttemptRecord {
            timestamp: now,
            score: self.attempt.score,
            total_questions: self.attempt.total_questions(),
            percentage: self.attempt.percentage(),
            answers: self.attempt.answers.clone(),
        }
    }

    /// Starts over with the same user. History is untouched.
    pub fn retake(&mut self) -> Result<(), TransitionError> {
        self.expect_state(QuizState::Completed, "retake the quiz")?;

        self.attempt = QuizAttempt::default();
        self.state = QuizState::UserIdentified;
        let name = self
            .user
            .as_ref()
            .map(|user| user.display_name().to_string())
            .unwrap_or_default();
        self.messages = vec![ChatMessage::assistant(format!(
            "Hi {}! Ready for another round of the Git & GitLab Quiz?",
            name
        ))];
        tracing::info!(session_id = %self.id, "Quiz retake requested");
        Ok(())
    }

    /// Valid from any state. Clears identity and attempt; history lives outside
    /// the session and is untouched.
    pub fn logout(&mut self) {
        tracing::info!(session_id = %self.id, from = %self.state, "Session logged out");
        self.user = None;
        self.attempt = QuizAttempt::default();
        self.messages.clear();
        self.state = QuizState::AwaitingUser;
    }

    /// Handles a chat prompt on the welcome screen. Start keywords begin an
    /// attempt with the questions produced by `draw`.
    pub fn chat<F>(&mut self, prompt: &str, draw: F) -> Result<bool, TransitionError>
    where
        F: FnOnce() -> Vec<Question>,
    {
        self.expect_state(QuizState::UserIdentified, "chat")?;
        self.messages.push(ChatMessage::user(prompt));

        if !is_start_prompt(prompt) {
            self.messages.push(ChatMessage::assistant(
                "Okay, I'm here when you're ready. Just type 'start quiz'!",
            ));
            return Ok(false);
        }

        match self.begin_attempt(draw()) {
            Ok(()) => {
                self.messages.push(ChatMessage::assistant(
                    "Great! Starting the quiz now... Answer the questions as they appear below.",
                ));
                Ok(true)
            }
            Err(err) => {
                self.messages.push(ChatMessage::assistant(
                    "Failed to load quiz questions. Please try again or contact support.",
                ));
                Err(err)
            }
        }
    }

    /// Describes the current screen. Reading the question of an in-progress
    /// attempt may trip the cursor guard, which resets the session.
    pub fn view(&mut self) -> Result<SessionView, TransitionError> {
        let (question, feedback) = match self.state {
            QuizState::InProgress | QuizState::Feedback => {
                let total = self.attempt.total_questions();
                let index = self.checked_cursor()?;
                let question = &self.attempt.questions[index];
                let feedback = if self.state == QuizState::Feedback {
                    self.attempt.answer_for(question.id).map(FeedbackView::from)
                } else {
                    None
                };
                (
                    Some(QuestionView::from_question(question, index, total)),
                    feedback,
                )
            }
            _ => (None, None),
        };

        Ok(SessionView {
            session_id: self.id,
            state: self.state,
            user: self.user.as_ref().map(UserSummary::from),
            question,
            feedback,
            score: self.attempt.score,
            answered: self.attempt.answers.len(),
            total_questions: self.attempt.total_questions(),
            messages: self.messages.clone(),
        })
    }

    fn expect_state(
        &self,
        expected: QuizState,
        action: &'static str,
    ) -> Result<(), TransitionError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(TransitionError::InvalidTransition {
                action,
                state: self.state,
            })
        }
    }

    fn checked_cursor(&mut self) -> Result<usize, TransitionError> {
        let index = self.attempt.cursor;
        let total = self.attempt.questions.len();
        if index < total {
            Ok(index)
        } else {
            Err(self.force_reset(format!(
                "question index {} out of range for {} questions",
                index, total
            )))
        }
    }

    fn force_reset(&mut self, reason: String) -> TransitionError {
        tracing::warn!(session_id = %self.id, from = %self.state, "{}; resetting attempt", reason);
        STATE_RESETS_TOTAL.with_label_values(&[self.state.as_str()]).inc();

        self.attempt = QuizAttempt::default();
        self.state = if self.user.is_some() {
            QuizState::UserIdentified
        } else {
            QuizState::AwaitingUser
        };
        TransitionError::StateInconsistency(reason)
    }
}

pub fn is_start_prompt(prompt: &str) -> bool {
    let prompt = prompt.to_lowercase();
    START_KEYWORDS
        .iter()
        .any(|keyword| prompt.contains(keyword))
}
