use std::sync::Arc;

use anyhow::Context;
use tokio::sync::RwLock;

use crate::config::Config;
use crate::models::question::Question;

pub mod history;
pub mod identity;
pub mod question_bank;
pub mod quiz_session;
pub mod results;
pub mod selector;
pub mod session_store;

use history::AttemptHistory;
use identity::{GitLabIdentityProvider, IdentityProvider};
use question_bank::QuestionBank;
use session_store::SessionStore;

pub struct AppState {
    pub config: Config,
    pub bank: QuestionBank,
    pub identity: Arc<dyn IdentityProvider>,
    pub sessions: SessionStore,
    /// Completed attempts of every user seen by this process.
    pub history: RwLock<AttemptHistory>,
}

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let bank = QuestionBank::load(config.quiz.question_bank_path.as_deref())
            .context("Failed to load question bank")?;
        tracing::info!("Question bank loaded with {} questions", bank.len());

        let identity = Arc::new(GitLabIdentityProvider::new(&config.identity));
        if !identity.is_configured() {
            tracing::warn!("GitLab token missing; /identify will report a configuration error");
        }

        Ok(Self::with_parts(config, bank, identity))
    }

    pub fn with_parts(
        config: Config,
        bank: QuestionBank,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        let sessions = SessionStore::new(seconds(config.quiz.session_ttl_secs));
        let history = AttemptHistory::new(seconds(config.quiz.save_debounce_secs));

        Self {
            config,
            bank,
            identity,
            sessions,
            history: RwLock::new(history),
        }
    }

    /// A fresh stratified draw for one attempt.
    pub fn draw_questions(&self) -> Vec<Question> {
        selector::select(
            &self.bank,
            self.config.quiz.question_count,
            &mut rand::rng(),
        )
    }
}

/// Saturates instead of panicking on values `Config::load` would have rejected.
fn seconds(secs: i64) -> chrono::Duration {
    chrono::Duration::try_seconds(secs).unwrap_or(chrono::Duration::MAX)
}
