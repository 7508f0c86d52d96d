use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::metrics::{QUIZ_SESSIONS_TOTAL, SESSIONS_ACTIVE};
use crate::services::quiz_session::QuizSession;

/// In-memory quiz sessions keyed by session id.
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, QuizSession>>,
    idle_ttl: Duration,
}

impl SessionStore {
    pub fn new(idle_ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            idle_ttl,
        }
    }

    pub async fn create(&self, now: DateTime<Utc>) -> (Uuid, DateTime<Utc>) {
        self.purge_idle(now).await;

        let id = Uuid::new_v4();
        let session = QuizSession::new(id, now);
        let created_at = session.created_at();
        self.sessions.write().await.insert(id, session);

        QUIZ_SESSIONS_TOTAL.with_label_values(&["created"]).inc();
        SESSIONS_ACTIVE.inc();
        tracing::info!(session_id = %id, "Quiz session created");
        (id, created_at)
    }

    /// Runs `f` on the session and marks it active. `None` when the id is unknown.
    pub async fn update<T, F>(&self, id: Uuid, now: DateTime<Utc>, f: F) -> Option<T>
    where
        F: FnOnce(&mut QuizSession) -> T,
    {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(&id)?;
        session.touch(now);
        Some(f(session))
    }

    /// Read-only access to a copy of the session.
    pub async fn snapshot(&self, id: Uuid) -> Option<QuizSession> {
        self.sessions.read().await.get(&id).cloned()
    }

    pub async fn remove(&self, id: Uuid) -> bool {
        let removed = self.sessions.write().await.remove(&id).is_some();
        if removed {
            QUIZ_SESSIONS_TOTAL.with_label_values(&["deleted"]).inc();
            SESSIONS_ACTIVE.dec();
        }
        removed
    }

    /// Drops sessions idle for longer than the TTL.
    pub async fn purge_idle(&self, now: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| now - session.last_active_at() < self.idle_ttl);
        let purged = before - sessions.len();

        if purged > 0 {
            SESSIONS_ACTIVE.sub(purged as i64);
            QUIZ_SESSIONS_TOTAL
                .with_label_values(&["expired"])
                .inc_by(purged as u64);
            tracing::info!("Purged {} idle quiz sessions", purged);
        }
        purged
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
