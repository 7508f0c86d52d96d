use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use crate::metrics::ATTEMPTS_RECORDED_TOTAL;
use crate::models::attempt::{CompletedAttemptRecord, HistoryEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Saved,
    /// Same score, total and answer count as the latest record, inside the
    /// debounce window. Treated as a re-render of an already saved attempt.
    Suppressed,
}

/// Completed attempts per user id. Lives for the process lifetime only.
///
/// The debounce window is a heuristic for refreshes of the results screen,
/// not a uniqueness guarantee: two genuinely different attempts with equal
/// scores finished within the window collapse into one record.
#[derive(Debug, Clone)]
pub struct AttemptHistory {
    by_user: HashMap<u64, Vec<CompletedAttemptRecord>>,
    debounce: Duration,
}

impl AttemptHistory {
    pub fn new(debounce: Duration) -> Self {
        Self {
            by_user: HashMap::new(),
            debounce,
        }
    }

    pub fn record(
        &mut self,
        user_id: u64,
        record: CompletedAttemptRecord,
        now: DateTime<Utc>,
    ) -> RecordOutcome {
        let attempts = self.by_user.entry(user_id).or_default();

        if let Some(last) = attempts.last() {
            let same_result = last.score == record.score
                && last.total_questions == record.total_questions
                && last.answers.len() == record.answers.len();
            if same_result && now - last.timestamp < self.debounce {
                tracing::debug!(user_id, "Duplicate attempt save suppressed");
                ATTEMPTS_RECORDED_TOTAL
                    .with_label_values(&["suppressed"])
                    .inc();
                return RecordOutcome::Suppressed;
            }
        }

        tracing::info!(
            user_id,
            score = record.score,
            total = record.total_questions,
            "Quiz attempt saved"
        );
        attempts.push(record);
        ATTEMPTS_RECORDED_TOTAL.with_label_values(&["saved"]).inc();
        RecordOutcome::Saved
    }

    /// Oldest first.
    pub fn attempts_for(&self, user_id: u64) -> &[CompletedAttemptRecord] {
        self.by_user
            .get(&user_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Newest first, numbered from the oldest attempt (1-based).
    pub fn entries_for(&self, user_id: u64) -> Vec<HistoryEntry> {
        let attempts = self.attempts_for(user_id);
        attempts
            .iter()
            .enumerate()
            .rev()
            .map(|(index, attempt)| HistoryEntry {
                attempt_number: index + 1,
                timestamp: attempt.timestamp,
                score: attempt.score,
                total_questions: attempt.total_questions,
                percentage: attempt.percentage,
            })
            .collect()
    }

    pub fn user_count(&self) -> usize {
        self.by_user.len()
    }
}
