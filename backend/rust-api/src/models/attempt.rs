use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::answer::Answer;
use super::question::Difficulty;

/// Snapshot of a finished attempt, appended to the user's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedAttemptRecord {
    pub timestamp: DateTime<Utc>,
    pub score: usize,
    pub total_questions: usize,
    pub percentage: f64,
    pub answers: Vec<Answer>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BucketStats {
    pub correct_count: usize,
    pub total_count: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultsSummary {
    pub by_topic: BTreeMap<String, BucketStats>,
    /// Keyed by `Difficulty`, so iteration follows Low, Medium, High.
    pub by_difficulty: BTreeMap<Difficulty, BucketStats>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceBand {
    Excellent,
    Good,
    NeedsImprovement,
}

impl PerformanceBand {
    pub fn for_percentage(percentage: f64) -> Self {
        if percentage >= 80.0 {
            PerformanceBand::Excellent
        } else if percentage >= 60.0 {
            PerformanceBand::Good
        } else {
            PerformanceBand::NeedsImprovement
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ResultsResponse {
    pub display_name: String,
    pub score: usize,
    pub total_questions: usize,
    pub percentage: f64,
    pub band: PerformanceBand,
    pub summary: ResultsSummary,
    pub incorrect_answers: Vec<Answer>,
    /// True when this request appended the attempt to history.
    pub saved: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub attempt_number: usize,
    pub timestamp: DateTime<Utc>,
    pub score: usize,
    pub total_questions: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryResponse {
    pub user_id: u64,
    /// Newest first.
    pub attempts: Vec<HistoryEntry>,
}
