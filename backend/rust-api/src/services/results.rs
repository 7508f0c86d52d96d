use crate::models::answer::Answer;
use crate::models::attempt::{BucketStats, ResultsSummary};
use crate::models::question::Difficulty;

pub fn percentage(correct: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        correct as f64 * 100.0 / total as f64
    }
}

impl BucketStats {
    fn add(&mut self, is_correct: bool) {
        self.total_count += 1;
        if is_correct {
            self.correct_count += 1;
        }
        self.percentage = percentage(self.correct_count, self.total_count);
    }
}

/// Per-topic and per-difficulty correctness. Every difficulty level is
/// present, empty ones at 0%.
pub fn aggregate(answers: &[Answer]) -> ResultsSummary {
    let mut summary = ResultsSummary::default();
    for difficulty in Difficulty::ALL {
        summary
            .by_difficulty
            .insert(difficulty, BucketStats::default());
    }

    for answer in answers {
        summary
            .by_topic
            .entry(answer.topic.clone())
            .or_default()
            .add(answer.is_correct);
        summary
            .by_difficulty
            .entry(answer.difficulty)
            .or_default()
            .add(answer.is_correct);
    }

    summary
}

pub fn incorrect_answers(answers: &[Answer]) -> Vec<Answer> {
    answers
        .iter()
        .filter(|answer| !answer.is_correct)
        .cloned()
        .collect()
}
