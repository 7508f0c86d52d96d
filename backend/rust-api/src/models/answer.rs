use serde::{Deserialize, Serialize};
use validator::Validate;

use super::question::{Difficulty, Question};

#[derive(Debug, Deserialize, Validate)]
pub struct SubmitAnswerRequest {
    #[validate(length(min = 1, message = "Please select an answer."))]
    pub option: String,
}

/// One recorded answer. Appended once per question and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub question_id: u32,
    pub question_text: String,
    pub selected_option: String,
    pub correct_answer: String,
    pub is_correct: bool,
    pub topic: String,
    pub difficulty: Difficulty,
    pub explanation: String,
    pub resource_link: Option<String>,
}

impl Answer {
    pub fn for_question(question: &Question, selected_option: &str) -> Self {
        Self {
            question_id: question.id,
            question_text: question.text.clone(),
            selected_option: selected_option.to_string(),
            correct_answer: question.correct_answer.clone(),
            is_correct: question.is_correct(selected_option),
            topic: question.topic.clone(),
            difficulty: question.difficulty,
            explanation: question.explanation.clone(),
            resource_link: question.resource_link.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackView {
    pub selected_option: String,
    pub is_correct: bool,
    pub correct_answer: String,
    pub explanation: String,
    pub resource_link: Option<String>,
}

impl From<&Answer> for FeedbackView {
    fn from(answer: &Answer) -> Self {
        Self {
            selected_option: answer.selected_option.clone(),
            is_correct: answer.is_correct,
            correct_answer: answer.correct_answer.clone(),
            explanation: answer.explanation.clone(),
            resource_link: answer.resource_link.clone(),
        }
    }
}
