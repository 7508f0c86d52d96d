use serde::{Deserialize, Serialize};

/// Difficulty buckets. Declaration order is the display order (Low < Medium < High).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Difficulty {
    Low,
    Medium,
    High,
}

impl Difficulty {
    /// Priority order used when distributing selection shares.
    pub const ALL: [Difficulty; 3] = [Difficulty::Low, Difficulty::Medium, Difficulty::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Low => "Low",
            Difficulty::Medium => "Medium",
            Difficulty::High => "High",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: u32,
    pub topic: String,
    pub difficulty: Difficulty,
    pub text: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    pub explanation: String,
    #[serde(default)]
    pub resource_link: Option<String>,
}

impl Question {
    pub fn has_option(&self, option: &str) -> bool {
        self.options.iter().any(|candidate| candidate == option)
    }

    pub fn is_correct(&self, option: &str) -> bool {
        self.correct_answer == option
    }
}

/// Question as shown while it is still open; never carries the correct answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionView {
    pub id: u32,
    /// 1-based position within the attempt.
    pub number: usize,
    pub total: usize,
    pub topic: String,
    pub difficulty: Difficulty,
    pub text: String,
    pub options: Vec<String>,
}

impl QuestionView {
    pub fn from_question(question: &Question, index: usize, total: usize) -> Self {
        Self {
            id: question.id,
            number: index + 1,
            total,
            topic: question.topic.clone(),
            difficulty: question.difficulty,
            text: question.text.clone(),
            options: question.options.clone(),
        }
    }
}
