use std::collections::HashSet;
use std::path::Path;

use thiserror::Error;

use crate::models::question::{Difficulty, Question};

const BUILTIN_QUESTIONS: &str = include_str!("../../data/questions.json");

#[derive(Debug, Error)]
pub enum QuestionBankError {
    #[error("failed to read question bank {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse question bank: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("duplicate question id {0}")]
    DuplicateId(u32),
    #[error("question {0} has no options")]
    NoOptions(u32),
    #[error("question {id} lists option {option:?} more than once")]
    DuplicateOption { id: u32, option: String },
    #[error("question {id}: correct answer {correct_answer:?} is not one of its options")]
    CorrectAnswerNotAnOption { id: u32, correct_answer: String },
}

/// Read-only set of questions, validated once at load.
#[derive(Debug, Clone)]
pub struct QuestionBank {
    questions: Vec<Question>,
}

impl QuestionBank {
    pub fn new(questions: Vec<Question>) -> Result<Self, QuestionBankError> {
        let mut ids = HashSet::with_capacity(questions.len());
        for question in &questions {
            if !ids.insert(question.id) {
                return Err(QuestionBankError::DuplicateId(question.id));
            }
            if question.options.is_empty() {
                return Err(QuestionBankError::NoOptions(question.id));
            }
            let mut seen = HashSet::with_capacity(question.options.len());
            for option in &question.options {
                if !seen.insert(option.as_str()) {
                    return Err(QuestionBankError::DuplicateOption {
                        id: question.id,
                        option: option.clone(),
                    });
                }
            }
            if !question.has_option(&question.correct_answer) {
                return Err(QuestionBankError::CorrectAnswerNotAnOption {
                    id: question.id,
                    correct_answer: question.correct_answer.clone(),
                });
            }
        }

        Ok(Self { questions })
    }

    /// The bundled Git & GitLab question set.
    pub fn builtin() -> Result<Self, QuestionBankError> {
        Self::from_json(BUILTIN_QUESTIONS)
    }

    pub fn from_json(raw: &str) -> Result<Self, QuestionBankError> {
        let questions: Vec<Question> = serde_json::from_str(raw)?;
        Self::new(questions)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, QuestionBankError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| QuestionBankError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&raw)
    }

    /// Loads from `path` when given, the bundled set otherwise.
    pub fn load(path: Option<&str>) -> Result<Self, QuestionBankError> {
        match path {
            Some(path) => {
                tracing::info!("Loading question bank from {}", path);
                Self::from_path(path)
            }
            None => Self::builtin(),
        }
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn with_difficulty(&self, difficulty: Difficulty) -> impl Iterator<Item = &Question> {
        self.questions
            .iter()
            .filter(move |question| question.difficulty == difficulty)
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}
