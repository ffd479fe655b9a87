use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::db::models::{Question, QuestionOption};
use crate::db::types::{QuestionKind, QuestionLevel};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct OptionInput {
    #[validate(length(min = 1, max = 255, message = "option_text must be 1..255 characters"))]
    pub option_text: String,
    #[serde(default)]
    pub is_correct: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    pub topic_id: String,
    #[validate(length(min = 1, message = "question_text must not be empty"))]
    pub question_text: String,
    pub level: QuestionLevel,
    pub kind: QuestionKind,
    #[validate(range(min = 0.5, max = 100.0, message = "marks must be in range 0.5..100"))]
    pub marks: f64,
    #[serde(default)]
    #[validate(nested)]
    pub options: Vec<OptionInput>,
    #[serde(default)]
    pub reference_answer: Option<String>,
}

/// Authoring/admin view: includes the correct-answer flag.
#[derive(Debug, Serialize)]
pub struct QuestionResponse {
    pub id: String,
    pub topic_id: String,
    pub question_text: String,
    pub level: QuestionLevel,
    pub kind: QuestionKind,
    pub marks: f64,
    pub reference_answer: Option<String>,
    pub options: Vec<OptionResponse>,
}

#[derive(Debug, Serialize)]
pub struct OptionResponse {
    pub id: String,
    pub option_text: String,
    pub is_correct: bool,
}

/// Student view inside an attempt: options never reveal which one is
/// correct.
#[derive(Debug, Serialize)]
pub struct AttemptQuestionView {
    pub id: String,
    pub topic_id: String,
    pub question_text: String,
    pub level: QuestionLevel,
    pub kind: QuestionKind,
    pub marks: f64,
    pub options: Vec<AttemptOptionView>,
}

#[derive(Debug, Serialize)]
pub struct AttemptOptionView {
    pub id: String,
    pub option_text: String,
}

impl QuestionResponse {
    pub fn from_parts(question: Question, options: Vec<QuestionOption>) -> Self {
        Self {
            id: question.id,
            topic_id: question.topic_id,
            question_text: question.question_text,
            level: question.level,
            kind: question.kind,
            marks: question.marks,
            reference_answer: question.reference_answer,
            options: options
                .into_iter()
                .map(|option| OptionResponse {
                    id: option.id,
                    option_text: option.option_text,
                    is_correct: option.is_correct,
                })
                .collect(),
        }
    }
}

impl AttemptQuestionView {
    pub fn from_parts(question: &Question, options: &[QuestionOption]) -> Self {
        Self {
            id: question.id.clone(),
            topic_id: question.topic_id.clone(),
            question_text: question.question_text.clone(),
            level: question.level,
            kind: question.kind,
            marks: question.marks,
            options: options
                .iter()
                .filter(|option| option.question_id == question.id)
                .map(|option| AttemptOptionView {
                    id: option.id.clone(),
                    option_text: option.option_text.clone(),
                })
                .collect(),
        }
    }
}
