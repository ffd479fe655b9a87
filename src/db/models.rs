use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::PrimitiveDateTime;

use crate::db::types::{AttemptStatus, QuestionKind, QuestionLevel};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Topic {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub created_at: PrimitiveDateTime,
    pub updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Question {
    pub id: String,
    pub topic_id: String,
    pub question_text: String,
    pub level: QuestionLevel,
    pub kind: QuestionKind,
    pub marks: f64,
    pub reference_answer: Option<String>,
    pub created_at: PrimitiveDateTime,
    pub updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct QuestionOption {
    pub id: String,
    pub question_id: String,
    pub option_text: String,
    pub is_correct: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Test {
    pub id: String,
    pub title: String,
    pub topic_id: Option<String>,
    pub course_id: Option<String>,
    pub level: QuestionLevel,
    pub time_limit_minutes: i32,
    pub is_public: bool,
    pub created_by: Option<String>,
    pub created_at: PrimitiveDateTime,
    pub updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TestAttempt {
    pub id: String,
    pub student_id: String,
    pub status: AttemptStatus,
    pub test_id: Option<String>,
    pub topic_id: Option<String>,
    pub level: QuestionLevel,
    pub is_practice: bool,
    pub time_limit_minutes: Option<i32>,
    pub started_at: PrimitiveDateTime,
    pub completed_at: Option<PrimitiveDateTime>,
    pub total_score: f64,
    pub feedback: String,
    pub created_at: PrimitiveDateTime,
    pub updated_at: PrimitiveDateTime,
}

impl TestAttempt {
    pub fn is_submitted(&self) -> bool {
        self.status == AttemptStatus::Submitted
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AttemptResult {
    pub id: String,
    pub attempt_id: String,
    pub question_id: String,
    pub selected_option_id: Option<String>,
    pub response_text: Option<String>,
    pub scored_marks: f64,
    pub ai_comment: Option<String>,
    pub created_at: PrimitiveDateTime,
    pub updated_at: PrimitiveDateTime,
}
