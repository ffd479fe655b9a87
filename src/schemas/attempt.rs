use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::{AttemptResult, TestAttempt};
use crate::db::types::{AttemptStatus, QuestionLevel};
use crate::repositories::attempts::AttemptSummaryRow;
use crate::schemas::question::AttemptQuestionView;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateAttemptRequest {
    /// Formal attempt against an authored test. Mutually exclusive with
    /// the practice parameters below.
    #[serde(default)]
    pub test_id: Option<String>,
    #[serde(default)]
    pub topic_id: Option<String>,
    #[serde(default)]
    pub level: Option<QuestionLevel>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RecordAnswerRequest {
    #[validate(length(min = 1, message = "question_id must not be empty"))]
    pub question_id: String,
    /// Chosen option for multiple-choice questions.
    #[serde(default)]
    pub selected_option_id: Option<String>,
    /// Free-text response for oracle-graded questions.
    #[serde(default)]
    pub response_text: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ResultResponse {
    pub question_id: String,
    pub selected_option_id: Option<String>,
    pub response_text: Option<String>,
    pub scored_marks: f64,
    pub ai_comment: Option<String>,
}

impl From<AttemptResult> for ResultResponse {
    fn from(result: AttemptResult) -> Self {
        Self {
            question_id: result.question_id,
            selected_option_id: result.selected_option_id,
            response_text: result.response_text,
            scored_marks: result.scored_marks,
            ai_comment: result.ai_comment,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AttemptSummaryResponse {
    pub id: String,
    pub student_id: String,
    pub status: AttemptStatus,
    pub is_practice: bool,
    pub test_id: Option<String>,
    pub topic_id: Option<String>,
    pub level: QuestionLevel,
    pub started_at: String,
    pub completed_at: Option<String>,
    pub total_score: f64,
}

impl From<AttemptSummaryRow> for AttemptSummaryResponse {
    fn from(row: AttemptSummaryRow) -> Self {
        Self {
            id: row.id,
            student_id: row.student_id,
            status: row.status,
            is_practice: row.is_practice,
            test_id: row.test_id,
            topic_id: row.topic_id,
            level: row.level,
            started_at: format_primitive(row.started_at),
            completed_at: row.completed_at.map(format_primitive),
            total_score: row.total_score,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AttemptDetailResponse {
    pub id: String,
    pub student_id: String,
    pub status: AttemptStatus,
    pub is_practice: bool,
    pub test_id: Option<String>,
    pub topic_id: Option<String>,
    pub level: QuestionLevel,
    pub time_limit_minutes: Option<i32>,
    /// `None` means unbounded, not expired.
    pub time_remaining_minutes: Option<f64>,
    pub started_at: String,
    pub completed_at: Option<String>,
    pub questions: Vec<AttemptQuestionView>,
    pub results: Vec<ResultResponse>,
    pub total_score: f64,
    pub total_possible: f64,
    pub score_percent: f64,
    /// Verdict of a submitted attempt; `None` while in progress.
    pub passed: Option<bool>,
    pub retake_available: bool,
    pub feedback: String,
}

impl AttemptDetailResponse {
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        attempt: TestAttempt,
        questions: Vec<AttemptQuestionView>,
        results: Vec<ResultResponse>,
        total_possible: f64,
        score_percent: f64,
        passed: Option<bool>,
        retake_available: bool,
        time_remaining_minutes: Option<f64>,
    ) -> Self {
        Self {
            id: attempt.id,
            student_id: attempt.student_id,
            status: attempt.status,
            is_practice: attempt.is_practice,
            test_id: attempt.test_id,
            topic_id: attempt.topic_id,
            level: attempt.level,
            time_limit_minutes: attempt.time_limit_minutes,
            time_remaining_minutes,
            started_at: format_primitive(attempt.started_at),
            completed_at: attempt.completed_at.map(format_primitive),
            questions,
            results,
            total_score: attempt.total_score,
            total_possible,
            score_percent,
            passed,
            retake_available,
            feedback: attempt.feedback,
        }
    }
}
