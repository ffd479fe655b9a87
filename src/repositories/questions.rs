use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::{Question, QuestionOption};
use crate::db::types::{QuestionKind, QuestionLevel};

pub const QUESTION_COLUMNS: &str = "\
    id, topic_id, question_text, level, kind, marks, reference_answer, created_at, updated_at";

pub const OPTION_COLUMNS: &str = "id, question_id, option_text, is_correct";

pub struct CreateQuestion<'a> {
    pub id: &'a str,
    pub topic_id: &'a str,
    pub question_text: &'a str,
    pub level: QuestionLevel,
    pub kind: QuestionKind,
    pub marks: f64,
    pub reference_answer: Option<&'a str>,
    pub now: PrimitiveDateTime,
}

pub async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateQuestion<'_>,
) -> Result<Question, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "INSERT INTO questions (
            id, topic_id, question_text, level, kind, marks, reference_answer,
            created_at, updated_at
         ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9)
         RETURNING {QUESTION_COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.topic_id)
    .bind(params.question_text)
    .bind(params.level)
    .bind(params.kind)
    .bind(params.marks)
    .bind(params.reference_answer)
    .bind(params.now)
    .bind(params.now)
    .fetch_one(executor)
    .await
}

pub async fn insert_option(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    question_id: &str,
    option_text: &str,
    is_correct: bool,
) -> Result<QuestionOption, sqlx::Error> {
    sqlx::query_as::<_, QuestionOption>(&format!(
        "INSERT INTO question_options (id, question_id, option_text, is_correct)
         VALUES ($1,$2,$3,$4)
         RETURNING {OPTION_COLUMNS}"
    ))
    .bind(id)
    .bind(question_id)
    .bind(option_text)
    .bind(is_correct)
    .fetch_one(executor)
    .await
}

pub async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "SELECT {QUESTION_COLUMNS} FROM questions WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Candidate pool for a practice attempt or a topic-bound formal test.
pub async fn list_by_topic_level(
    pool: &PgPool,
    topic_id: &str,
    level: QuestionLevel,
) -> Result<Vec<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "SELECT {QUESTION_COLUMNS} FROM questions WHERE topic_id = $1 AND level = $2 ORDER BY id"
    ))
    .bind(topic_id)
    .bind(level)
    .fetch_all(pool)
    .await
}

/// Candidate pool for a course-bound formal test: every topic of the
/// course at the derived level.
pub async fn list_by_topics_level(
    pool: &PgPool,
    topic_ids: &[String],
    level: QuestionLevel,
) -> Result<Vec<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "SELECT {QUESTION_COLUMNS} FROM questions
         WHERE topic_id = ANY($1) AND level = $2
         ORDER BY id"
    ))
    .bind(topic_ids)
    .bind(level)
    .fetch_all(pool)
    .await
}

pub async fn list_by_ids(pool: &PgPool, ids: &[String]) -> Result<Vec<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "SELECT {QUESTION_COLUMNS} FROM questions WHERE id = ANY($1)"
    ))
    .bind(ids)
    .fetch_all(pool)
    .await
}

pub async fn options_for_questions(
    pool: &PgPool,
    question_ids: &[String],
) -> Result<Vec<QuestionOption>, sqlx::Error> {
    sqlx::query_as::<_, QuestionOption>(&format!(
        "SELECT {OPTION_COLUMNS} FROM question_options
         WHERE question_id = ANY($1)
         ORDER BY question_id, id"
    ))
    .bind(question_ids)
    .fetch_all(pool)
    .await
}
