use sqlx::{PgPool, Postgres, QueryBuilder};
use time::PrimitiveDateTime;

use crate::db::models::{AttemptResult, TestAttempt};
use crate::db::types::{AttemptStatus, QuestionLevel};

pub const ATTEMPT_COLUMNS: &str = "\
    id, student_id, status, test_id, topic_id, level, is_practice, time_limit_minutes, \
    started_at, completed_at, total_score, feedback, created_at, updated_at";

pub const RESULT_COLUMNS: &str = "\
    id, attempt_id, question_id, selected_option_id, response_text, scored_marks, ai_comment, \
    created_at, updated_at";

pub struct CreateAttempt<'a> {
    pub id: &'a str,
    pub student_id: &'a str,
    pub test_id: Option<&'a str>,
    pub topic_id: Option<&'a str>,
    pub level: QuestionLevel,
    pub is_practice: bool,
    pub time_limit_minutes: Option<i32>,
    pub now: PrimitiveDateTime,
}

/// Serializes record-answer and submit against the same attempt for the
/// duration of the surrounding transaction.
pub async fn acquire_attempt_lock(
    executor: impl sqlx::PgExecutor<'_>,
    attempt_id: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind(attempt_id)
        .execute(executor)
        .await?;
    Ok(())
}

pub async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateAttempt<'_>,
) -> Result<TestAttempt, sqlx::Error> {
    sqlx::query_as::<_, TestAttempt>(&format!(
        "INSERT INTO test_attempts (
            id, student_id, status, test_id, topic_id, level, is_practice,
            time_limit_minutes, started_at, total_score, feedback, created_at, updated_at
         ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,0,'',$10,$11)
         RETURNING {ATTEMPT_COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.student_id)
    .bind(AttemptStatus::InProgress)
    .bind(params.test_id)
    .bind(params.topic_id)
    .bind(params.level)
    .bind(params.is_practice)
    .bind(params.time_limit_minutes)
    .bind(params.now)
    .bind(params.now)
    .bind(params.now)
    .fetch_one(executor)
    .await
}

pub async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<TestAttempt>, sqlx::Error> {
    sqlx::query_as::<_, TestAttempt>(&format!(
        "SELECT {ATTEMPT_COLUMNS} FROM test_attempts WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub async fn insert_selected_questions(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    attempt_id: &str,
    question_ids: &[String],
) -> Result<(), sqlx::Error> {
    for (order_index, question_id) in question_ids.iter().enumerate() {
        sqlx::query(
            "INSERT INTO attempt_questions (attempt_id, question_id, order_index)
             VALUES ($1,$2,$3)",
        )
        .bind(attempt_id)
        .bind(question_id)
        .bind(order_index as i32)
        .execute(&mut **tx)
        .await?;
    }

    Ok(())
}

/// Snapshot question ids in their assigned order.
pub async fn selected_question_ids(
    executor: impl sqlx::PgExecutor<'_>,
    attempt_id: &str,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT question_id FROM attempt_questions WHERE attempt_id = $1 ORDER BY order_index",
    )
    .bind(attempt_id)
    .fetch_all(executor)
    .await
}

pub async fn has_selected_questions(
    executor: impl sqlx::PgExecutor<'_>,
    attempt_id: &str,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM attempt_questions WHERE attempt_id = $1)")
        .bind(attempt_id)
        .fetch_one(executor)
        .await
}

/// Question ids the student has already seen in prior practice attempts
/// for the same topic and level.
pub async fn practice_seen_question_ids(
    pool: &PgPool,
    student_id: &str,
    topic_id: &str,
    level: QuestionLevel,
    exclude_attempt_id: Option<&str>,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT DISTINCT aq.question_id
         FROM attempt_questions aq
         JOIN test_attempts ta ON ta.id = aq.attempt_id
         WHERE ta.student_id = $1
           AND ta.is_practice = TRUE
           AND ta.topic_id = $2
           AND ta.level = $3
           AND ($4::varchar IS NULL OR ta.id <> $4)",
    )
    .bind(student_id)
    .bind(topic_id)
    .bind(level)
    .bind(exclude_attempt_id)
    .fetch_all(pool)
    .await
}

pub struct UpsertAnswer<'a> {
    pub id: &'a str,
    pub attempt_id: &'a str,
    pub question_id: &'a str,
    pub selected_option_id: Option<&'a str>,
    pub response_text: Option<&'a str>,
    pub now: PrimitiveDateTime,
}

/// Record or replace the student's answer for one question of an
/// in-progress attempt.
pub async fn upsert_answer(
    executor: impl sqlx::PgExecutor<'_>,
    params: UpsertAnswer<'_>,
) -> Result<AttemptResult, sqlx::Error> {
    sqlx::query_as::<_, AttemptResult>(&format!(
        "INSERT INTO attempt_results (
            id, attempt_id, question_id, selected_option_id, response_text,
            scored_marks, ai_comment, created_at, updated_at
         ) VALUES ($1,$2,$3,$4,$5,0,NULL,$6,$7)
         ON CONFLICT (attempt_id, question_id) DO UPDATE
         SET selected_option_id = EXCLUDED.selected_option_id,
             response_text = EXCLUDED.response_text,
             updated_at = EXCLUDED.updated_at
         RETURNING {RESULT_COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.attempt_id)
    .bind(params.question_id)
    .bind(params.selected_option_id)
    .bind(params.response_text)
    .bind(params.now)
    .bind(params.now)
    .fetch_one(executor)
    .await
}

pub struct ScoredResult<'a> {
    pub id: &'a str,
    pub attempt_id: &'a str,
    pub question_id: &'a str,
    pub scored_marks: f64,
    pub ai_comment: Option<&'a str>,
    pub now: PrimitiveDateTime,
}

/// Scoring write used by submit: updates the student's recorded answer, or
/// creates the zero-answer placeholder row for unanswered questions.
pub async fn upsert_score(
    executor: impl sqlx::PgExecutor<'_>,
    params: ScoredResult<'_>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO attempt_results (
            id, attempt_id, question_id, selected_option_id, response_text,
            scored_marks, ai_comment, created_at, updated_at
         ) VALUES ($1,$2,$3,NULL,NULL,$4,$5,$6,$7)
         ON CONFLICT (attempt_id, question_id) DO UPDATE
         SET scored_marks = EXCLUDED.scored_marks,
             ai_comment = EXCLUDED.ai_comment,
             updated_at = EXCLUDED.updated_at",
    )
    .bind(params.id)
    .bind(params.attempt_id)
    .bind(params.question_id)
    .bind(params.scored_marks)
    .bind(params.ai_comment)
    .bind(params.now)
    .bind(params.now)
    .execute(executor)
    .await?;

    Ok(())
}

pub async fn results_for_attempt(
    executor: impl sqlx::PgExecutor<'_>,
    attempt_id: &str,
) -> Result<Vec<AttemptResult>, sqlx::Error> {
    sqlx::query_as::<_, AttemptResult>(&format!(
        "SELECT {RESULT_COLUMNS} FROM attempt_results WHERE attempt_id = $1 ORDER BY created_at"
    ))
    .bind(attempt_id)
    .fetch_all(executor)
    .await
}

/// The submit serialization point: flips the status and stamps the
/// completion time. Returns false when the attempt was already terminal.
pub async fn mark_submitted(
    executor: impl sqlx::PgExecutor<'_>,
    attempt_id: &str,
    now: PrimitiveDateTime,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE test_attempts
         SET status = $1, completed_at = $2, updated_at = $2
         WHERE id = $3 AND status = $4",
    )
    .bind(AttemptStatus::Submitted)
    .bind(now)
    .bind(attempt_id)
    .bind(AttemptStatus::InProgress)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn finalize_scores(
    executor: impl sqlx::PgExecutor<'_>,
    attempt_id: &str,
    total_score: f64,
    feedback: &str,
    now: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE test_attempts SET total_score = $1, feedback = $2, updated_at = $3 WHERE id = $4",
    )
    .bind(total_score)
    .bind(feedback)
    .bind(now)
    .bind(attempt_id)
    .execute(executor)
    .await?;

    Ok(())
}

#[derive(Debug, sqlx::FromRow)]
pub struct AttemptSummaryRow {
    pub id: String,
    pub student_id: String,
    pub status: AttemptStatus,
    pub test_id: Option<String>,
    pub topic_id: Option<String>,
    pub level: QuestionLevel,
    pub is_practice: bool,
    pub started_at: PrimitiveDateTime,
    pub completed_at: Option<PrimitiveDateTime>,
    pub total_score: f64,
    pub total_count: i64,
}

pub struct ListAttemptsParams {
    /// Restrict to one student; `None` lists every student (admin scope).
    pub student_id: Option<String>,
    pub skip: i64,
    pub limit: i64,
}

pub async fn list(
    pool: &PgPool,
    params: ListAttemptsParams,
) -> Result<Vec<AttemptSummaryRow>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(
        "SELECT id, student_id, status, test_id, topic_id, level, is_practice, \
         started_at, completed_at, total_score, COUNT(*) OVER() AS total_count \
         FROM test_attempts",
    );

    if let Some(student_id) = &params.student_id {
        builder.push(" WHERE student_id = ");
        builder.push_bind(student_id.clone());
    }

    builder.push(" ORDER BY started_at DESC OFFSET ");
    builder.push_bind(params.skip.max(0));
    builder.push(" LIMIT ");
    builder.push_bind(params.limit.clamp(1, 1000));

    builder.build_query_as::<AttemptSummaryRow>().fetch_all(pool).await
}
