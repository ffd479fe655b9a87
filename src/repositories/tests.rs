use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::Test;
use crate::db::types::QuestionLevel;

pub const TEST_COLUMNS: &str = "\
    id, title, topic_id, course_id, level, time_limit_minutes, is_public, created_by, \
    created_at, updated_at";

pub struct CreateTest<'a> {
    pub id: &'a str,
    pub title: &'a str,
    pub topic_id: Option<&'a str>,
    pub course_id: Option<&'a str>,
    pub level: QuestionLevel,
    pub time_limit_minutes: i32,
    pub is_public: bool,
    pub created_by: Option<&'a str>,
    pub now: PrimitiveDateTime,
}

pub async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateTest<'_>,
) -> Result<Test, sqlx::Error> {
    sqlx::query_as::<_, Test>(&format!(
        "INSERT INTO tests (
            id, title, topic_id, course_id, level, time_limit_minutes, is_public,
            created_by, created_at, updated_at
         ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10)
         RETURNING {TEST_COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.title)
    .bind(params.topic_id)
    .bind(params.course_id)
    .bind(params.level)
    .bind(params.time_limit_minutes)
    .bind(params.is_public)
    .bind(params.created_by)
    .bind(params.now)
    .bind(params.now)
    .fetch_one(executor)
    .await
}

pub async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Test>, sqlx::Error> {
    sqlx::query_as::<_, Test>(&format!("SELECT {TEST_COLUMNS} FROM tests WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn find_by_course(pool: &PgPool, course_id: &str) -> Result<Option<Test>, sqlx::Error> {
    sqlx::query_as::<_, Test>(&format!("SELECT {TEST_COLUMNS} FROM tests WHERE course_id = $1"))
        .bind(course_id)
        .fetch_optional(pool)
        .await
}

pub async fn list_public(
    pool: &PgPool,
    skip: i64,
    limit: i64,
) -> Result<Vec<Test>, sqlx::Error> {
    sqlx::query_as::<_, Test>(&format!(
        "SELECT {TEST_COLUMNS} FROM tests
         WHERE is_public = TRUE
         ORDER BY created_at DESC
         OFFSET $1
         LIMIT $2"
    ))
    .bind(skip.max(0))
    .bind(limit.clamp(1, 1000))
    .fetch_all(pool)
    .await
}
