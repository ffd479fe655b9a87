use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::Topic;

pub const TOPIC_COLUMNS: &str = "id, title, description, created_at, updated_at";

pub struct CreateTopic<'a> {
    pub id: &'a str,
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub now: PrimitiveDateTime,
}

pub async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateTopic<'_>,
) -> Result<Topic, sqlx::Error> {
    sqlx::query_as::<_, Topic>(&format!(
        "INSERT INTO topics (id, title, description, created_at, updated_at)
         VALUES ($1,$2,$3,$4,$5)
         RETURNING {TOPIC_COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.title)
    .bind(params.description)
    .bind(params.now)
    .bind(params.now)
    .fetch_one(executor)
    .await
}

pub async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Topic>, sqlx::Error> {
    sqlx::query_as::<_, Topic>(&format!("SELECT {TOPIC_COLUMNS} FROM topics WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn list(pool: &PgPool) -> Result<Vec<Topic>, sqlx::Error> {
    sqlx::query_as::<_, Topic>(&format!("SELECT {TOPIC_COLUMNS} FROM topics ORDER BY title"))
        .fetch_all(pool)
        .await
}

pub async fn update_details(
    pool: &PgPool,
    id: &str,
    title: &str,
    description: Option<&str>,
    now: PrimitiveDateTime,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE topics SET title = $1, description = $2, updated_at = $3 WHERE id = $4",
    )
    .bind(title)
    .bind(description)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}
