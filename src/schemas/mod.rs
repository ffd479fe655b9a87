pub mod attempt;
pub mod question;
pub mod topic;

use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total_count: i64,
    pub skip: i64,
    pub limit: i64,
}

pub fn default_limit() -> i64 {
    50
}
