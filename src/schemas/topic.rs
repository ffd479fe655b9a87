use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::db::models::Topic;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTopicRequest {
    #[validate(length(min = 1, max = 255, message = "title must be 1..255 characters"))]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TopicResponse {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
}

impl From<Topic> for TopicResponse {
    fn from(topic: Topic) -> Self {
        Self { id: topic.id, title: topic.title, description: topic.description }
    }
}
