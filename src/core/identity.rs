use serde::{Deserialize, Serialize};

/// Authenticated caller as supplied by the platform's identity
/// collaborator. The engine never authenticates; it only scopes queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: String,
    pub role: ActorRole,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActorRole {
    Student,
    Admin,
}

impl Identity {
    pub fn student(user_id: impl Into<String>) -> Self {
        Self { user_id: user_id.into(), role: ActorRole::Student }
    }

    pub fn admin(user_id: impl Into<String>) -> Self {
        Self { user_id: user_id.into(), role: ActorRole::Admin }
    }

    pub fn is_admin(&self) -> bool {
        self.role == ActorRole::Admin
    }

    /// Whether this identity may read the given attempt owner's data.
    pub fn can_view_attempts_of(&self, student_id: &str) -> bool {
        self.is_admin() || self.user_id == student_id
    }
}
