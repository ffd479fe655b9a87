use serde::{Deserialize, Serialize};
use sqlx::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "questionlevel", rename_all = "lowercase")]
pub enum QuestionLevel {
    Basic,
    Medium,
    Hard,
}

impl QuestionLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }
}

/// Difficulty of a course as reported by the course collaborator. Not a
/// database type here; it only exists to derive the question level of a
/// course-bound test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CourseLevel {
    Beginner,
    Intermediate,
    Advanced,
}

impl CourseLevel {
    /// Fixed mapping from course difficulty to question level.
    pub fn question_level(self) -> QuestionLevel {
        match self {
            Self::Beginner => QuestionLevel::Basic,
            Self::Intermediate => QuestionLevel::Medium,
            Self::Advanced => QuestionLevel::Hard,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "questionkind", rename_all = "snake_case")]
pub enum QuestionKind {
    MultipleChoice,
    FreeText,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "attemptstatus", rename_all = "snake_case")]
pub enum AttemptStatus {
    InProgress,
    Submitted,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn course_level_maps_to_question_level() {
        assert_eq!(CourseLevel::Beginner.question_level(), QuestionLevel::Basic);
        assert_eq!(CourseLevel::Intermediate.question_level(), QuestionLevel::Medium);
        assert_eq!(CourseLevel::Advanced.question_level(), QuestionLevel::Hard);
    }
}
