use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors surfaced to the caller of the assessment engine.
///
/// Oracle unavailability is intentionally absent: scoring degrades to a
/// zero score with a fallback comment inside the submit path and never
/// reaches the caller as an error.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Attempt or test created with both or neither of the two
    /// configuration modes, or with structurally invalid input.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// Formal selection found fewer questions than the attempt needs.
    #[error("not enough questions available: need {needed}, found {available}")]
    InsufficientQuestionPool { needed: usize, available: usize },

    /// Mutation attempted against a terminal attempt.
    #[error("attempt has already been submitted")]
    AttemptAlreadySubmitted,

    /// Retake requested for an attempt that does not qualify.
    #[error("retake not allowed: {0}")]
    RetakeNotAllowed(&'static str),

    #[error("{0} not found")]
    NotFound(&'static str),

    /// Identity scoping rejected the access.
    #[error("access denied")]
    Forbidden,

    /// Course collaborator failed to resolve a course profile.
    #[error("course lookup failed: {0}")]
    CourseLookup(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}
