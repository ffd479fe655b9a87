//! Pure decision rules of the attempt lifecycle. The orchestration in
//! `services::attempts` stays thin by delegating every accept/reject
//! decision here, where the rules are unit-testable without a database.

use time::PrimitiveDateTime;

use crate::core::time::seconds_between;
use crate::db::types::{AttemptStatus, QuestionLevel};
use crate::error::{EngineError, Result};
use crate::services::scoring;

/// Resolved attempt configuration: a formal attempt bound to a test, or a
/// practice attempt configured directly by topic and level. Exactly one of
/// the two input shapes must be supplied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptConfig {
    Formal { test_id: String },
    Practice { topic_id: String, level: QuestionLevel },
}

pub fn resolve_config(
    test_id: Option<String>,
    topic_id: Option<String>,
    level: Option<QuestionLevel>,
) -> Result<AttemptConfig> {
    match (test_id, topic_id, level) {
        (Some(test_id), None, None) => Ok(AttemptConfig::Formal { test_id }),
        (None, Some(topic_id), Some(level)) => Ok(AttemptConfig::Practice { topic_id, level }),
        (Some(_), _, _) => Err(EngineError::Configuration(
            "cannot combine a test with practice parameters".to_string(),
        )),
        (None, Some(_), None) | (None, None, Some(_)) => Err(EngineError::Configuration(
            "practice attempts require both topic and level".to_string(),
        )),
        (None, None, None) => Err(EngineError::Configuration(
            "either a test or topic and level must be provided".to_string(),
        )),
    }
}

/// Every mutation of an attempt must pass this gate first.
pub fn ensure_in_progress(status: AttemptStatus) -> Result<()> {
    match status {
        AttemptStatus::InProgress => Ok(()),
        AttemptStatus::Submitted => Err(EngineError::AttemptAlreadySubmitted),
    }
}

/// Retake gate: formal attempts only, and only after a failed submission.
pub fn ensure_retake_allowed(
    is_practice: bool,
    status: AttemptStatus,
    score_percent: f64,
    passing_percent: f64,
) -> Result<()> {
    if is_practice {
        return Err(EngineError::RetakeNotAllowed(
            "practice attempts are recreated directly instead of retaken",
        ));
    }
    if status != AttemptStatus::Submitted {
        return Err(EngineError::RetakeNotAllowed("attempt has not been submitted yet"));
    }
    if scoring::is_passing(score_percent, passing_percent) {
        return Err(EngineError::RetakeNotAllowed("attempt already meets the passing score"));
    }
    Ok(())
}

/// Remaining time in minutes. `None` means unbounded: a missing or
/// non-positive limit, or an unknown start, is indeterminate rather than
/// expired.
pub fn time_remaining_minutes(
    time_limit_minutes: Option<i32>,
    started_at: Option<PrimitiveDateTime>,
    now: PrimitiveDateTime,
) -> Option<f64> {
    let limit = time_limit_minutes.filter(|minutes| *minutes > 0)?;
    let started = started_at?;
    let elapsed_minutes = seconds_between(started, now) as f64 / 60.0;
    Some((limit as f64 - elapsed_minutes).max(0.0))
}
