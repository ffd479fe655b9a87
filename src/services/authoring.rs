//! Admin-gated authoring seam. Topics and questions are supplied by the
//! authoring collaborator, but the structural invariants live here: an
//! objective question carries 2+ options with exactly one correct, a
//! free-text question carries a reference answer, and a course-bound test
//! back-fills its level from the course difficulty exactly once.

use uuid::Uuid;
use validator::Validate;

use crate::core::identity::Identity;
use crate::core::state::EngineState;
use crate::core::time::primitive_now_utc;
use crate::db::types::QuestionKind;
use crate::error::{EngineError, Result};
use crate::repositories;
use crate::schemas::question::{CreateQuestionRequest, QuestionResponse};
use crate::schemas::test::{CreateTestRequest, TestResponse};
use crate::schemas::topic::{CreateTopicRequest, TopicResponse};

fn require_admin(identity: &Identity) -> Result<()> {
    if identity.is_admin() {
        Ok(())
    } else {
        Err(EngineError::Forbidden)
    }
}

pub async fn create_topic(
    state: &EngineState,
    identity: &Identity,
    payload: CreateTopicRequest,
) -> Result<TopicResponse> {
    require_admin(identity)?;
    payload.validate().map_err(|err| EngineError::Configuration(err.to_string()))?;

    let now = primitive_now_utc();
    let topic_id = Uuid::new_v4().to_string();
    let topic = repositories::topics::create(
        state.db(),
        repositories::topics::CreateTopic {
            id: &topic_id,
            title: payload.title.trim(),
            description: payload.description.as_deref(),
            now,
        },
    )
    .await?;

    Ok(topic.into())
}

pub async fn update_topic(
    state: &EngineState,
    identity: &Identity,
    topic_id: &str,
    payload: CreateTopicRequest,
) -> Result<TopicResponse> {
    require_admin(identity)?;
    payload.validate().map_err(|err| EngineError::Configuration(err.to_string()))?;

    let updated = repositories::topics::update_details(
        state.db(),
        topic_id,
        payload.title.trim(),
        payload.description.as_deref(),
        primitive_now_utc(),
    )
    .await?;
    if !updated {
        return Err(EngineError::NotFound("topic"));
    }

    let topic = repositories::topics::find_by_id(state.db(), topic_id)
        .await?
        .ok_or(EngineError::NotFound("topic"))?;
    Ok(topic.into())
}

pub async fn list_topics(state: &EngineState) -> Result<Vec<TopicResponse>> {
    let rows = repositories::topics::list(state.db()).await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

pub async fn create_question(
    state: &EngineState,
    identity: &Identity,
    payload: CreateQuestionRequest,
) -> Result<QuestionResponse> {
    require_admin(identity)?;
    payload.validate().map_err(|err| EngineError::Configuration(err.to_string()))?;
    validate_question_shape(&payload)?;

    repositories::topics::find_by_id(state.db(), &payload.topic_id)
        .await?
        .ok_or(EngineError::NotFound("topic"))?;

    let now = primitive_now_utc();
    let question_id = Uuid::new_v4().to_string();

    let mut tx = state.db().begin().await?;
    let question = repositories::questions::create(
        &mut *tx,
        repositories::questions::CreateQuestion {
            id: &question_id,
            topic_id: &payload.topic_id,
            question_text: payload.question_text.trim(),
            level: payload.level,
            kind: payload.kind,
            marks: payload.marks,
            reference_answer: payload.reference_answer.as_deref(),
            now,
        },
    )
    .await?;

    let mut options = Vec::with_capacity(payload.options.len());
    for option in &payload.options {
        let option_id = Uuid::new_v4().to_string();
        let inserted = repositories::questions::insert_option(
            &mut *tx,
            &option_id,
            &question.id,
            option.option_text.trim(),
            option.is_correct,
        )
        .await?;
        options.push(inserted);
    }
    tx.commit().await?;

    Ok(QuestionResponse::from_parts(question, options))
}

fn validate_question_shape(payload: &CreateQuestionRequest) -> Result<()> {
    match payload.kind {
        QuestionKind::MultipleChoice => {
            if payload.options.len() < 2 {
                return Err(EngineError::Configuration(
                    "multiple-choice questions require at least 2 options".to_string(),
                ));
            }
            let correct = payload.options.iter().filter(|option| option.is_correct).count();
            if correct != 1 {
                return Err(EngineError::Configuration(
                    "exactly one option must be marked as correct".to_string(),
                ));
            }
            if payload.reference_answer.is_some() {
                return Err(EngineError::Configuration(
                    "multiple-choice questions must not carry a reference answer".to_string(),
                ));
            }
        }
        QuestionKind::FreeText => {
            if !payload.options.is_empty() {
                return Err(EngineError::Configuration(
                    "free-text questions must not carry options".to_string(),
                ));
            }
            if payload
                .reference_answer
                .as_deref()
                .map(str::trim)
                .filter(|answer| !answer.is_empty())
                .is_none()
            {
                return Err(EngineError::Configuration(
                    "free-text questions require a reference answer".to_string(),
                ));
            }
        }
    }
    Ok(())
}

pub async fn create_test(
    state: &EngineState,
    identity: &Identity,
    payload: CreateTestRequest,
) -> Result<TestResponse> {
    require_admin(identity)?;
    payload.validate().map_err(|err| EngineError::Configuration(err.to_string()))?;

    let level = match (&payload.topic_id, &payload.course_id) {
        (Some(topic_id), None) => {
            repositories::topics::find_by_id(state.db(), topic_id)
                .await?
                .ok_or(EngineError::NotFound("topic"))?;
            payload.level.ok_or_else(|| {
                EngineError::Configuration("topic-bound tests require an explicit level".to_string())
            })?
        }
        (None, Some(course_id)) => match payload.level {
            // An explicit level is kept as-is; it is never overwritten by
            // the course mapping after creation either.
            Some(level) => level,
            None => {
                let profile = state
                    .enrollment()
                    .course_profile(course_id)
                    .await
                    .map_err(|err| EngineError::CourseLookup(err.to_string()))?;
                profile.level.question_level()
            }
        },
        _ => {
            return Err(EngineError::Configuration(
                "a test is bound to exactly one of topic or course".to_string(),
            ))
        }
    };

    let now = primitive_now_utc();
    let test_id = Uuid::new_v4().to_string();
    let test = repositories::tests::create(
        state.db(),
        repositories::tests::CreateTest {
            id: &test_id,
            title: payload.title.trim(),
            topic_id: payload.topic_id.as_deref(),
            course_id: payload.course_id.as_deref(),
            level,
            time_limit_minutes: payload.time_limit_minutes,
            is_public: payload.is_public,
            created_by: Some(&identity.user_id),
            now,
        },
    )
    .await?;

    tracing::info!(test_id = %test.id, level = level.as_str(), "Test created");

    Ok(test.into())
}

pub async fn list_public_tests(
    state: &EngineState,
    skip: i64,
    limit: i64,
) -> Result<Vec<TestResponse>> {
    let rows = repositories::tests::list_public(state.db(), skip, limit).await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::types::QuestionLevel;
    use crate::schemas::question::OptionInput;

    fn mc_payload(options: Vec<OptionInput>) -> CreateQuestionRequest {
        CreateQuestionRequest {
            topic_id: "t1".to_string(),
            question_text: "Pick one".to_string(),
            level: QuestionLevel::Basic,
            kind: QuestionKind::MultipleChoice,
            marks: 1.0,
            options,
            reference_answer: None,
        }
    }

    fn option(text: &str, is_correct: bool) -> OptionInput {
        OptionInput { option_text: text.to_string(), is_correct }
    }

    #[test]
    fn multiple_choice_requires_exactly_one_correct_option() {
        let ok = mc_payload(vec![option("a", true), option("b", false)]);
        assert!(validate_question_shape(&ok).is_ok());

        let none_correct = mc_payload(vec![option("a", false), option("b", false)]);
        assert!(validate_question_shape(&none_correct).is_err());

        let two_correct = mc_payload(vec![option("a", true), option("b", true)]);
        assert!(validate_question_shape(&two_correct).is_err());

        let single_option = mc_payload(vec![option("a", true)]);
        assert!(validate_question_shape(&single_option).is_err());
    }

    #[test]
    fn free_text_requires_reference_answer_and_no_options() {
        let mut payload = CreateQuestionRequest {
            topic_id: "t1".to_string(),
            question_text: "Explain".to_string(),
            level: QuestionLevel::Medium,
            kind: QuestionKind::FreeText,
            marks: 2.0,
            options: vec![],
            reference_answer: Some("because".to_string()),
        };
        assert!(validate_question_shape(&payload).is_ok());

        payload.reference_answer = Some("   ".to_string());
        assert!(validate_question_shape(&payload).is_err());

        payload.reference_answer = Some("because".to_string());
        payload.options = vec![option("a", false)];
        assert!(validate_question_shape(&payload).is_err());
    }
}
