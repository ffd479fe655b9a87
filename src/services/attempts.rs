//! Attempt lifecycle: create, start, record answers, submit, retake.
//!
//! Submit is the serialization point: the status flip happens inside a
//! transaction holding the attempt's advisory lock, so answer writes that
//! lose the race are rejected instead of silently merged. Scoring and
//! feedback run after the flip, from the snapshot the transaction
//! observed, and always complete even when the oracle is down.

use std::collections::{HashMap, HashSet};

use uuid::Uuid;
use validator::Validate;

use crate::core::identity::Identity;
use crate::core::state::EngineState;
use crate::core::time::primitive_now_utc;
use crate::db::models::{AttemptResult, Question, QuestionOption, Test, TestAttempt};
use crate::db::types::{QuestionKind, QuestionLevel};
use crate::error::{EngineError, Result};
use crate::repositories;
use crate::schemas::attempt::{
    AttemptDetailResponse, AttemptSummaryResponse, CreateAttemptRequest, RecordAnswerRequest,
    ResultResponse,
};
use crate::schemas::question::AttemptQuestionView;
use crate::schemas::PaginatedResponse;
use crate::services::ai_scoring::{self, AnswerReview, ScoringOracle};
use crate::services::attempt_rules::{self, AttemptConfig};
use crate::services::{scoring, selection};

pub async fn create_attempt(
    state: &EngineState,
    identity: &Identity,
    payload: CreateAttemptRequest,
) -> Result<AttemptDetailResponse> {
    payload.validate().map_err(|err| EngineError::Configuration(err.to_string()))?;

    let config = attempt_rules::resolve_config(payload.test_id, payload.topic_id, payload.level)?;
    match config {
        AttemptConfig::Formal { test_id } => create_formal(state, identity, &test_id).await,
        AttemptConfig::Practice { topic_id, level } => {
            create_practice(state, identity, &topic_id, level).await
        }
    }
}

async fn create_formal(
    state: &EngineState,
    identity: &Identity,
    test_id: &str,
) -> Result<AttemptDetailResponse> {
    let test = repositories::tests::find_by_id(state.db(), test_id)
        .await?
        .ok_or(EngineError::NotFound("test"))?;

    let target = state.settings().engine().questions_per_attempt;
    let pool = formal_pool(state, &test).await?;
    if pool.len() < target {
        return Err(EngineError::InsufficientQuestionPool {
            needed: target,
            available: pool.len(),
        });
    }

    let now = primitive_now_utc();
    let attempt_id = Uuid::new_v4().to_string();

    let mut tx = state.db().begin().await?;
    let attempt = repositories::attempts::create(
        &mut *tx,
        repositories::attempts::CreateAttempt {
            id: &attempt_id,
            student_id: &identity.user_id,
            test_id: Some(&test.id),
            topic_id: None,
            level: test.level,
            is_practice: false,
            time_limit_minutes: Some(test.time_limit_minutes),
            now,
        },
    )
    .await?;

    let selected =
        state.recency().select(pool, target, &mut rand::thread_rng(), |question| {
            question.id.as_str()
        });
    let question_ids: Vec<String> = selected.iter().map(|question| question.id.clone()).collect();
    repositories::attempts::insert_selected_questions(&mut tx, &attempt.id, &question_ids).await?;
    tx.commit().await?;

    tracing::info!(
        attempt_id = %attempt.id,
        test_id = %test.id,
        student_id = %identity.user_id,
        questions = question_ids.len(),
        "Formal attempt started"
    );

    load_detail(state, attempt).await
}

async fn create_practice(
    state: &EngineState,
    identity: &Identity,
    topic_id: &str,
    level: QuestionLevel,
) -> Result<AttemptDetailResponse> {
    let topic = repositories::topics::find_by_id(state.db(), topic_id)
        .await?
        .ok_or(EngineError::NotFound("topic"))?;

    let target = state.settings().engine().questions_per_attempt;
    let pool = repositories::questions::list_by_topic_level(state.db(), &topic.id, level).await?;
    if pool.is_empty() {
        return Err(EngineError::InsufficientQuestionPool { needed: 1, available: 0 });
    }

    let seen: HashSet<String> = repositories::attempts::practice_seen_question_ids(
        state.db(),
        &identity.user_id,
        &topic.id,
        level,
        None,
    )
    .await?
    .into_iter()
    .collect();

    let selected =
        selection::select_practice(pool, &seen, target, &mut rand::thread_rng(), |question| {
            question.id.as_str()
        });
    let question_ids: Vec<String> = selected.iter().map(|question| question.id.clone()).collect();

    let now = primitive_now_utc();
    let attempt_id = Uuid::new_v4().to_string();

    let mut tx = state.db().begin().await?;
    let attempt = repositories::attempts::create(
        &mut *tx,
        repositories::attempts::CreateAttempt {
            id: &attempt_id,
            student_id: &identity.user_id,
            test_id: None,
            topic_id: Some(&topic.id),
            level,
            is_practice: true,
            time_limit_minutes: None,
            now,
        },
    )
    .await?;
    repositories::attempts::insert_selected_questions(&mut tx, &attempt.id, &question_ids).await?;
    tx.commit().await?;

    tracing::info!(
        attempt_id = %attempt.id,
        topic_id = %topic.id,
        level = level.as_str(),
        student_id = %identity.user_id,
        questions = question_ids.len(),
        "Practice attempt started"
    );

    load_detail(state, attempt).await
}

/// Idempotent: assigns the question snapshot if and only if it does not
/// exist yet.
pub async fn start_attempt(
    state: &EngineState,
    identity: &Identity,
    attempt_id: &str,
) -> Result<AttemptDetailResponse> {
    let mut tx = state.db().begin().await?;
    repositories::attempts::acquire_attempt_lock(&mut *tx, attempt_id).await?;

    let attempt = repositories::attempts::find_by_id(&mut *tx, attempt_id)
        .await?
        .ok_or(EngineError::NotFound("attempt"))?;
    if !identity.can_view_attempts_of(&attempt.student_id) {
        return Err(EngineError::Forbidden);
    }
    attempt_rules::ensure_in_progress(attempt.status)?;

    if repositories::attempts::has_selected_questions(&mut *tx, &attempt.id).await? {
        tx.commit().await?;
        return load_detail(state, attempt).await;
    }

    let selected = build_selection(state, &attempt).await?;
    let question_ids: Vec<String> = selected.iter().map(|question| question.id.clone()).collect();
    repositories::attempts::insert_selected_questions(&mut tx, &attempt.id, &question_ids).await?;
    tx.commit().await?;

    load_detail(state, attempt).await
}

pub async fn record_answer(
    state: &EngineState,
    identity: &Identity,
    attempt_id: &str,
    payload: RecordAnswerRequest,
) -> Result<ResultResponse> {
    payload.validate().map_err(|err| EngineError::Configuration(err.to_string()))?;

    let mut tx = state.db().begin().await?;
    repositories::attempts::acquire_attempt_lock(&mut *tx, attempt_id).await?;

    let attempt = repositories::attempts::find_by_id(&mut *tx, attempt_id)
        .await?
        .ok_or(EngineError::NotFound("attempt"))?;
    if !identity.can_view_attempts_of(&attempt.student_id) {
        return Err(EngineError::Forbidden);
    }
    attempt_rules::ensure_in_progress(attempt.status)?;

    let snapshot = repositories::attempts::selected_question_ids(&mut *tx, &attempt.id).await?;
    if !snapshot.contains(&payload.question_id) {
        return Err(EngineError::Configuration(
            "question is not part of this attempt".to_string(),
        ));
    }

    let question = repositories::questions::find_by_id(state.db(), &payload.question_id)
        .await?
        .ok_or(EngineError::NotFound("question"))?;

    let (selected_option_id, response_text) = match question.kind {
        QuestionKind::MultipleChoice => {
            let option_id = payload.selected_option_id.as_deref().ok_or_else(|| {
                EngineError::Configuration(
                    "multiple-choice answers require selected_option_id".to_string(),
                )
            })?;
            let options =
                repositories::questions::options_for_questions(state.db(), &[question.id.clone()]).await?;
            if !options.iter().any(|option| option.id == option_id) {
                return Err(EngineError::Configuration(
                    "option does not belong to this question".to_string(),
                ));
            }
            (Some(option_id.to_string()), None)
        }
        QuestionKind::FreeText => {
            let text = payload
                .response_text
                .as_deref()
                .map(str::trim)
                .filter(|text| !text.is_empty())
                .ok_or_else(|| {
                    EngineError::Configuration(
                        "free-text answers require response_text".to_string(),
                    )
                })?;
            (None, Some(text.to_string()))
        }
    };

    let now = primitive_now_utc();
    let result_id = Uuid::new_v4().to_string();
    let result = repositories::attempts::upsert_answer(
        &mut *tx,
        repositories::attempts::UpsertAnswer {
            id: &result_id,
            attempt_id: &attempt.id,
            question_id: &question.id,
            selected_option_id: selected_option_id.as_deref(),
            response_text: response_text.as_deref(),
            now,
        },
    )
    .await?;
    tx.commit().await?;

    Ok(result.into())
}

pub async fn submit_attempt(
    state: &EngineState,
    identity: &Identity,
    attempt_id: &str,
) -> Result<AttemptDetailResponse> {
    // Phase 1: flip to the terminal state under the attempt lock and read
    // the snapshot submit will score.
    let mut tx = state.db().begin().await?;
    repositories::attempts::acquire_attempt_lock(&mut *tx, attempt_id).await?;

    let attempt = repositories::attempts::find_by_id(&mut *tx, attempt_id)
        .await?
        .ok_or(EngineError::NotFound("attempt"))?;
    if !identity.can_view_attempts_of(&attempt.student_id) {
        return Err(EngineError::Forbidden);
    }
    attempt_rules::ensure_in_progress(attempt.status)?;

    let now = primitive_now_utc();
    if !repositories::attempts::mark_submitted(&mut *tx, &attempt.id, now).await? {
        return Err(EngineError::AttemptAlreadySubmitted);
    }
    let question_ids = repositories::attempts::selected_question_ids(&mut *tx, &attempt.id).await?;
    let results = repositories::attempts::results_for_attempt(&mut *tx, &attempt.id).await?;
    tx.commit().await?;

    // Phase 2: score the observed snapshot. Oracle failures degrade to
    // zero scores; nothing here can abort the submission.
    let snapshot_questions = ordered_questions(state, &question_ids).await?;
    let options = repositories::questions::options_for_questions(state.db(), &question_ids).await?;
    let topic_titles = topic_titles_for(state, &snapshot_questions).await?;
    let result_map: HashMap<String, AttemptResult> =
        results.into_iter().map(|result| (result.question_id.clone(), result)).collect();

    let scores = score_snapshot(
        state.oracle(),
        &snapshot_questions,
        &options,
        &result_map,
        &topic_titles,
    )
    .await;

    let test = match &attempt.test_id {
        Some(test_id) => repositories::tests::find_by_id(state.db(), test_id).await?,
        None => None,
    };
    let title = match &test {
        Some(test) => test.title.clone(),
        None => practice_title(&attempt, &topic_titles),
    };
    let feedback = build_feedback(state.oracle(), &title, &scores).await;

    let now = primitive_now_utc();
    let mut tx = state.db().begin().await?;
    for entry in &scores.entries {
        let result_id = Uuid::new_v4().to_string();
        repositories::attempts::upsert_score(
            &mut *tx,
            repositories::attempts::ScoredResult {
                id: &result_id,
                attempt_id: &attempt.id,
                question_id: &entry.question_id,
                scored_marks: entry.scored_marks,
                ai_comment: entry.ai_comment.as_deref(),
                now,
            },
        )
        .await?;
    }
    repositories::attempts::finalize_scores(&mut *tx, &attempt.id, scores.total_score, &feedback, now).await?;
    tx.commit().await?;

    let percent = scoring::percentage(scores.total_score, scores.total_possible);
    let passing = state.settings().engine().passing_score_percent;
    notify_certification(state, &attempt, test.as_ref(), percent, passing).await;

    let refreshed = repositories::attempts::find_by_id(state.db(), &attempt.id)
        .await?
        .ok_or(EngineError::NotFound("attempt"))?;
    load_detail(state, refreshed).await
}

/// Formal-only: a fresh attempt against the same test, permitted when the
/// prior attempt was submitted below the passing threshold.
pub async fn retake_attempt(
    state: &EngineState,
    identity: &Identity,
    attempt_id: &str,
) -> Result<AttemptDetailResponse> {
    let attempt = repositories::attempts::find_by_id(state.db(), attempt_id)
        .await?
        .ok_or(EngineError::NotFound("attempt"))?;
    if identity.user_id != attempt.student_id {
        return Err(EngineError::Forbidden);
    }

    let question_ids = repositories::attempts::selected_question_ids(state.db(), &attempt.id).await?;
    let snapshot_questions = ordered_questions(state, &question_ids).await?;
    let total_possible: f64 = snapshot_questions.iter().map(|question| question.marks).sum();
    let percent = scoring::percentage(attempt.total_score, total_possible);

    attempt_rules::ensure_retake_allowed(
        attempt.is_practice,
        attempt.status,
        percent,
        state.settings().engine().passing_score_percent,
    )?;

    let test_id = attempt.test_id.clone().ok_or(EngineError::RetakeNotAllowed(
        "practice attempts are recreated directly instead of retaken",
    ))?;

    tracing::info!(
        prior_attempt_id = %attempt.id,
        test_id = %test_id,
        student_id = %identity.user_id,
        "Retake requested"
    );

    create_formal(state, identity, &test_id).await
}

pub async fn get_attempt(
    state: &EngineState,
    identity: &Identity,
    attempt_id: &str,
) -> Result<AttemptDetailResponse> {
    let attempt = repositories::attempts::find_by_id(state.db(), attempt_id)
        .await?
        .ok_or(EngineError::NotFound("attempt"))?;
    if !identity.can_view_attempts_of(&attempt.student_id) {
        return Err(EngineError::Forbidden);
    }
    load_detail(state, attempt).await
}

/// Students see their own attempts; admins see everyone's.
pub async fn list_attempts(
    state: &EngineState,
    identity: &Identity,
    skip: i64,
    limit: i64,
) -> Result<PaginatedResponse<AttemptSummaryResponse>> {
    let student_id = if identity.is_admin() { None } else { Some(identity.user_id.clone()) };
    let skip = skip.max(0);
    let limit = limit.clamp(1, 1000);

    let rows = repositories::attempts::list(
        state.db(),
        repositories::attempts::ListAttemptsParams { student_id, skip, limit },
    )
    .await?;

    let total_count = rows.first().map(|row| row.total_count).unwrap_or(0);
    let items = rows.into_iter().map(Into::into).collect();
    Ok(PaginatedResponse { items, total_count, skip, limit })
}

async fn build_selection(state: &EngineState, attempt: &TestAttempt) -> Result<Vec<Question>> {
    let target = state.settings().engine().questions_per_attempt;

    if attempt.is_practice {
        let topic_id = attempt.topic_id.as_deref().ok_or_else(|| {
            EngineError::Configuration("practice attempt is missing its topic".to_string())
        })?;
        let pool = repositories::questions::list_by_topic_level(state.db(), topic_id, attempt.level).await?;
        if pool.is_empty() {
            return Err(EngineError::InsufficientQuestionPool { needed: 1, available: 0 });
        }
        let seen: HashSet<String> = repositories::attempts::practice_seen_question_ids(
            state.db(),
            &attempt.student_id,
            topic_id,
            attempt.level,
            Some(&attempt.id),
        )
        .await?
        .into_iter()
        .collect();
        Ok(selection::select_practice(pool, &seen, target, &mut rand::thread_rng(), |question| {
            question.id.as_str()
        }))
    } else {
        let test_id = attempt.test_id.as_deref().ok_or_else(|| {
            EngineError::Configuration("formal attempt is missing its test".to_string())
        })?;
        let test = repositories::tests::find_by_id(state.db(), test_id)
            .await?
            .ok_or(EngineError::NotFound("test"))?;
        let pool = formal_pool(state, &test).await?;
        if pool.len() < target {
            return Err(EngineError::InsufficientQuestionPool {
                needed: target,
                available: pool.len(),
            });
        }
        Ok(state.recency().select(pool, target, &mut rand::thread_rng(), |question| {
            question.id.as_str()
        }))
    }
}

/// Candidate pool of a formal test: its own topic, or every topic of the
/// bound course at the test's level.
async fn formal_pool(state: &EngineState, test: &Test) -> Result<Vec<Question>> {
    if let Some(course_id) = &test.course_id {
        let profile = state
            .enrollment()
            .course_profile(course_id)
            .await
            .map_err(|err| EngineError::CourseLookup(err.to_string()))?;
        Ok(repositories::questions::list_by_topics_level(state.db(), &profile.topic_ids, test.level).await?)
    } else if let Some(topic_id) = &test.topic_id {
        Ok(repositories::questions::list_by_topic_level(state.db(), topic_id, test.level).await?)
    } else {
        Err(EngineError::Configuration(
            "test has neither a topic nor a course binding".to_string(),
        ))
    }
}

async fn ordered_questions(state: &EngineState, question_ids: &[String]) -> Result<Vec<Question>> {
    let mut by_id: HashMap<String, Question> = repositories::questions::list_by_ids(state.db(), question_ids)
        .await?
        .into_iter()
        .map(|question| (question.id.clone(), question))
        .collect();
    Ok(question_ids.iter().filter_map(|id| by_id.remove(id)).collect())
}

async fn topic_titles_for(
    state: &EngineState,
    snapshot_questions: &[Question],
) -> Result<HashMap<String, String>> {
    let mut titles = HashMap::new();
    for question in snapshot_questions {
        if titles.contains_key(&question.topic_id) {
            continue;
        }
        if let Some(topic) = repositories::topics::find_by_id(state.db(), &question.topic_id).await? {
            titles.insert(question.topic_id.clone(), topic.title);
        }
    }
    Ok(titles)
}

fn practice_title(attempt: &TestAttempt, topic_titles: &HashMap<String, String>) -> String {
    let topic = attempt
        .topic_id
        .as_ref()
        .and_then(|topic_id| topic_titles.get(topic_id))
        .map(String::as_str)
        .unwrap_or("practice");
    format!("Practice: {topic} - {}", attempt.level.as_str())
}

async fn notify_certification(
    state: &EngineState,
    attempt: &TestAttempt,
    test: Option<&Test>,
    percent: f64,
    passing_percent: f64,
) {
    if attempt.is_practice {
        return;
    }

    if !scoring::is_passing(percent, passing_percent) {
        tracing::info!(
            attempt_id = %attempt.id,
            score_percent = percent,
            "Attempt below passing threshold; retake available"
        );
        return;
    }

    let Some(course_id) = test.and_then(|test| test.course_id.as_deref()) else {
        return;
    };

    if let Err(err) = state
        .enrollment()
        .review_certification(&attempt.student_id, course_id, percent)
        .await
    {
        tracing::error!(
            error = %err,
            attempt_id = %attempt.id,
            course_id,
            "Failed to notify enrollment about a passing attempt"
        );
    } else {
        tracing::info!(
            attempt_id = %attempt.id,
            course_id,
            score_percent = percent,
            "Certification review requested"
        );
    }
}

struct ScoredEntry {
    question_id: String,
    scored_marks: f64,
    ai_comment: Option<String>,
}

struct SnapshotScores {
    entries: Vec<ScoredEntry>,
    total_score: f64,
    total_possible: f64,
    reviews: Vec<AnswerReview>,
    unanswered: Vec<String>,
    has_free_text: bool,
}

/// Produce exactly one scored entry per snapshot question: the recorded
/// answer's score, or a zero-score placeholder for unanswered questions.
/// The denominator is always the snapshot's full mark total.
async fn score_snapshot(
    oracle: &dyn ScoringOracle,
    snapshot_questions: &[Question],
    options: &[QuestionOption],
    results: &HashMap<String, AttemptResult>,
    topic_titles: &HashMap<String, String>,
) -> SnapshotScores {
    let mut entries = Vec::with_capacity(snapshot_questions.len());
    let mut reviews = Vec::new();
    let mut unanswered = Vec::new();
    let mut total_score = 0.0;
    let mut total_possible = 0.0;
    let mut has_free_text = false;

    for question in snapshot_questions {
        total_possible += question.marks;
        let result = results.get(&question.id);

        match question.kind {
            QuestionKind::MultipleChoice => {
                let selected = result.and_then(|result| result.selected_option_id.as_deref());
                match selected {
                    Some(option_id) => {
                        let correct = options.iter().any(|option| {
                            option.question_id == question.id
                                && option.id == option_id
                                && option.is_correct
                        });
                        let marks = scoring::objective_marks(question.marks, correct);
                        total_score += marks;
                        entries.push(ScoredEntry {
                            question_id: question.id.clone(),
                            scored_marks: marks,
                            ai_comment: None,
                        });
                    }
                    None => {
                        unanswered.push(question.question_text.clone());
                        entries.push(unanswered_entry(question, topic_titles));
                    }
                }
            }
            QuestionKind::FreeText => {
                has_free_text = true;
                let response = result
                    .and_then(|result| result.response_text.as_deref())
                    .map(str::trim)
                    .filter(|text| !text.is_empty());

                match response {
                    Some(text) => {
                        let reference = question.reference_answer.as_deref().unwrap_or("");
                        let scored = match oracle
                            .score_answer(&question.question_text, reference, text)
                            .await
                        {
                            Ok(scored) => scored,
                            Err(err) => {
                                tracing::warn!(
                                    error = %err,
                                    question_id = %question.id,
                                    "Oracle scoring failed; recording degraded score"
                                );
                                ai_scoring::degraded_score()
                            }
                        };
                        let marks = scored.score.clamp(0.0, question.marks);
                        total_score += marks;
                        reviews.push(AnswerReview {
                            question_text: question.question_text.clone(),
                            reference_answer: reference.to_string(),
                            response: Some(text.to_string()),
                            score: marks,
                            possible: question.marks,
                        });
                        entries.push(ScoredEntry {
                            question_id: question.id.clone(),
                            scored_marks: marks,
                            ai_comment: Some(scored.comment),
                        });
                    }
                    None => {
                        unanswered.push(question.question_text.clone());
                        entries.push(unanswered_entry(question, topic_titles));
                    }
                }
            }
        }
    }

    SnapshotScores { entries, total_score, total_possible, reviews, unanswered, has_free_text }
}

fn unanswered_entry(
    question: &Question,
    topic_titles: &HashMap<String, String>,
) -> ScoredEntry {
    let topic = topic_titles
        .get(&question.topic_id)
        .map(String::as_str)
        .unwrap_or("the course material");
    ScoredEntry {
        question_id: question.id.clone(),
        scored_marks: 0.0,
        ai_comment: Some(scoring::unanswered_comment(topic)),
    }
}

/// Overall feedback: deterministic score bands for purely objective
/// attempts, an oracle narrative otherwise. A failing oracle falls back to
/// a terse message and never blocks the submission.
async fn build_feedback(
    oracle: &dyn ScoringOracle,
    title: &str,
    scores: &SnapshotScores,
) -> String {
    if !scores.has_free_text {
        let percent = scoring::percentage(scores.total_score, scores.total_possible);
        return scoring::band_feedback(percent).to_string();
    }

    match oracle.summarize_attempt(title, &scores.reviews, &scores.unanswered).await {
        Ok(text) if !text.trim().is_empty() => text,
        Ok(_) => ai_scoring::degraded_feedback(),
        Err(err) => {
            tracing::warn!(error = %err, "Feedback generation failed; using fallback");
            ai_scoring::degraded_feedback()
        }
    }
}

async fn load_detail(state: &EngineState, attempt: TestAttempt) -> Result<AttemptDetailResponse> {
    let question_ids = repositories::attempts::selected_question_ids(state.db(), &attempt.id).await?;
    let snapshot_questions = ordered_questions(state, &question_ids).await?;
    let options = repositories::questions::options_for_questions(state.db(), &question_ids).await?;
    let results = repositories::attempts::results_for_attempt(state.db(), &attempt.id).await?;

    let total_possible: f64 = snapshot_questions.iter().map(|question| question.marks).sum();
    let percent = scoring::percentage(attempt.total_score, total_possible);
    let passing = state.settings().engine().passing_score_percent;
    let submitted = attempt.is_submitted();
    let passed = submitted.then(|| scoring::is_passing(percent, passing));
    let retake_available = !attempt.is_practice && passed == Some(false);
    let time_remaining = attempt_rules::time_remaining_minutes(
        attempt.time_limit_minutes,
        Some(attempt.started_at),
        primitive_now_utc(),
    );

    let question_views = snapshot_questions
        .iter()
        .map(|question| AttemptQuestionView::from_parts(question, &options))
        .collect();
    let result_views = results.into_iter().map(Into::into).collect();

    Ok(AttemptDetailResponse::from_parts(
        attempt,
        question_views,
        result_views,
        total_possible,
        percent,
        passed,
        retake_available,
        time_remaining,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use time::{Date, PrimitiveDateTime, Time};

    use crate::db::types::QuestionLevel;
    use crate::services::ai_scoring::OracleScore;

    fn ts() -> PrimitiveDateTime {
        let date = Date::from_calendar_date(2025, time::Month::April, 1).unwrap();
        PrimitiveDateTime::new(date, Time::from_hms(12, 0, 0).unwrap())
    }

    fn mc_question(id: &str, marks: f64) -> Question {
        Question {
            id: id.to_string(),
            topic_id: "algebra".to_string(),
            question_text: format!("Question {id}?"),
            level: QuestionLevel::Basic,
            kind: QuestionKind::MultipleChoice,
            marks,
            reference_answer: None,
            created_at: ts(),
            updated_at: ts(),
        }
    }

    fn ft_question(id: &str, marks: f64) -> Question {
        Question {
            id: id.to_string(),
            topic_id: "algebra".to_string(),
            question_text: format!("Explain {id}."),
            level: QuestionLevel::Basic,
            kind: QuestionKind::FreeText,
            marks,
            reference_answer: Some("reference answer".to_string()),
            created_at: ts(),
            updated_at: ts(),
        }
    }

    fn option(id: &str, question_id: &str, is_correct: bool) -> QuestionOption {
        QuestionOption {
            id: id.to_string(),
            question_id: question_id.to_string(),
            option_text: format!("Option {id}"),
            is_correct,
        }
    }

    fn mc_answer(question_id: &str, option_id: &str) -> AttemptResult {
        AttemptResult {
            id: format!("r-{question_id}"),
            attempt_id: "a1".to_string(),
            question_id: question_id.to_string(),
            selected_option_id: Some(option_id.to_string()),
            response_text: None,
            scored_marks: 0.0,
            ai_comment: None,
            created_at: ts(),
            updated_at: ts(),
        }
    }

    fn ft_answer(question_id: &str, text: &str) -> AttemptResult {
        AttemptResult {
            id: format!("r-{question_id}"),
            attempt_id: "a1".to_string(),
            question_id: question_id.to_string(),
            selected_option_id: None,
            response_text: Some(text.to_string()),
            scored_marks: 0.0,
            ai_comment: None,
            created_at: ts(),
            updated_at: ts(),
        }
    }

    struct StubOracle {
        fail: bool,
        score: f64,
    }

    #[async_trait]
    impl ScoringOracle for StubOracle {
        async fn score_answer(
            &self,
            _question_text: &str,
            _reference_answer: &str,
            _response: &str,
        ) -> anyhow::Result<OracleScore> {
            if self.fail {
                anyhow::bail!("oracle unavailable");
            }
            Ok(OracleScore { score: self.score, comment: "Solid answer.".to_string() })
        }

        async fn summarize_attempt(
            &self,
            _test_title: &str,
            _reviews: &[AnswerReview],
            _unanswered: &[String],
        ) -> anyhow::Result<String> {
            if self.fail {
                anyhow::bail!("oracle unavailable");
            }
            Ok("Overall a good performance.".to_string())
        }
    }

    fn results_map(results: Vec<AttemptResult>) -> HashMap<String, AttemptResult> {
        results.into_iter().map(|result| (result.question_id.clone(), result)).collect()
    }

    fn topics() -> HashMap<String, String> {
        HashMap::from([("algebra".to_string(), "Algebra".to_string())])
    }

    #[tokio::test]
    async fn objective_scoring_awards_full_or_zero_marks() {
        let oracle = StubOracle { fail: false, score: 2.0 };
        let questions = vec![mc_question("q1", 1.0), mc_question("q2", 1.0)];
        let options = vec![
            option("o1", "q1", true),
            option("o2", "q1", false),
            option("o3", "q2", true),
            option("o4", "q2", false),
        ];
        let results = results_map(vec![mc_answer("q1", "o1"), mc_answer("q2", "o4")]);

        let scores =
            score_snapshot(&oracle, &questions, &options, &results, &topics()).await;

        assert_eq!(scores.total_score, 1.0);
        assert_eq!(scores.total_possible, 2.0);
        assert_eq!(scores.entries.len(), 2);
        assert!(scores.entries.iter().all(|entry| entry.ai_comment.is_none()));
    }

    #[tokio::test]
    async fn every_snapshot_question_gets_exactly_one_entry() {
        let oracle = StubOracle { fail: false, score: 2.0 };
        let questions =
            vec![mc_question("q1", 1.0), mc_question("q2", 1.0), mc_question("q3", 1.0)];
        let options = vec![option("o1", "q1", true)];
        let results = results_map(vec![mc_answer("q1", "o1")]);

        let scores =
            score_snapshot(&oracle, &questions, &options, &results, &topics()).await;

        assert_eq!(scores.entries.len(), questions.len());
        assert_eq!(scores.unanswered.len(), 2);
        // The denominator covers unanswered questions too.
        assert_eq!(scores.total_possible, 3.0);
        assert_eq!(scores.total_score, 1.0);

        let placeholders: Vec<_> = scores
            .entries
            .iter()
            .filter(|entry| entry.question_id != "q1")
            .collect();
        for placeholder in placeholders {
            assert_eq!(placeholder.scored_marks, 0.0);
            assert_eq!(
                placeholder.ai_comment.as_deref(),
                Some("You did not answer this question. Study Algebra.")
            );
        }
    }

    #[tokio::test]
    async fn free_text_answers_are_scored_by_the_oracle() {
        let oracle = StubOracle { fail: false, score: 1.5 };
        let questions = vec![ft_question("q1", 2.0)];
        let results = results_map(vec![ft_answer("q1", "my explanation")]);

        let scores = score_snapshot(&oracle, &questions, &[], &results, &topics()).await;

        assert_eq!(scores.total_score, 1.5);
        assert_eq!(scores.entries[0].ai_comment.as_deref(), Some("Solid answer."));
        assert_eq!(scores.reviews.len(), 1);
        assert!(scores.has_free_text);
    }

    #[tokio::test]
    async fn oracle_failure_degrades_to_zero_without_erroring() {
        let oracle = StubOracle { fail: true, score: 0.0 };
        let questions = vec![ft_question("q1", 2.0)];
        let results = results_map(vec![ft_answer("q1", "my explanation")]);

        let scores = score_snapshot(&oracle, &questions, &[], &results, &topics()).await;

        assert_eq!(scores.total_score, 0.0);
        assert_eq!(
            scores.entries[0].ai_comment.as_deref(),
            Some("Automatic scoring was unavailable for this answer.")
        );
    }

    #[tokio::test]
    async fn oracle_score_is_capped_at_question_marks() {
        let oracle = StubOracle { fail: false, score: 1.5 };
        let questions = vec![ft_question("q1", 1.0)];
        let results = results_map(vec![ft_answer("q1", "short answer")]);

        let scores = score_snapshot(&oracle, &questions, &[], &results, &topics()).await;

        assert_eq!(scores.total_score, 1.0);
    }

    #[tokio::test]
    async fn blank_free_text_counts_as_unanswered() {
        let oracle = StubOracle { fail: true, score: 0.0 };
        let questions = vec![ft_question("q1", 2.0)];
        let results = results_map(vec![ft_answer("q1", "   ")]);

        let scores = score_snapshot(&oracle, &questions, &[], &results, &topics()).await;

        assert_eq!(scores.unanswered.len(), 1);
        assert_eq!(scores.entries[0].scored_marks, 0.0);
        assert_eq!(
            scores.entries[0].ai_comment.as_deref(),
            Some("You did not answer this question. Study Algebra.")
        );
    }

    #[tokio::test]
    async fn objective_attempts_use_band_feedback() {
        let oracle = StubOracle { fail: true, score: 0.0 };
        let scores = SnapshotScores {
            entries: vec![],
            total_score: 9.0,
            total_possible: 10.0,
            reviews: vec![],
            unanswered: vec![],
            has_free_text: false,
        };

        let feedback = build_feedback(&oracle, "Algebra test", &scores).await;
        assert_eq!(feedback, "Excellent! Perfect score!");
    }

    #[tokio::test]
    async fn feedback_falls_back_when_oracle_fails() {
        let oracle = StubOracle { fail: true, score: 0.0 };
        let scores = SnapshotScores {
            entries: vec![],
            total_score: 1.0,
            total_possible: 2.0,
            reviews: vec![],
            unanswered: vec![],
            has_free_text: true,
        };

        let feedback = build_feedback(&oracle, "Essay test", &scores).await;
        assert_eq!(feedback, ai_scoring::degraded_feedback());
    }
}
