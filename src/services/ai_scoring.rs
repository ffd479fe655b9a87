use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::core::config::Settings;

/// Upper bound of the oracle's discrete scoring scale.
pub const SCORE_SCALE_MAX: f64 = 2.0;
/// Granularity of the oracle's scoring scale.
pub const SCORE_STEP: f64 = 0.5;

const SCORING_SYSTEM_PROMPT: &str = "\
You are an experienced educator grading one free-text test answer.

Scoring scale:
2.0 - Complete, accurate, and demonstrates deep understanding
1.5 - Mostly correct with minor inaccuracies
1.0 - Partially correct but missing key elements
0.5 - Shows some relevant knowledge but largely incorrect
0.0 - Completely incorrect or irrelevant (including unanswered questions)

Reply with the exact score (0.0-2.0 in 0.5 increments) on the first line,
followed by specific feedback explaining the score: what was done well,
what needs improvement, and how to reach full marks.";

const FEEDBACK_SYSTEM_PROMPT: &str = "\
You are an experienced educator summarizing a student's test performance.
Cover the overall result, key strengths, the main areas needing
improvement including unanswered questions, and concrete study
recommendations. Be constructive and supportive.";

#[derive(Debug, Clone, PartialEq)]
pub struct OracleScore {
    pub score: f64,
    pub comment: String,
}

/// Per-question material handed to the oracle when it writes the overall
/// attempt narrative.
#[derive(Debug, Clone)]
pub struct AnswerReview {
    pub question_text: String,
    pub reference_answer: String,
    pub response: Option<String>,
    pub score: f64,
    pub possible: f64,
}

/// External AI service that scores free-text answers and writes attempt
/// feedback. Implementations may fail; callers degrade, they never
/// propagate oracle errors out of the submit path.
#[async_trait]
pub trait ScoringOracle: Send + Sync {
    async fn score_answer(
        &self,
        question_text: &str,
        reference_answer: &str,
        response: &str,
    ) -> anyhow::Result<OracleScore>;

    async fn summarize_attempt(
        &self,
        test_title: &str,
        reviews: &[AnswerReview],
        unanswered: &[String],
    ) -> anyhow::Result<String>;
}

/// OpenAI-compatible chat-completions client.
#[derive(Debug, Clone)]
pub struct AiScoringService {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f64,
}

impl AiScoringService {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let timeout = Duration::from_secs(settings.ai().request_timeout_seconds);
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .build()
            .map_err(|err| anyhow::anyhow!("Failed to build HTTP client: {err}"))?;

        Ok(Self {
            client,
            api_key: settings.ai().api_key.clone(),
            base_url: settings.ai().base_url.trim_end_matches('/').to_string(),
            model: settings.ai().model.clone(),
            max_tokens: settings.ai().max_tokens,
            temperature: settings.ai().temperature,
        })
    }

    async fn chat(&self, system_prompt: &str, user_prompt: &str) -> anyhow::Result<String> {
        let payload = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_prompt}
            ],
            "max_completion_tokens": self.max_tokens,
            "temperature": self.temperature,
        });

        let url = format!("{}/chat/completions", self.base_url);
        let mut last_error = None;
        let mut body = Value::Null;

        for attempt in 0..=3u32 {
            let response =
                self.client.post(&url).bearer_auth(&self.api_key).json(&payload).send().await;

            match response {
                Ok(resp) => {
                    let status = resp.status();
                    body = resp.json().await.unwrap_or(Value::Null);
                    if status.is_success() {
                        last_error = None;
                        break;
                    }
                    last_error = Some(anyhow::anyhow!("Oracle API error: {body}"));
                }
                Err(err) => {
                    last_error = Some(anyhow::anyhow!("Failed to call oracle: {err}"));
                }
            }

            if attempt < 3 {
                tokio::time::sleep(Duration::from_secs(2_u64.pow(attempt))).await;
            }
        }

        if let Some(err) = last_error {
            return Err(err);
        }

        body.get("choices")
            .and_then(|choices| choices.get(0))
            .and_then(|choice| choice.get("message"))
            .and_then(|message| message.get("content"))
            .and_then(|value| value.as_str())
            .map(|content| content.to_string())
            .ok_or_else(|| anyhow::anyhow!("Missing oracle response content"))
    }
}

#[async_trait]
impl ScoringOracle for AiScoringService {
    async fn score_answer(
        &self,
        question_text: &str,
        reference_answer: &str,
        response: &str,
    ) -> anyhow::Result<OracleScore> {
        let user_prompt = format!(
            "Question: {question_text}\n\
             Reference answer: {reference_answer}\n\
             Student's answer: {}",
            if response.is_empty() { "Not answered" } else { response }
        );

        let reply = self.chat(SCORING_SYSTEM_PROMPT, &user_prompt).await?;
        Ok(parse_score_reply(&reply, SCORE_SCALE_MAX))
    }

    async fn summarize_attempt(
        &self,
        test_title: &str,
        reviews: &[AnswerReview],
        unanswered: &[String],
    ) -> anyhow::Result<String> {
        let total: f64 = reviews.iter().map(|review| review.score).sum();
        let possible: f64 = reviews.iter().map(|review| review.possible).sum();

        let mut user_prompt =
            format!("Test: {test_title}\nTotal score: {total}/{possible}\n\nQuestion-by-question:\n");
        for (index, review) in reviews.iter().enumerate() {
            user_prompt.push_str(&format!(
                "\nQuestion {}: {}\n- Reference answer: {}\n- Student's answer: {}\n- Score: {}/{}\n",
                index + 1,
                review.question_text,
                review.reference_answer,
                review.response.as_deref().unwrap_or("Not answered"),
                review.score,
                review.possible,
            ));
        }
        if !unanswered.is_empty() {
            user_prompt.push_str("\nUnanswered questions:\n");
            for question in unanswered {
                user_prompt.push_str(&format!("- {question}\n"));
            }
        }

        let reply = self.chat(FEEDBACK_SYSTEM_PROMPT, &user_prompt).await?;
        Ok(reply.trim().to_string())
    }
}

/// Parse the oracle's scoring reply: score on the first line, comment on
/// the remaining ones. The score is untrusted input; anything malformed
/// becomes 0.0 with a fallback comment, and numeric values are clamped to
/// the scale, snapped to its step, and capped at `max_marks`.
pub fn parse_score_reply(reply: &str, max_marks: f64) -> OracleScore {
    let text = reply.trim();
    if text.is_empty() {
        return OracleScore {
            score: 0.0,
            comment: "Could not evaluate this answer.".to_string(),
        };
    }

    let mut lines = text.lines();
    let first = lines.next().unwrap_or("").trim();
    let rest = lines.collect::<Vec<_>>().join("\n").trim().to_string();

    let score = match first.parse::<f64>() {
        Ok(raw) => {
            let clamped = raw.clamp(0.0, SCORE_SCALE_MAX);
            let snapped = (clamped / SCORE_STEP).round() * SCORE_STEP;
            snapped.min(max_marks)
        }
        Err(_) => {
            return OracleScore {
                score: 0.0,
                comment: if rest.is_empty() { text.to_string() } else { rest },
            };
        }
    };

    let comment = if rest.is_empty() {
        "No additional feedback provided.".to_string()
    } else {
        rest
    };

    OracleScore { score, comment }
}

/// Degraded result recorded when the oracle is unavailable or returns
/// garbage mid-submit.
pub fn degraded_score() -> OracleScore {
    OracleScore {
        score: 0.0,
        comment: "Automatic scoring was unavailable for this answer.".to_string(),
    }
}

/// Fallback narrative when overall feedback generation fails.
pub fn degraded_feedback() -> String {
    "We could not generate detailed feedback for this attempt. \
     Your answers were scored individually."
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_formed_reply_is_parsed() {
        let parsed = parse_score_reply("1.5\nGood coverage of the main idea.", 2.0);
        assert_eq!(parsed.score, 1.5);
        assert_eq!(parsed.comment, "Good coverage of the main idea.");
    }

    #[test]
    fn score_is_clamped_to_scale() {
        assert_eq!(parse_score_reply("7\nway too generous", 2.0).score, 2.0);
        assert_eq!(parse_score_reply("-3\nharsh", 2.0).score, 0.0);
    }

    #[test]
    fn score_is_snapped_to_half_steps() {
        assert_eq!(parse_score_reply("1.3\nok", 2.0).score, 1.5);
        assert_eq!(parse_score_reply("0.2\nok", 2.0).score, 0.0);
    }

    #[test]
    fn score_is_capped_at_question_marks() {
        assert_eq!(parse_score_reply("2.0\nfull", 1.0).score, 1.0);
    }

    #[test]
    fn malformed_score_degrades_to_zero() {
        let parsed = parse_score_reply("N/A\nCould not grade.", 2.0);
        assert_eq!(parsed.score, 0.0);
        assert_eq!(parsed.comment, "Could not grade.");
    }

    #[test]
    fn empty_reply_degrades_to_zero() {
        let parsed = parse_score_reply("   ", 2.0);
        assert_eq!(parsed.score, 0.0);
        assert_eq!(parsed.comment, "Could not evaluate this answer.");
    }

    #[test]
    fn score_only_reply_gets_default_comment() {
        let parsed = parse_score_reply("2.0", 2.0);
        assert_eq!(parsed.score, 2.0);
        assert_eq!(parsed.comment, "No additional feedback provided.");
    }

    #[test]
    fn multiline_comment_is_preserved() {
        let parsed = parse_score_reply("1.0\nFirst point.\nSecond point.", 2.0);
        assert_eq!(parsed.comment, "First point.\nSecond point.");
    }
}
