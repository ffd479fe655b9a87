//! Deterministic scoring: objective marks, aggregates, verdicts, and the
//! score-band feedback used for attempts without free-text questions.

/// Full marks when the chosen option is the correct one, zero otherwise.
pub fn objective_marks(question_marks: f64, selected_correct: bool) -> f64 {
    if selected_correct {
        question_marks
    } else {
        0.0
    }
}

/// Score as a percentage of the possible marks. An empty denominator is
/// reported as zero, never as an arithmetic error.
pub fn percentage(total_score: f64, total_possible: f64) -> f64 {
    if total_possible > 0.0 {
        total_score / total_possible * 100.0
    } else {
        0.0
    }
}

pub fn is_passing(percent: f64, passing_percent: f64) -> bool {
    percent >= passing_percent
}

/// Templated feedback for objectively scored attempts.
pub fn band_feedback(percent: f64) -> &'static str {
    if percent >= 90.0 {
        "Excellent! Perfect score!"
    } else if percent >= 70.0 {
        "Good job! You passed."
    } else {
        "Keep practicing! Review the material and try again."
    }
}

/// Comment attached to the zero-score placeholder of an unanswered
/// question.
pub fn unanswered_comment(topic_title: &str) -> String {
    format!("You did not answer this question. Study {topic_title}.")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correct_option_earns_full_marks() {
        assert_eq!(objective_marks(2.0, true), 2.0);
        assert_eq!(objective_marks(2.0, false), 0.0);
    }

    #[test]
    fn percentage_handles_empty_denominator() {
        assert_eq!(percentage(5.0, 10.0), 50.0);
        assert_eq!(percentage(0.0, 0.0), 0.0);
    }

    #[test]
    fn band_feedback_boundaries() {
        assert_eq!(band_feedback(95.0), "Excellent! Perfect score!");
        assert_eq!(band_feedback(90.0), "Excellent! Perfect score!");
        assert_eq!(band_feedback(89.9), "Good job! You passed.");
        assert_eq!(band_feedback(70.0), "Good job! You passed.");
        assert_eq!(
            band_feedback(69.9),
            "Keep practicing! Review the material and try again."
        );
    }

    #[test]
    fn passing_threshold_is_inclusive() {
        assert!(is_passing(60.0, 60.0));
        assert!(is_passing(70.0, 60.0));
        assert!(!is_passing(50.0, 60.0));
    }
}
