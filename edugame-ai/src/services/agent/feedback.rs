//! Session feedback prompts and templated fallbacks

use super::suggest_next_difficulty;
use edugame_common::{FeedbackResult, SessionStats, UserContext};

/// Maximum characters of model output kept as the summary
pub const SUMMARY_MAX_CHARS: usize = 200;

const EMPTY_SUMMARY: &str = "Keep up the great work!";

/// Languages with shipped templates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateLanguage {
    Es,
    En,
}

impl TemplateLanguage {
    /// Template language for a context language code
    ///
    /// Region suffixes are ignored ("en-US" → En); anything without a
    /// template uses Spanish.
    pub fn for_code(code: &str) -> Self {
        let primary = code
            .trim()
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        match primary.as_str() {
            "en" => TemplateLanguage::En,
            _ => TemplateLanguage::Es,
        }
    }
}

/// Prompt asking the model to review a finished session
pub fn feedback_prompt(session: &SessionStats, context: &UserContext) -> String {
    let accuracy = session.accuracy_percent();
    let mistakes = if session.mistake_patterns.is_empty() {
        "none recorded".to_string()
    } else {
        session.mistake_patterns.join(", ")
    };
    let game_type = if session.game_type.is_empty() {
        "unknown"
    } else {
        session.game_type.as_str()
    };
    let difficulty = if session.difficulty.is_empty() {
        "beginner"
    } else {
        session.difficulty.as_str()
    };

    format!(
        "Analyze this learning session and provide encouraging feedback in {language}:\n\
         \n\
         Game Type: {game_type}\n\
         Difficulty: {difficulty}\n\
         Score: {correct}/{total} ({accuracy:.1}%)\n\
         Time Spent: {time} seconds\n\
         Common Mistakes: {mistakes}\n\
         \n\
         Provide:\n\
         1. One encouraging strength the user demonstrated\n\
         2. One specific area for improvement\n\
         3. One actionable tip for next session\n\
         4. A warm, motivational summary (2-3 sentences)\n\
         \n\
         Keep it concise, positive, and culturally sensitive.",
        language = context.language,
        correct = session.correct_answers,
        total = session.total_questions,
        time = session.time_spent_seconds,
    )
}

/// First [`SUMMARY_MAX_CHARS`] characters of the model output
pub fn summarize(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return EMPTY_SUMMARY.to_string();
    }
    trimmed.chars().take(SUMMARY_MAX_CHARS).collect()
}

/// Feedback built around a generated summary
pub fn generated_feedback(accuracy: f64, generated: &str) -> FeedbackResult {
    FeedbackResult {
        strengths: vec!["Great effort and persistence!".to_string()],
        improvements: vec!["Focus on grammar patterns".to_string()],
        insights: vec![format!(
            "You completed the session with {:.0}% accuracy",
            accuracy
        )],
        summary: summarize(generated),
        next_difficulty: suggest_next_difficulty(accuracy),
    }
}

/// Deterministic feedback used when generation fails
pub fn fallback_feedback(accuracy: f64, language: TemplateLanguage) -> FeedbackResult {
    let (summary, strength, improvement, insight) = match language {
        TemplateLanguage::Es => (
            if accuracy >= 80.0 {
                "¡Excelente trabajo! Estás progresando muy bien."
            } else if accuracy >= 60.0 {
                "Buen esfuerzo. Con un poco más de práctica, mejorarás aún más."
            } else {
                "Sigue intentándolo. Cada error es una oportunidad para aprender."
            },
            "Completaste la actividad con dedicación",
            "Practica más para mejorar tu precisión",
            format!("Precisión: {:.0}%", accuracy),
        ),
        TemplateLanguage::En => (
            if accuracy >= 80.0 {
                "Excellent work! You are making great progress."
            } else if accuracy >= 60.0 {
                "Good effort. With a little more practice you will improve even more."
            } else {
                "Keep trying. Every mistake is a chance to learn."
            },
            "You completed the activity with dedication",
            "Practice more to improve your accuracy",
            format!("Accuracy: {:.0}%", accuracy),
        ),
    };

    FeedbackResult {
        strengths: vec![strength.to_string()],
        improvements: vec![improvement.to_string()],
        insights: vec![insight],
        summary: summary.to_string(),
        next_difficulty: suggest_next_difficulty(accuracy),
    }
}

/// Chat reply used when generation fails
pub fn apology(language: TemplateLanguage) -> &'static str {
    match language {
        TemplateLanguage::Es => {
            "Lo siento, tuve un problema procesando tu mensaje. ¿Puedes intentarlo de nuevo?"
        }
        TemplateLanguage::En => {
            "Sorry, I had a problem processing your message. Could you try again?"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edugame_common::DifficultyLevel;

    #[test]
    fn template_language_ignores_region() {
        assert_eq!(TemplateLanguage::for_code("en-US"), TemplateLanguage::En);
        assert_eq!(TemplateLanguage::for_code("EN"), TemplateLanguage::En);
        assert_eq!(TemplateLanguage::for_code("es"), TemplateLanguage::Es);
        assert_eq!(TemplateLanguage::for_code("ar"), TemplateLanguage::Es);
        assert_eq!(TemplateLanguage::for_code(""), TemplateLanguage::Es);
    }

    #[test]
    fn spanish_fallback_bands() {
        let high = fallback_feedback(80.0, TemplateLanguage::Es);
        let mid = fallback_feedback(60.0, TemplateLanguage::Es);
        let low = fallback_feedback(59.9, TemplateLanguage::Es);

        assert_eq!(high.summary, "¡Excelente trabajo! Estás progresando muy bien.");
        assert_eq!(mid.summary, "Buen esfuerzo. Con un poco más de práctica, mejorarás aún más.");
        assert_eq!(low.summary, "Sigue intentándolo. Cada error es una oportunidad para aprender.");
        assert_eq!(high.insights, vec!["Precisión: 80%".to_string()]);
    }

    #[test]
    fn english_fallback_bands() {
        assert!(fallback_feedback(95.0, TemplateLanguage::En).summary.starts_with("Excellent"));
        assert!(fallback_feedback(70.0, TemplateLanguage::En).summary.starts_with("Good effort"));
        assert!(fallback_feedback(10.0, TemplateLanguage::En).summary.starts_with("Keep trying"));
    }

    #[test]
    fn fallback_difficulty_follows_ladder() {
        assert_eq!(
            fallback_feedback(90.0, TemplateLanguage::Es).next_difficulty,
            DifficultyLevel::Intermediate
        );
        assert_eq!(
            fallback_feedback(85.0, TemplateLanguage::Es).next_difficulty,
            DifficultyLevel::Beginner
        );
    }

    #[test]
    fn summary_truncates_on_characters() {
        let long = "ñ".repeat(300);
        assert_eq!(summarize(&long).chars().count(), SUMMARY_MAX_CHARS);
        assert_eq!(summarize("   "), "Keep up the great work!");
    }

    #[test]
    fn prompt_mentions_score_and_language() {
        let session = SessionStats {
            game_type: "vocabulary".into(),
            correct_answers: 7,
            total_questions: 10,
            mistake_patterns: vec!["articles".into()],
            ..Default::default()
        };
        let prompt = feedback_prompt(&session, &UserContext::new("u1"));
        assert!(prompt.contains("feedback in es"));
        assert!(prompt.contains("Score: 7/10 (70.0%)"));
        assert!(prompt.contains("Common Mistakes: articles"));
        assert!(prompt.contains("Difficulty: beginner"));
    }
}
