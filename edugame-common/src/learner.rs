//! Learner context, game session statistics and agent responses

use serde::{Deserialize, Serialize};
use std::fmt;

/// Learner age bracket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgeGroup {
    Child,
    Teen,
    #[default]
    Adult,
}

impl fmt::Display for AgeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AgeGroup::Child => "child",
            AgeGroup::Teen => "teen",
            AgeGroup::Adult => "adult",
        })
    }
}

/// Learner proficiency / game difficulty level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DifficultyLevel {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl fmt::Display for DifficultyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DifficultyLevel::Beginner => "beginner",
            DifficultyLevel::Intermediate => "intermediate",
            DifficultyLevel::Advanced => "advanced",
        })
    }
}

fn default_language() -> String {
    "es".to_string()
}

/// Who the agent is talking to
///
/// Passed by value per request; nothing here is persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserContext {
    pub user_id: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub age_group: AgeGroup,
    #[serde(default)]
    pub current_level: DifficultyLevel,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interests: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub learning_goals: Vec<String>,
}

impl UserContext {
    /// Context with default language (es), adult, beginner
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            language: default_language(),
            age_group: AgeGroup::default(),
            current_level: DifficultyLevel::default(),
            interests: Vec::new(),
            learning_goals: Vec::new(),
        }
    }
}

/// Statistics of one finished game session
///
/// Accepts both snake_case and the camelCase keys sent by the web client.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionStats {
    #[serde(alias = "gameType")]
    pub game_type: String,
    pub difficulty: String,
    #[serde(alias = "correctAnswers")]
    pub correct_answers: u32,
    #[serde(alias = "totalQuestions")]
    pub total_questions: u32,
    #[serde(alias = "timeSpent")]
    pub time_spent_seconds: u64,
    #[serde(alias = "mistakesPattern")]
    pub mistake_patterns: Vec<String>,
}

impl SessionStats {
    /// Percentage of correct answers; 0 when no questions were asked
    pub fn accuracy_percent(&self) -> f64 {
        if self.total_questions == 0 {
            return 0.0;
        }
        self.correct_answers as f64 / self.total_questions as f64 * 100.0
    }
}

/// Feedback produced for a finished session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackResult {
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
    pub insights: Vec<String>,
    pub summary: String,
    pub next_difficulty: DifficultyLevel,
}

/// Reply to a chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub response: String,
    pub confidence: f64,
    #[serde(default)]
    pub suggested_actions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_difficulty: Option<DifficultyLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
