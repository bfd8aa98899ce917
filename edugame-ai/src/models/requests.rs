//! JSON request bodies

use edugame_common::{AgeGroup, DifficultyLevel, SessionStats, UserContext};
use serde::Deserialize;
use serde_json::Value;

/// Learner fields shared by the chat and feedback requests
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LearnerFields {
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub age_group: Option<AgeGroup>,
    #[serde(default)]
    pub current_level: Option<DifficultyLevel>,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    pub learning_goals: Vec<String>,
}

impl LearnerFields {
    /// Context for `user_id`, defaulting whatever the request left out
    pub fn user_context(&self, user_id: &str) -> UserContext {
        let mut context = UserContext::new(user_id);
        if let Some(language) = self.language.as_deref().filter(|l| !l.trim().is_empty()) {
            context.language = language.trim().to_string();
        }
        if let Some(age_group) = self.age_group {
            context.age_group = age_group;
        }
        if let Some(level) = self.current_level {
            context.current_level = level;
        }
        context.interests = self.interests.clone();
        context.learning_goals = self.learning_goals.clone();
        context
    }
}

/// POST /chat
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub user_id: String,
    pub message: String,
    #[serde(flatten)]
    pub learner: LearnerFields,
    /// Free-form context forwarded to the model
    #[serde(default)]
    pub context: Option<Value>,
}

/// POST /feedback
#[derive(Debug, Clone, Deserialize)]
pub struct FeedbackRequest {
    pub user_id: String,
    #[serde(alias = "gameSession")]
    pub game_session: SessionStats,
    #[serde(flatten)]
    pub learner: LearnerFields,
}

/// POST /emotion/text
#[derive(Debug, Clone, Deserialize)]
pub struct EmotionTextRequest {
    pub text: String,
    /// Accepted for client compatibility; not used by the classifier
    #[serde(default)]
    pub context: Option<Value>,
}
