//! Conversational agent
//!
//! Wraps a [`LanguageModel`] for two jobs:
//! - **Chat**: a tool-calling loop (bounded iterations) with a short
//!   per-user conversation memory
//! - **Session feedback**: one completion summarising a finished game, with
//!   a templated fallback keyed by accuracy when generation fails
//!
//! Neither operation returns an error to the caller; failures become the
//! localized apology reply or the fallback feedback.

pub mod feedback;
pub mod tools;

use crate::backends::{BackendError, ChatMessage, LanguageModel, ToolSpec};
use edugame_common::{ChatReply, DifficultyLevel, FeedbackResult, SessionStats, UserContext};
use feedback::TemplateLanguage;
use lru::LruCache;
use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Reply confidence reported for a successful chat turn
pub const CHAT_CONFIDENCE: f64 = 0.85;

/// Accuracy at or above which the learner moves up
const PROMOTION_ACCURACY: f64 = 90.0;

/// Next difficulty from session accuracy (percent)
///
/// Only promotes beginner → intermediate; "advanced" is never suggested.
pub fn suggest_next_difficulty(accuracy: f64) -> DifficultyLevel {
    if accuracy >= PROMOTION_ACCURACY {
        DifficultyLevel::Intermediate
    } else {
        DifficultyLevel::Beginner
    }
}

/// Agent limits
#[derive(Debug, Clone)]
pub struct AgentSettings {
    /// Tool-calling rounds before the model must answer in text
    pub max_iterations: usize,
    /// Messages of history kept per user
    pub memory_window: usize,
    /// Users whose history is kept; the least recently active is dropped first
    pub memory_users: usize,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_iterations: 3,
            memory_window: 20,
            memory_users: 1000,
        }
    }
}

/// Tutor agent over a language model
pub struct ConversationalAgent {
    model: Arc<dyn LanguageModel>,
    settings: AgentSettings,
    tools: Vec<ToolSpec>,
    memory: Mutex<LruCache<String, VecDeque<ChatMessage>>>,
}

fn context_summary(context: &UserContext) -> String {
    let mut summary = format!(
        "Language: {}, Level: {}, Age: {}",
        context.language, context.current_level, context.age_group
    );
    if !context.interests.is_empty() {
        summary.push_str(&format!(", Interests: {}", context.interests.join(", ")));
    }
    if !context.learning_goals.is_empty() {
        summary.push_str(&format!(", Goals: {}", context.learning_goals.join(", ")));
    }
    summary
}

fn system_prompt(context: &UserContext, extra: Option<&serde_json::Value>) -> String {
    let mut prompt = format!(
        "You are an empathetic educational AI assistant helping refugees and migrants learn \
         new languages and integrate into their new communities.\n\
         Always respond in the user's preferred language ({}). Be encouraging, patient, and \
         culturally sensitive. Use the available tools when they help you personalise your \
         answer.\n\n\
         User Context: {}",
        context.language,
        context_summary(context)
    );
    if let Some(extra) = extra.filter(|v| !v.is_null()) {
        prompt.push_str(&format!("\nAdditional Context: {}", extra));
    }
    prompt
}

impl ConversationalAgent {
    pub fn new(model: Arc<dyn LanguageModel>, settings: AgentSettings) -> Self {
        let capacity = NonZeroUsize::new(settings.memory_users).unwrap_or(NonZeroUsize::MIN);
        Self {
            model,
            settings,
            tools: tools::tool_specs(),
            memory: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Conversation history kept for a user
    pub async fn history(&self, user_id: &str) -> Vec<ChatMessage> {
        self.memory
            .lock()
            .await
            .peek(user_id)
            .map(|h| h.iter().cloned().collect())
            .unwrap_or_default()
    }

    async fn remember(&self, user_id: &str, user_message: &str, reply: &str) {
        let mut memory = self.memory.lock().await;
        let history = memory.get_or_insert_mut(user_id.to_string(), VecDeque::new);
        history.push_back(ChatMessage::user(user_message));
        history.push_back(ChatMessage::assistant(reply));
        while history.len() > self.settings.memory_window {
            history.pop_front();
        }
    }

    /// Run the tool loop for one user message
    ///
    /// Returns the reply text and the tools invoked, in first-use order.
    async fn run_turn(
        &self,
        message: &str,
        context: &UserContext,
        extra: Option<&serde_json::Value>,
    ) -> Result<(String, Vec<String>), BackendError> {
        let mut messages = vec![ChatMessage::system(system_prompt(context, extra))];
        messages.extend(self.history(&context.user_id).await);
        messages.push(ChatMessage::user(message));

        let mut tools_used: Vec<String> = Vec::new();

        for iteration in 0..self.settings.max_iterations {
            let completion = self.model.complete(&messages, &self.tools).await?;

            if completion.tool_calls.is_empty() {
                if let Some(content) = completion.content {
                    return Ok((content.trim().to_string(), tools_used));
                }
                return Err(BackendError::Parse("empty response from language model".to_string()));
            }

            debug!(
                iteration,
                calls = completion.tool_calls.len(),
                "Language model requested tools"
            );
            messages.push(ChatMessage::assistant_tool_calls(completion.tool_calls.clone()));
            for call in &completion.tool_calls {
                let result = tools::execute(call, context);
                messages.push(ChatMessage::tool_result(&call.id, result.to_string()));
                if !tools_used.contains(&call.name) {
                    tools_used.push(call.name.clone());
                }
            }
        }

        // Iterations exhausted: the model has to answer without tools
        let completion = self.model.complete(&messages, &[]).await?;
        match completion.content {
            Some(content) => Ok((content.trim().to_string(), tools_used)),
            None => Err(BackendError::Parse("empty response from language model".to_string())),
        }
    }

    /// Answer a learner's message
    pub async fn chat(
        &self,
        message: &str,
        context: &UserContext,
        extra: Option<&serde_json::Value>,
    ) -> ChatReply {
        match self.run_turn(message, context, extra).await {
            Ok((response, suggested_actions)) => {
                self.remember(&context.user_id, message, &response).await;
                info!(
                    user_id = %context.user_id,
                    tools = suggested_actions.len(),
                    chars = response.len(),
                    "Chat reply generated"
                );
                ChatReply {
                    response,
                    confidence: CHAT_CONFIDENCE,
                    suggested_actions,
                    next_difficulty: Some(context.current_level),
                    error: None,
                }
            }
            Err(e) => {
                warn!(user_id = %context.user_id, error = %e, "Chat generation failed");
                ChatReply {
                    response: feedback::apology(TemplateLanguage::for_code(&context.language))
                        .to_string(),
                    confidence: 0.0,
                    suggested_actions: Vec::new(),
                    next_difficulty: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// Feedback for a finished game session
    pub async fn generate_feedback(
        &self,
        session: &SessionStats,
        context: &UserContext,
    ) -> FeedbackResult {
        let accuracy = session.accuracy_percent();
        let prompt = feedback::feedback_prompt(session, context);

        match self.model.complete(&[ChatMessage::user(prompt)], &[]).await {
            Ok(completion) => {
                info!(
                    user_id = %context.user_id,
                    accuracy = format!("{:.1}", accuracy),
                    "Session feedback generated"
                );
                feedback::generated_feedback(accuracy, completion.content.as_deref().unwrap_or(""))
            }
            Err(e) => {
                warn!(
                    user_id = %context.user_id,
                    error = %e,
                    "Feedback generation failed, using templates"
                );
                feedback::fallback_feedback(accuracy, TemplateLanguage::for_code(&context.language))
            }
        }
    }
}
