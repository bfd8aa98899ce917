//! Tools offered to the language model during chat
//!
//! `calculate_adaptive_difficulty` is computed locally from the same ladder
//! as session feedback. The other tools acknowledge the request with a
//! structured result so the model can phrase the answer itself.

use super::suggest_next_difficulty;
use crate::backends::{ToolCall, ToolSpec};
use edugame_common::UserContext;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

pub const GENERATE_ADAPTIVE_QUESTION: &str = "generate_adaptive_question";
pub const PROVIDE_EDUCATIONAL_FEEDBACK: &str = "provide_educational_feedback";
pub const RECOMMEND_LEARNING_PATH: &str = "recommend_learning_path";
pub const CALCULATE_ADAPTIVE_DIFFICULTY: &str = "calculate_adaptive_difficulty";

/// Tool definitions sent with every tool-enabled completion
pub fn tool_specs() -> Vec<ToolSpec> {
    vec![
        ToolSpec {
            name: GENERATE_ADAPTIVE_QUESTION.to_string(),
            description: "Generate a personalized question based on user level and subject"
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "subject": {"type": "string", "description": "Topic of the question"},
                    "difficulty": {"type": "string", "enum": ["beginner", "intermediate", "advanced"]}
                },
                "required": ["subject"]
            }),
        },
        ToolSpec {
            name: PROVIDE_EDUCATIONAL_FEEDBACK.to_string(),
            description: "Provide pedagogical feedback on the user's answer".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "user_answer": {"type": "string"},
                    "correct_answer": {"type": "string"},
                    "context": {"type": "string"}
                },
                "required": ["user_answer"]
            }),
        },
        ToolSpec {
            name: RECOMMEND_LEARNING_PATH.to_string(),
            description: "Recommend next learning topics based on user progress".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "current_topic": {"type": "string"}
                }
            }),
        },
        ToolSpec {
            name: CALCULATE_ADAPTIVE_DIFFICULTY.to_string(),
            description: "Calculate next difficulty level based on performance".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "accuracy": {"type": "number", "description": "Percentage of correct answers (0-100)"},
                    "time_spent": {"type": "number", "description": "Seconds spent on the activity"}
                },
                "required": ["accuracy"]
            }),
        },
    ]
}

#[derive(Debug, Deserialize)]
struct DifficultyArgs {
    accuracy: f64,
    #[serde(default)]
    time_spent: Option<f64>,
}

fn parse_arguments(call: &ToolCall) -> Result<Value, String> {
    if call.arguments.trim().is_empty() {
        return Ok(json!({}));
    }
    serde_json::from_str(&call.arguments)
        .map_err(|e| format!("invalid arguments for {}: {}", call.name, e))
}

/// Run one tool call and return its JSON result
///
/// Bad arguments and unknown tools produce an `error` result for the model
/// rather than failing the turn.
pub fn execute(call: &ToolCall, context: &UserContext) -> Value {
    debug!(tool = %call.name, arguments = %call.arguments, "Executing tool call");

    let args = match parse_arguments(call) {
        Ok(args) => args,
        Err(e) => return json!({ "error": e }),
    };

    match call.name.as_str() {
        GENERATE_ADAPTIVE_QUESTION => json!({
            "status": "ok",
            "subject": args.get("subject").cloned().unwrap_or(Value::Null),
            "difficulty": args
                .get("difficulty")
                .cloned()
                .unwrap_or_else(|| json!(context.current_level)),
            "language": context.language,
            "age_group": context.age_group,
        }),
        PROVIDE_EDUCATIONAL_FEEDBACK => json!({
            "status": "ok",
            "user_answer": args.get("user_answer").cloned().unwrap_or(Value::Null),
            "correct_answer": args.get("correct_answer").cloned().unwrap_or(Value::Null),
            "language": context.language,
        }),
        RECOMMEND_LEARNING_PATH => json!({
            "status": "ok",
            "user_id": context.user_id,
            "current_topic": args.get("current_topic").cloned().unwrap_or(Value::Null),
            "current_level": context.current_level,
            "interests": context.interests,
            "learning_goals": context.learning_goals,
        }),
        CALCULATE_ADAPTIVE_DIFFICULTY => match serde_json::from_value::<DifficultyArgs>(args) {
            Ok(args) => json!({
                "accuracy": args.accuracy,
                "time_spent": args.time_spent,
                "next_difficulty": suggest_next_difficulty(args.accuracy),
            }),
            Err(e) => json!({ "error": format!("invalid arguments for {}: {}", call.name, e) }),
        },
        other => json!({ "error": format!("unknown tool: {}", other) }),
    }
}
