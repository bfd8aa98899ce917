//! Request and response bodies for the HTTP API
//!
//! Domain results (emotion, fusion, transcription, feedback) are serialised
//! straight from the edugame-common types; only envelopes live here.

pub mod requests;
pub mod responses;

pub use requests::{ChatRequest, EmotionTextRequest, FeedbackRequest, LearnerFields};
pub use responses::{AnalyzeCompleteResponse, BannerResponse, HealthResponse, SystemInfo};
