//! Public types for the chat API
use serde::{Deserialize, Serialize};

use crate::ai::chat::Message;
use crate::chat::SessionSummary;

pub const DEFAULT_SESSION_ID: &str = "default";

fn default_session_id() -> String {
    DEFAULT_SESSION_ID.to_string()
}

#[derive(Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default = "default_session_id")]
    pub session_id: String,
}

#[derive(Serialize, Deserialize)]
pub struct ChatResponse {
    pub reply: String,
}

impl ChatResponse {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.into(),
        }
    }
}

#[derive(Serialize)]
pub struct ChatTranscriptResponse {
    pub session_id: String,
    pub transcript: Vec<Message>,
}

#[derive(Serialize)]
pub struct ChatSessionsResponse {
    pub sessions: Vec<SessionSummary>,
}
