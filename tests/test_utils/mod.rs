//! Test utilities for integration tests
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Error, Result, anyhow};
use async_trait::async_trait;
use axum::{Router, body::Body, http::Request};

use tutor::ai::chat::{ChatService, Message};
use tutor::ai::provider::LanguageModel;
use tutor::api::{AppState, app};
use tutor::core::AppConfig;

pub type Calls = Arc<Mutex<Vec<Vec<Message>>>>;

/// A language model that answers from a script and records the
/// messages of every call.
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<String, String>>>,
    calls: Calls,
    delay: Option<Duration>,
}

impl ScriptedModel {
    pub fn new(replies: Vec<Result<&str, &str>>) -> (Self, Calls) {
        let calls = Calls::default();
        let model = Self {
            replies: Mutex::new(
                replies
                    .into_iter()
                    .map(|r| r.map(String::from).map_err(String::from))
                    .collect(),
            ),
            calls: Arc::clone(&calls),
            delay: None,
        };
        (model, calls)
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn generate(&self, messages: &[Message]) -> Result<String, Error> {
        self.calls.lock().unwrap().push(messages.to_vec());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.replies.lock().unwrap().pop_front();
        match next {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(err)) => Err(anyhow!(err)),
            None => Ok("default reply".to_string()),
        }
    }

    fn model_name(&self) -> String {
        "scripted".to_string()
    }
}

/// Config as if only the API key was set, pointing at `api_hostname`.
pub fn test_config(api_hostname: &str) -> AppConfig {
    let api_hostname = api_hostname.to_string();
    AppConfig::from_lookup(move |key| match key {
        "GOOGLE_API_KEY" => Some("test-api-key".to_string()),
        "TUTOR_API_HOSTNAME" => Some(api_hostname.clone()),
        _ => None,
    })
    .expect("Failed to build test config")
}

/// Creates a test application router around `chat`.
pub fn test_app_with(chat: ChatService) -> Router {
    app(Arc::new(AppState::new(chat)))
}

/// Creates a test application router backed by `model` with the
/// default chat settings.
pub fn test_app(model: ScriptedModel) -> Router {
    let chat = ChatService::builder(Box::new(model))
        .build()
        .expect("Failed to build chat service");
    test_app_with(chat)
}

pub fn post_chat(body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .uri("/chat")
        .method("POST")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub async fn body_to_string(body: Body) -> String {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Failed to read body");
    String::from_utf8(bytes.to_vec()).expect("Body is not utf-8")
}

pub async fn body_to_json(body: Body) -> serde_json::Value {
    serde_json::from_str(&body_to_string(body).await).expect("Body is not JSON")
}
