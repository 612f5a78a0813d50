use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use anyhow::{Error, Result, anyhow};
use thiserror::Error;
use tokio::time::{Instant, timeout_at};

use super::models::{Message, Role};
use crate::ai::prompt::tutor_prompt;
use crate::ai::provider::BoxedLanguageModel;
use crate::chat::{BoxedSessionStore, InMemorySessionStore, SessionPolicy, SessionSummary};
use crate::core::AppConfig;

const DEFAULT_LANGUAGE: &str = "English";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_MAX_MESSAGE_CHARS: usize = 4000;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Message must not be empty")]
    EmptyMessage,
    #[error("Message is {len} characters long, the limit is {max}")]
    MessageTooLong { len: usize, max: usize },
    #[error("Language model request failed: {0:#}")]
    Provider(Error),
    #[error("Language model did not respond within {0:?}")]
    Timeout(Duration),
    #[error("Session store failed: {0:#}")]
    Store(Error),
}

type TurnLock = Arc<tokio::sync::Mutex<()>>;

/// Runs chat turns for many sessions against a single language model.
///
/// Each turn sends the system instruction, the session's full
/// history, and the new user message to the model, then records the
/// user message and reply together. Nothing is recorded when the
/// model fails or times out, and turns on the same session run one at
/// a time so every turn sees the one before it.
///
/// Use `ChatService::builder()` to construct one.
pub struct ChatService {
    model: BoxedLanguageModel,
    store: BoxedSessionStore,
    system_message: String,
    timeout: Duration,
    max_message_chars: usize,
    // Held weakly so finished sessions don't keep their lock alive
    turn_locks: Mutex<HashMap<String, Weak<tokio::sync::Mutex<()>>>>,
}

impl ChatService {
    pub fn builder(model: BoxedLanguageModel) -> ChatServiceBuilder {
        ChatServiceBuilder::new(model)
    }

    pub fn from_config(config: &AppConfig, model: BoxedLanguageModel) -> Result<Self> {
        let policy = SessionPolicy {
            max_sessions: config.max_sessions,
            ttl: config.session_ttl,
        };
        let mut builder = ChatServiceBuilder::new(model)
            .store(Box::new(InMemorySessionStore::new(policy)))
            .language(&config.language)
            .timeout(config.provider_timeout)
            .max_message_chars(config.max_message_chars);
        if let Some(msg) = &config.system_message {
            builder = builder.system_message(msg);
        }
        builder.build()
    }

    pub fn system_message(&self) -> &str {
        &self.system_message
    }

    fn validate(&self, text: &str) -> Result<(), ChatError> {
        if text.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        let len = text.chars().count();
        if len > self.max_message_chars {
            return Err(ChatError::MessageTooLong {
                len,
                max: self.max_message_chars,
            });
        }
        Ok(())
    }

    fn turn_lock(&self, session_id: &str) -> Result<TurnLock> {
        let mut locks = self
            .turn_locks
            .lock()
            .map_err(|_| anyhow!("Turn lock registry poisoned"))?;
        if let Some(lock) = locks.get(session_id).and_then(Weak::upgrade) {
            return Ok(lock);
        }
        locks.retain(|_, lock| lock.strong_count() > 0);
        let lock = Arc::new(tokio::sync::Mutex::new(()));
        locks.insert(session_id.to_string(), Arc::downgrade(&lock));
        Ok(lock)
    }

    /// Continue the conversation `session_id` with the user message
    /// `text` and return the model's reply.
    ///
    /// The timeout covers the whole turn, including time spent queued
    /// behind other turns on the same session.
    pub async fn chat(&self, session_id: &str, text: &str) -> Result<String, ChatError> {
        self.validate(text)?;
        let deadline = Instant::now() + self.timeout;

        let turn = self.turn_lock(session_id).map_err(ChatError::Store)?;
        let Ok(_turn) = timeout_at(deadline, turn.lock()).await else {
            tracing::warn!(
                "Session {}: timed out after {:?} waiting for the previous turn",
                session_id,
                self.timeout
            );
            return Err(ChatError::Timeout(self.timeout));
        };

        let history = self
            .store
            .get_or_create(session_id)
            .await
            .map_err(ChatError::Store)?;

        let user = Message::user(text);
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::new(Role::System, &self.system_message));
        messages.extend(history);
        messages.push(user.clone());

        tracing::debug!(
            "Session {}: sending {} message(s) to {}",
            session_id,
            messages.len(),
            self.model.model_name()
        );

        let reply = match timeout_at(deadline, self.model.generate(&messages)).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(err)) => {
                tracing::warn!("Session {}: language model failed: {:#}", session_id, err);
                return Err(ChatError::Provider(err));
            }
            Err(_) => {
                tracing::warn!(
                    "Session {}: language model timed out after {:?}",
                    session_id,
                    self.timeout
                );
                return Err(ChatError::Timeout(self.timeout));
            }
        };

        self.store
            .append_turn(session_id, user, Message::assistant(&reply))
            .await
            .map_err(ChatError::Store)?;

        Ok(reply)
    }

    /// History of an existing session, `None` if it was never created
    /// or has expired.
    pub async fn transcript(&self, session_id: &str) -> Result<Option<Vec<Message>>> {
        self.store.transcript(session_id).await
    }

    pub async fn sessions(&self) -> Result<Vec<SessionSummary>> {
        self.store.sessions().await
    }
}

pub struct ChatServiceBuilder {
    model: BoxedLanguageModel,
    store: Option<BoxedSessionStore>,
    language: String,
    system_message: Option<String>,
    timeout: Duration,
    max_message_chars: usize,
}

impl ChatServiceBuilder {
    pub fn new(model: BoxedLanguageModel) -> Self {
        Self {
            model,
            store: None,
            language: DEFAULT_LANGUAGE.to_string(),
            system_message: None,
            timeout: DEFAULT_TIMEOUT,
            max_message_chars: DEFAULT_MAX_MESSAGE_CHARS,
        }
    }

    pub fn build(self) -> Result<ChatService> {
        let system_message = match self.system_message {
            Some(msg) => msg,
            None => tutor_prompt(&self.language)?,
        };
        // Unbounded unless the caller supplies a store with a policy
        let store: BoxedSessionStore = match self.store {
            Some(store) => store,
            None => Box::new(InMemorySessionStore::new(SessionPolicy::unbounded())),
        };

        Ok(ChatService {
            model: self.model,
            store,
            system_message,
            timeout: self.timeout,
            max_message_chars: self.max_message_chars,
            turn_locks: Mutex::new(HashMap::new()),
        })
    }

    pub fn store(mut self, store: BoxedSessionStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Language the tutor prompt tells the model to answer in. Ignored
    /// when `system_message` is set.
    pub fn language(mut self, language: &str) -> Self {
        self.language = language.to_string();
        self
    }

    pub fn system_message(mut self, msg: &str) -> Self {
        self.system_message = Some(msg.to_string());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn max_message_chars(mut self, max: usize) -> Self {
        self.max_message_chars = max;
        self
    }
}
