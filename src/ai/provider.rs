use anyhow::{Error, Result};
use async_trait::async_trait;

use super::chat::Message;

/// A hosted text generation model. Given the full message list (system
/// instruction, prior history, and the new user message) it returns a
/// single completion.
#[async_trait]
pub trait LanguageModel {
    async fn generate(&self, messages: &[Message]) -> Result<String, Error>;

    /// Name used in logs
    fn model_name(&self) -> String;
}

pub type BoxedLanguageModel = Box<dyn LanguageModel + Send + Sync + 'static>;
