//! Reusable prompts using Handlebars for templating. Strict mode is
//! on so a missing parameter is an error instead of an empty string.

use std::fmt;

use anyhow::Result;
use handlebars::Handlebars;
use serde_json::json;

#[derive(Debug)]
pub enum Prompt {
    Tutor,
}

impl fmt::Display for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

const TUTOR_PROMPT: &str = "You are a friendly {{language}} tutor. \
Keep replies simple and encouraging. \
Always respond in {{language}}.";

pub fn templates<'a>() -> Result<Handlebars<'a>> {
    let mut registry = Handlebars::new();
    registry.set_strict_mode(true);
    // The output is plain text sent to the model, not HTML
    registry.register_escape_fn(handlebars::no_escape);
    registry.register_template_string(&Prompt::Tutor.to_string(), TUTOR_PROMPT)?;
    Ok(registry)
}

/// Render the system instruction for a tutor answering in `language`.
pub fn tutor_prompt(language: &str) -> Result<String> {
    let rendered = templates()?.render(&Prompt::Tutor.to_string(), &json!({ "language": language }))?;
    Ok(rendered)
}
