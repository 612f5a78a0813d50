use anyhow::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use crate::ai::chat::ChatService;
use crate::core::AppConfig;
use crate::google::GeminiClient;

pub async fn run(session_id: &str) -> Result<()> {
    let config = AppConfig::from_env()?;
    let model = GeminiClient::new(
        &config.api_hostname,
        &config.google_api_key,
        &config.model,
        config.temperature,
    )?;
    let chat = ChatService::from_config(&config, Box::new(model))?;

    let mut rl = DefaultEditor::new()?;

    loop {
        let readline = rl.readline(">>> ");
        match readline {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line.as_str());
                // A failed turn leaves the session as it was, so keep going
                match chat.chat(session_id, &line).await {
                    Ok(reply) => println!("{}", reply),
                    Err(err) => eprintln!("Error: {}", err),
                }
            }
            Err(ReadlineError::Interrupted) => break,
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        }
    }

    Ok(())
}
