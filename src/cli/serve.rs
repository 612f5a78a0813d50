use anyhow::Result;

use crate::api;
use crate::core::AppConfig;

pub async fn run(host: String, port: String) -> Result<()> {
    api::init_tracing();
    // Refuse to start without a usable config, before binding anything
    let config = AppConfig::from_env()?;
    api::serve(host, port, config).await
}
