use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use super::routes;
use crate::ai::chat::ChatService;
use crate::api::state::{AppState, SharedState};
use crate::core::AppConfig;
use crate::google::GeminiClient;

pub fn app(shared_state: SharedState) -> Router {
    // The browser frontend is served from a different origin
    let cors = CorsLayer::permissive();

    Router::new()
        .merge(routes::router())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(Arc::clone(&shared_state))
}

pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                // axum logs rejections from built-in extractors with the `axum::rejection`
                // target, at `TRACE` level. `axum::rejection=trace` enables showing those events
                format! {
                    "{}=debug,tower_http=debug,axum::rejection=trace",
                    env!("CARGO_CRATE_NAME")
                }
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

// Run the server
pub async fn serve(host: String, port: String, config: AppConfig) -> Result<()> {
    let model = GeminiClient::new(
        &config.api_hostname,
        &config.google_api_key,
        &config.model,
        config.temperature,
    )?;
    let chat = ChatService::from_config(&config, Box::new(model))?;

    tracing::debug!(
        "Using model {} with a {:?} provider timeout, max sessions {:?}, session ttl {:?}",
        config.model,
        config.provider_timeout,
        config.max_sessions,
        config.session_ttl
    );

    let shared_state = Arc::new(AppState::new(chat));
    let app = app(Arc::clone(&shared_state));

    let listener = tokio::net::TcpListener::bind(format!("{}:{}", host, port)).await?;

    tracing::debug!("Server started. Listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
