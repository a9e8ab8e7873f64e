use std::sync::Arc;

use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use academic_assistant::config::AppConfig;
use academic_assistant::handlers;
use academic_assistant::services::ai::provider_from_config;
use academic_assistant::services::api::RestClient;
use academic_assistant::services::conversation::ChatSession;
use academic_assistant::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let llm = provider_from_config(&config)?;
    tracing::info!("records API at {}", config.api_base_url);
    let api = RestClient::new(config.api_base_url.clone());

    let state = Arc::new(AppState {
        config: config.clone(),
        llm,
        api: Box::new(api),
        session: Mutex::new(ChatSession::new()),
    });

    let app = handlers::router(state).layer(TraceLayer::new_for_http());

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
