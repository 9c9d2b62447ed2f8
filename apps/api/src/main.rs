mod chat;
mod config;
mod documents;
mod errors;
mod llm_cli;
mod models;
mod parser;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::chat::history::ConversationStore;
use crate::config::Config;
use crate::llm_cli::ClaudeCli;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting CV extraction API v{}", env!("CARGO_PKG_VERSION"));

    // Provision working directories up front so the first request never races
    // their creation.
    tokio::fs::create_dir_all(&config.upload_dir).await?;
    tokio::fs::create_dir_all(&config.parsed_dir).await?;
    info!(
        uploads = %config.upload_dir.display(),
        parsed = %config.parsed_dir.display(),
        "storage directories ready"
    );

    let invoker = Arc::new(ClaudeCli::new(
        config.claude_bin.clone(),
        config.claude_model.clone(),
    ));
    info!(
        binary = %config.claude_bin,
        model = config.claude_model.as_deref().unwrap_or("(default)"),
        "model CLI invoker initialized"
    );

    let conversations = Arc::new(ConversationStore::new(config.chat_history_ttl));

    let state = AppState {
        config: config.clone(),
        invoker,
        conversations,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
