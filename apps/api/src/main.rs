mod config;
mod errors;
mod llm_client;
mod models;
mod pipeline;
mod routes;
mod state;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::pipeline::compile::PdfLatex;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Fails fast when GOOGLE_API_KEY is missing
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting resume render service v{}", env!("CARGO_PKG_VERSION"));
    info!("{config:?}");

    let llm = LlmClient::new(
        config.google_api_key.clone(),
        config.gemini_api_base.clone(),
        config.gemini_model.clone(),
        config.generation_attempt_timeout(),
        config.generation_max_retries,
    )?;
    info!("LLM client initialized (model: {})", llm.model());

    let compiler = PdfLatex::new(config.latex_compiler.clone());
    info!("LaTeX compiler: {}", compiler.program());

    let port = config.port;
    let state = AppState::new(config, Arc::new(llm), Arc::new(compiler));

    state
        .artifacts
        .ensure_dir()
        .await
        .with_context(|| format!("creating {}", state.artifacts.dir().display()))?;
    match state.templates.list().await {
        Ok(ids) => info!(
            "Templates available in {}: {ids:?}",
            state.templates.dir().display()
        ),
        Err(e) => tracing::warn!("Template directory unreadable: {e}"),
    }
    let _sweeper = state.artifacts.spawn_retention_sweeper();

    let app = build_router(state).layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
