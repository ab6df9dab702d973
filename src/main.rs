use anyhow::Result;
use std::net::SocketAddr;
use tracing::info;

use voice_assistant_backend::{logging, routes, AppState, Config};

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_tracing();

    let config = Config::from_env()?;
    info!(
        "LLM provider {} ({}), ASR service at {}",
        config.llm.provider, config.llm.model, config.app_server.asr_service_url
    );

    let addr: SocketAddr = format!("{}:{}", config.app_server.host, config.app_server.port).parse()?;
    let app_state = AppState::new(config)?;
    let app = routes::build_app(app_state);

    info!("Starting app server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
