use anyhow::Result;
use std::net::SocketAddr;
use tracing::info;

use voice_assistant_backend::{logging, routes, AsrState, Config};

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_tracing();

    let config = Config::from_env()?;
    let addr: SocketAddr = format!("{}:{}", config.asr_server.host, config.asr_server.port).parse()?;

    // Built once at startup and shared across requests
    let state = AsrState::new(&config)?;
    info!("Recognizer {} ready", state.recognizer.name());

    let app = routes::build_asr_app(state);

    info!("Starting ASR server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
