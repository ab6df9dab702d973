use axum::{
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::asr::handler as asr_handler;
use crate::handlers::{audio_chat, health_check, text_chat};
use crate::state::{AppState, AsrState};

pub fn create_routes() -> Router<AppState> {
    Router::new()
        // Audio chat, with the paths earlier clients used
        .route("/v1/audio", post(audio_chat))
        .route("/v1/content", post(audio_chat))
        .route("/app", post(audio_chat))

        .route("/v1/text", post(text_chat))

        // Health check
        .route("/api/health", get(health_check))
}

pub fn create_asr_routes() -> Router<AsrState> {
    Router::new()
        .route("/asr-data-url", post(asr_handler::transcribe_data_url))
        .route("/health", get(asr_handler::health_check))
}

/// Credentialed CORS for the configured origins.
/// Methods and headers mirror the preflight, since `*` is not allowed with credentials.
pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
}

/// App server router with middleware and state applied
pub fn build_app(state: AppState) -> Router {
    let cors = cors_layer(&state.config.app_server.allowed_origins);
    create_routes()
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// ASR server router
pub fn build_asr_app(state: AsrState) -> Router {
    create_asr_routes()
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
