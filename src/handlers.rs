use axum::{
    extract::{rejection::JsonRejection, State},
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use crate::asr::{data_url, Transcription};
use crate::conversations::{resolve_session_id, Turn};
use crate::error::VoiceError;
use crate::state::AppState;

pub const SESSION_COOKIE: &str = "session_id";

/// Body of `POST /v1/audio`
#[derive(Debug, Deserialize)]
pub struct AudioChatRequest {
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub config: Option<Value>,
}

/// Body of `POST /v1/text`
#[derive(Debug, Deserialize)]
pub struct TextChatRequest {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AudioChatResponse {
    pub asr: Transcription,
    pub llm: String,
    pub history: Vec<Turn>,
}

#[derive(Debug, Serialize)]
pub struct TextChatResponse {
    pub llm: String,
    pub history: Vec<Turn>,
}

fn session_cookie(session_id: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, session_id))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .build()
}

fn presented_session(jar: &CookieJar) -> Option<&str> {
    jar.get(SESSION_COOKIE).map(|c| c.value())
}

/// Audio turn: data URL -> ASR service -> conversation
pub async fn audio_chat(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: Result<Json<AudioChatRequest>, JsonRejection>,
) -> Response {
    match audio_turn(&state, &jar, payload).await {
        Ok((session_id, body)) => (jar.add(session_cookie(session_id)), Json(body)).into_response(),
        Err(e) => e.into_http_response(state.legacy_status_codes()),
    }
}

async fn audio_turn(
    state: &AppState,
    jar: &CookieJar,
    payload: Result<Json<AudioChatRequest>, JsonRejection>,
) -> Result<(String, AudioChatResponse), VoiceError> {
    let Json(request) = payload.map_err(|e| VoiceError::InvalidInput(e.body_text()))?;
    let file = request
        .file
        .filter(|f| !f.is_empty())
        .ok_or_else(|| VoiceError::InvalidInput("Missing data_url".to_string()))?;
    // Reject obviously malformed uploads before the round trip
    data_url::extract_payload(&file)?;
    let config = request.config.unwrap_or_else(|| json!({}));

    let asr = state.asr_service.transcribe_data_url(&file, &config).await?;
    info!("Transcribed {} chars, language {:?}", asr.text.len(), asr.language);

    let session_id = resolve_session_id(presented_session(jar));
    let outcome = state
        .orchestrator
        .converse(&session_id, &asr.text, asr.language.as_deref())
        .await?;

    Ok((
        outcome.session_id,
        AudioChatResponse {
            asr,
            llm: outcome.reply,
            history: outcome.history,
        },
    ))
}

/// Text turn: skips ASR, language comes from the request
pub async fn text_chat(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: Result<Json<TextChatRequest>, JsonRejection>,
) -> Response {
    match text_turn(&state, &jar, payload).await {
        Ok((session_id, body)) => (jar.add(session_cookie(session_id)), Json(body)).into_response(),
        Err(e) => e.into_http_response(state.legacy_status_codes()),
    }
}

async fn text_turn(
    state: &AppState,
    jar: &CookieJar,
    payload: Result<Json<TextChatRequest>, JsonRejection>,
) -> Result<(String, TextChatResponse), VoiceError> {
    let Json(request) = payload.map_err(|e| VoiceError::InvalidInput(e.body_text()))?;
    let text = request
        .text
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| VoiceError::InvalidInput("Missing text".to_string()))?;

    let session_id = resolve_session_id(presented_session(jar));
    let outcome = state
        .orchestrator
        .converse(&session_id, &text, request.language.as_deref())
        .await?;

    Ok((
        outcome.session_id,
        TextChatResponse {
            llm: outcome.reply,
            history: outcome.history,
        },
    ))
}

pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let asr_healthy = state.asr_service.health_check().await;
    Json(json!({
        "status": "ok",
        "asr_service": asr_healthy,
        "sessions": state.store().session_count()
    }))
}
