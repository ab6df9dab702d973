use axum::{
    extract::{rejection::JsonRejection, State},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Instant;
use tracing::info;

use super::data_url;
use super::recognizer::Transcription;
use crate::error::VoiceError;
use crate::state::AsrState;

/// Body of `POST /asr-data-url`
#[derive(Debug, Deserialize)]
pub struct DataUrlRequest {
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub config: Option<AsrRequestConfig>,
}

/// Per-request recognizer options; unknown keys are ignored
#[derive(Debug, Default, Deserialize)]
pub struct AsrRequestConfig {
    #[serde(default)]
    pub language: Option<String>,
}

pub async fn transcribe_data_url(
    State(state): State<AsrState>,
    payload: Result<Json<DataUrlRequest>, JsonRejection>,
) -> Response {
    match run_transcription(&state, payload).await {
        Ok(transcription) => Json(transcription).into_response(),
        Err(e) => e.into_http_response(state.legacy_status_codes),
    }
}

async fn run_transcription(
    state: &AsrState,
    payload: Result<Json<DataUrlRequest>, JsonRejection>,
) -> Result<Transcription, VoiceError> {
    let Json(request) = payload.map_err(|e| VoiceError::InvalidInput(e.body_text()))?;
    let data_url = request
        .file
        .filter(|f| !f.is_empty())
        .ok_or_else(|| VoiceError::InvalidInput("Missing data_url".to_string()))?;
    let language = request
        .config
        .and_then(|c| c.language)
        .filter(|l| !l.trim().is_empty());

    let audio_bytes = data_url::decode(&data_url)?;

    let start = Instant::now();
    let audio = state.normalizer.normalize(&audio_bytes).await?;
    let transcription = state
        .recognizer
        .transcribe(&audio, language.as_deref())
        .await?;
    info!(
        "ASR time: {:.2} seconds ({:.2}s of audio, language {:?})",
        start.elapsed().as_secs_f64(),
        audio.duration_secs(),
        transcription.language
    );

    Ok(transcription)
}

pub async fn health_check(State(state): State<AsrState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "recognizer": state.recognizer.name()
    }))
}
