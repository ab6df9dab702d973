use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

/// Failures of the voice pipeline, one variant per stage.
#[derive(Debug, Error)]
pub enum VoiceError {
    /// Missing or malformed request field
    #[error("{0}")]
    InvalidInput(String),

    /// Payload is not valid base64
    #[error("Base64 decode failed: {0}")]
    Decode(String),

    /// External transcoder could not produce readable audio
    #[error("Audio transcode failed: {0}")]
    Transcode(String),

    /// Speech recognizer or ASR service failed
    #[error("{message}")]
    Transcription {
        message: String,
        detail: Option<Value>,
    },

    /// Language model call failed
    #[error("LLM error: {0}")]
    Generation(String),
}

/// JSON body returned for every failed request.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<Value>,
}

impl VoiceError {
    pub fn transcription(message: impl Into<String>) -> Self {
        Self::Transcription {
            message: message.into(),
            detail: None,
        }
    }

    pub fn transcription_with_detail(message: impl Into<String>, detail: Value) -> Self {
        Self::Transcription {
            message: message.into(),
            detail: Some(detail),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::Decode(_) => "decode",
            Self::Transcode(_) => "transcode",
            Self::Transcription { .. } => "transcription",
            Self::Generation(_) => "generation",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) | Self::Decode(_) => StatusCode::BAD_REQUEST,
            Self::Transcode(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Transcription { .. } | Self::Generation(_) => StatusCode::BAD_GATEWAY,
        }
    }

    pub fn to_body(&self) -> ErrorBody {
        let detail = match self {
            Self::Transcription { detail, .. } => detail.clone(),
            _ => None,
        };
        ErrorBody {
            error: self.to_string(),
            detail,
        }
    }

    /// Render the error as a JSON response.
    ///
    /// With `legacy_status` the status is always 200 and only the body
    /// signals the failure, which is what older clients expect.
    pub fn into_http_response(self, legacy_status: bool) -> Response {
        warn!(kind = self.kind(), "Request failed: {}", self);
        let status = if legacy_status {
            StatusCode::OK
        } else {
            self.status_code()
        };
        (status, Json(self.to_body())).into_response()
    }
}

impl IntoResponse for VoiceError {
    fn into_response(self) -> Response {
        self.into_http_response(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_input_is_bad_request() {
        let err = VoiceError::InvalidInput("Missing data_url".to_string());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Missing data_url");
    }

    #[test]
    fn decode_error_message() {
        let err = VoiceError::Decode("Invalid padding".to_string());
        assert_eq!(err.to_string(), "Base64 decode failed: Invalid padding");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn upstream_failures_are_bad_gateway() {
        assert_eq!(
            VoiceError::transcription("ASR failed").status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            VoiceError::Generation("boom".to_string()).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            VoiceError::Transcode("exit 1".to_string()).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn body_carries_detail_only_for_transcription() {
        let detail = serde_json::json!({"error": "Invalid data url"});
        let body = VoiceError::transcription_with_detail("ASR failed", detail.clone()).to_body();
        assert_eq!(body.error, "ASR failed");
        assert_eq!(body.detail, Some(detail));

        let json = serde_json::to_value(VoiceError::Generation("x".into()).to_body()).unwrap();
        assert_eq!(json, serde_json::json!({"error": "LLM error: x"}));
    }

    #[test]
    fn legacy_status_is_always_ok() {
        let resp = VoiceError::InvalidInput("Missing text".into()).into_http_response(true);
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = VoiceError::Generation("down".into()).into_http_response(false);
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    }
}
