use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument};

use super::recognizer::Transcription;
use crate::error::VoiceError;

const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(2);

/// HTTP client for the ASR server, used by the app server
#[derive(Debug, Clone)]
pub struct AsrServiceClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct DataUrlRequest<'a> {
    file: &'a str,
    config: &'a Value,
}

impl AsrServiceClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, VoiceError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| VoiceError::transcription(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Forward a data URL to `/asr-data-url`. Not retried.
    ///
    /// The ASR server reports failures as `{"error": ...}`; any body without
    /// a `text` field becomes a transcription error carrying that body.
    #[instrument(skip(self, data_url, config), fields(len = data_url.len()))]
    pub async fn transcribe_data_url(
        &self,
        data_url: &str,
        config: &Value,
    ) -> Result<Transcription, VoiceError> {
        let url = format!("{}/asr-data-url", self.base_url);
        let request = DataUrlRequest {
            file: data_url,
            config,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| VoiceError::transcription(format!("ASR server error: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| VoiceError::transcription(format!("ASR server error: {e}")))?;
        debug!("ASR server answered {}", status);

        let payload: Value = match serde_json::from_str(&body) {
            Ok(v) => v,
            Err(_) => {
                return Err(VoiceError::transcription_with_detail(
                    format!("ASR server error: HTTP {status}"),
                    Value::String(body),
                ))
            }
        };

        match payload.get("text").and_then(Value::as_str) {
            Some(text) => {
                let language = payload
                    .get("language")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                Ok(Transcription::new(text, language))
            }
            None => Err(VoiceError::transcription_with_detail("ASR failed", payload)),
        }
    }

    pub async fn health_check(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        match self
            .client
            .get(&url)
            .timeout(HEALTH_CHECK_TIMEOUT)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("ASR health check failed: {}", e);
                false
            }
        }
    }
}
