//! whisper.cpp command-line recognizer.
//!
//! Writes the PCM buffer to a temporary WAV, runs
//! `whisper-cli -m <model> -f <wav> -l <lang> -oj -of <base> -np`
//! and reads the JSON it leaves next to the input.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, error, instrument};

use super::normalizer::{resample, PcmAudio, TRANSCODE_SAMPLE_RATE};
use super::recognizer::{SpeechRecognizer, Transcription};
use crate::error::VoiceError;

#[derive(Debug, Clone)]
pub struct WhisperCliRecognizer {
    executable: PathBuf,
    model_path: PathBuf,
    threads: u32,
}

/// Subset of whisper.cpp `--output-json`
#[derive(Debug, Deserialize)]
struct WhisperJson {
    #[serde(default)]
    result: Option<WhisperJsonResult>,
    #[serde(default)]
    transcription: Vec<WhisperJsonSegment>,
}

#[derive(Debug, Deserialize)]
struct WhisperJsonResult {
    #[serde(default)]
    language: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WhisperJsonSegment {
    text: String,
}

fn parse_output(json: &str) -> Result<Transcription, VoiceError> {
    let output: WhisperJson = serde_json::from_str(json).map_err(|e| {
        VoiceError::transcription(format!("Failed to parse whisper.cpp output: {e}"))
    })?;
    let text: String = output
        .transcription
        .iter()
        .map(|s| s.text.as_str())
        .collect();
    let language = output.result.and_then(|r| r.language);
    Ok(Transcription::new(text, language))
}

impl WhisperCliRecognizer {
    pub fn new(executable: impl Into<PathBuf>, model_path: impl Into<PathBuf>, threads: u32) -> Self {
        Self {
            executable: executable.into(),
            model_path: model_path.into(),
            threads: threads.max(1),
        }
    }

    async fn run_whisper(&self, wav_path: &Path, language: &str) -> Result<String, VoiceError> {
        let output_base = wav_path.with_extension("");
        let json_path = wav_path.with_extension("json");

        let mut cmd = Command::new(&self.executable);
        cmd.arg("-m")
            .arg(&self.model_path)
            .arg("-f")
            .arg(wav_path)
            .arg("-l")
            .arg(language)
            .arg("-t")
            .arg(self.threads.to_string())
            .arg("-oj")
            .arg("-of")
            .arg(&output_base)
            .arg("-np")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        debug!("Running whisper.cpp: {:?}", cmd);

        let output = cmd.output().await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                VoiceError::transcription(format!(
                    "whisper.cpp not found at '{}'",
                    self.executable.display()
                ))
            } else {
                VoiceError::transcription(format!("Failed to run whisper.cpp: {e}"))
            }
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            error!("whisper.cpp failed: {}", stderr.trim());
            return Err(VoiceError::transcription(format!(
                "whisper.cpp exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let json = tokio::fs::read_to_string(&json_path).await.map_err(|e| {
            VoiceError::transcription(format!("Failed to read whisper.cpp output: {e}"))
        });
        let _ = tokio::fs::remove_file(&json_path).await;
        json
    }
}

#[async_trait]
impl SpeechRecognizer for WhisperCliRecognizer {
    #[instrument(skip(self, audio), fields(samples = audio.samples.len()))]
    async fn transcribe(
        &self,
        audio: &PcmAudio,
        language: Option<&str>,
    ) -> Result<Transcription, VoiceError> {
        // whisper.cpp only accepts 16 kHz input
        let audio = resample(audio, TRANSCODE_SAMPLE_RATE)?;
        let wav = audio
            .to_wav_bytes()
            .map_err(|e| VoiceError::transcription(format!("Failed to encode WAV: {e}")))?;

        let temp_file = tempfile::Builder::new()
            .suffix(".wav")
            .tempfile()
            .map_err(|e| VoiceError::transcription(format!("Failed to create temp file: {e}")))?;
        tokio::fs::write(temp_file.path(), &wav)
            .await
            .map_err(|e| VoiceError::transcription(format!("Failed to write temp file: {e}")))?;

        let json = self
            .run_whisper(temp_file.path(), language.unwrap_or("auto"))
            .await?;
        parse_output(&json)
    }

    fn name(&self) -> &str {
        "whisper_cli"
    }
}
