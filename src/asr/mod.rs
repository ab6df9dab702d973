pub mod client;
pub mod data_url;
pub mod handler;
pub mod normalizer;
pub mod recognizer;
pub mod recognizer_factory;
pub mod whisper_cli;
pub mod whisper_http;

pub use client::AsrServiceClient;
pub use normalizer::{AudioNormalizer, PcmAudio};
pub use recognizer::{SpeechRecognizer, Transcription};
pub use recognizer_factory::RecognizerFactory;
