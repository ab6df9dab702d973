//! Command-line client for poking the ASR and app servers by hand.

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use voice_assistant_backend::asr::data_url;

#[derive(Parser, Debug)]
#[command(author, version, about = "Send audio or text to the voice assistant servers")]
struct Cli {
    /// Base URL of the ASR server
    #[arg(long, env = "VOICE_ASR_URL", default_value = "http://127.0.0.1:8081")]
    asr_url: String,

    /// Base URL of the app server
    #[arg(long, env = "VOICE_APP_URL", default_value = "http://127.0.0.1:8080")]
    app_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Transcribe an audio file with the ASR server
    Asr { file: PathBuf },

    /// Send an audio file through the full pipeline
    Audio { file: PathBuf },

    /// Send a text message to the app server
    Text {
        message: String,

        #[arg(short, long)]
        language: Option<String>,
    },
}

fn read_data_url(path: &Path) -> Option<String> {
    if !path.exists() {
        eprintln!("Error: file not found: {}", path.display());
        return None;
    }
    match data_url::file_to_data_url(path) {
        Ok(url) => Some(url),
        Err(e) => {
            eprintln!("Error: could not read {}: {}", path.display(), e);
            None
        }
    }
}

async fn post(client: &reqwest::Client, url: String, body: Value) -> Result<()> {
    let response = client.post(&url).json(&body).send().await?;
    let status = response.status();
    let text = response.text().await?;
    println!("Response: {} {}", status.as_u16(), text);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let asr_url = cli.asr_url.trim_end_matches('/');
    let app_url = cli.app_url.trim_end_matches('/');

    match cli.command {
        Commands::Asr { file } => {
            let Some(url) = read_data_url(&file) else {
                return Ok(ExitCode::FAILURE);
            };
            post(
                &client,
                format!("{asr_url}/asr-data-url"),
                json!({ "file": url, "config": {} }),
            )
            .await?;
        }
        Commands::Audio { file } => {
            let Some(url) = read_data_url(&file) else {
                return Ok(ExitCode::FAILURE);
            };
            post(
                &client,
                format!("{app_url}/v1/audio"),
                json!({ "file": url, "config": {} }),
            )
            .await?;
        }
        Commands::Text { message, language } => {
            let mut body = json!({ "text": message });
            if let Some(language) = language {
                body["language"] = Value::String(language);
            }
            post(&client, format!("{app_url}/v1/text"), body).await?;
        }
    }

    Ok(ExitCode::SUCCESS)
}
