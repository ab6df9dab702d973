pub mod agent;
pub mod asr;
pub mod config;
pub mod conversations;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod routes;
pub mod state;

pub use config::Config;
pub use error::VoiceError;
pub use state::{AppState, AsrState};
