use async_trait::async_trait;

use crate::conversations::Turn;
use crate::error::VoiceError;

/// Interface for a stateless language model.
/// The caller owns the conversation; every call receives the full history.
#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    /// Generate the assistant reply for the given turns
    async fn generate(&self, turns: &[Turn]) -> Result<String, VoiceError>;

    fn model_name(&self) -> &str;
}

/// Flatten turns into role-labeled lines, ending with an open assistant cue.
///
/// ```text
/// system: You are a helpful assistant.
/// user: hello
/// assistant:
/// ```
pub fn build_prompt(turns: &[Turn]) -> String {
    let mut prompt = String::new();
    for turn in turns {
        prompt.push_str(turn.role.as_str());
        prompt.push_str(": ");
        prompt.push_str(&turn.content);
        prompt.push('\n');
    }
    prompt.push_str("assistant:");
    prompt
}
