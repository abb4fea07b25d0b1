//! Decides whether an input asks for a shell command or is a question.

use crate::llm_provider::{ChatMessage, ChatProvider};
use serde::Deserialize;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct Verdict {
    #[serde(rename = "isCommand")]
    is_command: bool,
}

pub struct Classifier<'a> {
    provider: &'a dyn ChatProvider,
}

impl<'a> Classifier<'a> {
    pub fn new(provider: &'a dyn ChatProvider) -> Self {
        Self { provider }
    }

    /// Returns `true` only when the model clearly answers that `text` is
    /// about terminal commands. Anything else counts as a question.
    pub async fn is_command_request(&self, text: &str) -> bool {
        let messages = [ChatMessage::user(classification_prompt(text))];
        match self.provider.chat_json(&messages).await {
            Some(reply) => parse_verdict(&reply).unwrap_or(false),
            None => false,
        }
    }
}

fn classification_prompt(text: &str) -> String {
    format!(
        "Is the following question about terminal commands?\n\n\
         {}\n\n\
         Respond with {{\"isCommand\": true}} for yes, and with {{\"isCommand\": false}} for no.",
        text
    )
}

/// Extracts the boolean from an `{"isCommand": bool}` reply.
fn parse_verdict(reply: &str) -> Option<bool> {
    match serde_json::from_str::<Verdict>(reply) {
        Ok(verdict) => {
            debug!("Classified input, isCommand = {}", verdict.is_command);
            Some(verdict.is_command)
        }
        Err(err) => {
            warn!("Error parsing classification response {:?}: {}", reply, err);
            None
        }
    }
}
