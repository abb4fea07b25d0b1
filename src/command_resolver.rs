//! Turns a command request into candidate shell commands.
//!
//! The first prompt carries the user's custom-command corpus. When it
//! produces nothing, the fallback strategy asks again from general
//! knowledge alone.

use crate::llm_provider::{ChatMessage, ChatProvider};
use serde::Deserialize;
use tracing::{debug, info, warn};

#[derive(Debug, Deserialize)]
struct CommandList {
    #[serde(default)]
    commands: Vec<String>,
}

/// Whether an empty first answer triggers a second, corpus-free prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolutionStrategy {
    CorpusOnly,
    #[default]
    WithFallback,
}

pub struct CommandResolver<'a> {
    provider: &'a dyn ChatProvider,
    corpus: String,
    strategy: ResolutionStrategy,
}

impl<'a> CommandResolver<'a> {
    pub fn new(provider: &'a dyn ChatProvider, corpus: impl Into<String>) -> Self {
        Self {
            provider,
            corpus: corpus.into(),
            strategy: ResolutionStrategy::default(),
        }
    }

    pub fn with_strategy(mut self, strategy: ResolutionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Candidate commands for `text`; empty when nothing usable came back.
    pub async fn resolve_commands(&self, text: &str) -> Vec<String> {
        let first = match self.ask(corpus_prompt(&self.corpus, text)).await {
            Some(commands) => commands,
            // Backend already reported unavailable; asking again won't help.
            None => return Vec::new(),
        };

        if !first.is_empty() || self.strategy == ResolutionStrategy::CorpusOnly {
            return first;
        }

        info!("No commands from custom corpus, asking from general knowledge");
        self.ask(general_prompt(text)).await.unwrap_or_default()
    }

    /// `None` only when the provider returned no result at all.
    async fn ask(&self, prompt: String) -> Option<Vec<String>> {
        let reply = self.provider.chat_json(&[ChatMessage::user(prompt)]).await?;
        Some(parse_commands(&reply))
    }
}

fn corpus_prompt(corpus: &str, text: &str) -> String {
    format!(
        "Custom commands available:\n\
         {}\n\n\
         Taking that into account, respond with a JSON containing a list of commands that can \
         solve the following request, and if no specific commands fit or if additional context \
         is needed, you can also rely on your general knowledge to provide the best possible \
         answer:\n\n\
         {}\n\n\
         JSON must be in the following format only:\n\
         {{\n\"commands\": [\"command1\", \"command2\", \"...\"]\n}}",
        corpus.trim(),
        text
    )
}

fn general_prompt(text: &str) -> String {
    format!(
        "Respond with a JSON containing a list of commands that can solve the following \
         request:\n\n\
         {}\n\n\
         Give me a JSON in the following format:\n\
         {{\n\"commands\": [\"command1\", \"command2\", \"...\"]\n}}",
        text
    )
}

fn parse_commands(reply: &str) -> Vec<String> {
    match serde_json::from_str::<CommandList>(reply) {
        Ok(list) => {
            let commands: Vec<String> = list
                .commands
                .into_iter()
                .map(|command| command.trim().to_string())
                .filter(|command| !command.is_empty())
                .collect();
            debug!("Model suggested {} command(s)", commands.len());
            commands
        }
        Err(err) => {
            warn!("Error parsing commands response {:?}: {}", reply, err);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_provider::ScriptedProvider;

    const CORPUS: &str = "restart-nginx: sudo systemctl restart nginx";

    #[tokio::test]
    async fn test_returns_commands_from_first_prompt() {
        let provider = ScriptedProvider::new()
            .with_reply(Some(r#"{"commands": ["sudo systemctl restart nginx"]}"#));

        let commands = CommandResolver::new(&provider, CORPUS)
            .resolve_commands("my web server is down")
            .await;

        assert_eq!(commands, vec!["sudo systemctl restart nginx"]);
        let sent = provider.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0][0].content.contains(CORPUS));
        assert!(sent[0][0].content.contains("my web server is down"));
    }

    #[tokio::test]
    async fn test_falls_back_to_general_knowledge_when_empty() {
        let provider = ScriptedProvider::new()
            .with_reply(Some(r#"{"commands": []}"#))
            .with_reply(Some(r#"{"commands": ["ls -la"]}"#));

        let commands = CommandResolver::new(&provider, CORPUS)
            .resolve_commands("show hidden files")
            .await;

        assert_eq!(commands, vec!["ls -la"]);
        let sent = provider.sent();
        assert_eq!(sent.len(), 2);
        assert!(!sent[1][0].content.contains(CORPUS));
        assert!(sent[1][0].content.contains("show hidden files"));
    }

    #[tokio::test]
    async fn test_corpus_only_strategy_skips_fallback() {
        let provider = ScriptedProvider::new()
            .with_reply(Some(r#"{"commands": []}"#))
            .with_reply(Some(r#"{"commands": ["ls -la"]}"#));

        let commands = CommandResolver::new(&provider, CORPUS)
            .with_strategy(ResolutionStrategy::CorpusOnly)
            .resolve_commands("show hidden files")
            .await;

        assert!(commands.is_empty());
        assert_eq!(provider.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_first_reply_still_falls_back() {
        let provider = ScriptedProvider::new()
            .with_reply(Some("ls -la"))
            .with_reply(Some(r#"{"commands": ["ls -la"]}"#));

        let commands = CommandResolver::new(&provider, "")
            .resolve_commands("show hidden files")
            .await;

        assert_eq!(commands, vec!["ls -la"]);
    }

    #[tokio::test]
    async fn test_no_result_returns_empty_without_retry() {
        let provider = ScriptedProvider::new().with_reply(None);

        let commands = CommandResolver::new(&provider, CORPUS)
            .resolve_commands("my web server is down")
            .await;

        assert!(commands.is_empty());
        assert_eq!(provider.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_both_steps_empty_returns_empty() {
        let provider = ScriptedProvider::new()
            .with_reply(Some(r#"{"commands": []}"#))
            .with_reply(Some("not json"));

        let commands = CommandResolver::new(&provider, CORPUS)
            .resolve_commands("do something impossible")
            .await;

        assert!(commands.is_empty());
    }

    #[test]
    fn test_parse_commands_drops_blank_entries() {
        assert_eq!(
            parse_commands(r#"{"commands": ["  git status ", "", "   "]}"#),
            vec!["git status"]
        );
    }

    #[test]
    fn test_parse_commands_missing_key_is_empty() {
        assert!(parse_commands(r#"{"result": ["ls"]}"#).is_empty());
    }
}
