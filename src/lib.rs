//! Jarvissh - a terminal assistant backed by a local or hosted language model.
//!
//! Each invocation takes one free-text input and does one of two things:
//!
//! - **Command requests** ("my web server is down") are resolved to concrete
//!   shell commands, biased by the user's own command snippets, offered in a
//!   menu and run through the shell.
//! - **Questions** are answered by streaming the model's reply to the
//!   terminal as it is produced.
//!
//! # Architecture
//!
//! - [`config`] - Persisted settings (model, service, API key)
//! - [`llm_provider`] - The [`ChatProvider`](llm_provider::ChatProvider) contract
//! - [`local_provider`] / [`hosted_provider`] - Ollama and OpenAI adapters
//! - [`provider_selector`] - Chooses the adapter from configuration
//! - [`stream_reconciler`] - Normalizes both streaming wire formats to text
//! - [`classifier`] - Command request or question
//! - [`command_resolver`] - Turns a request into candidate commands
//! - [`custom_commands`] - The user's command corpus
//! - [`command_router`] - Ties classification, resolution and answering together
//! - [`selection_ui`] / [`executor`] - Menu and shell execution
//! - [`commit`] - Conventional-commit messages for staged changes
//! - [`http_client`] - HTTP client abstraction
//!
//! # Example
//!
//! ```ignore
//! use jarvissh::{command_router::CommandRouter, config::ConfigStore,
//!     custom_commands::CommandCorpus, executor::Executor,
//!     http_client::ReqwestHttpClient, provider_selector};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = ConfigStore::default_location()?;
//!     let http = Arc::new(ReqwestHttpClient::new());
//!     let provider = provider_selector::select_configured(&store, http)?;
//!     let corpus = CommandCorpus::in_store(&store);
//!     let router = CommandRouter::new(provider, corpus, Executor::new());
//!
//!     router.process_input("how do I list hidden files?").await?;
//!     Ok(())
//! }
//! ```

pub mod classifier;
pub mod command_resolver;
pub mod command_router;
pub mod commit;
pub mod config;
pub mod custom_commands;
pub mod executor;
pub mod hosted_provider;
pub mod http_client;
pub mod llm_provider;
pub mod local_provider;
pub mod provider_selector;
pub mod selection_ui;
pub mod stream_reconciler;
