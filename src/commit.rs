//! Conventional-commit message generation for the staged git diff.

use crate::executor::ProcessRunner;
use crate::llm_provider::{ChatMessage, ChatProvider};
use crate::selection_ui::SelectionUI;
use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::io::{BufRead, Write};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CommitMessage {
    pub title: String,
    pub description: String,
}

/// What happened when the user ran the commit flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    NothingStaged,
    GenerationFailed,
    Cancelled,
    Committed(CommitMessage),
}

pub struct CommitAssistant<'a> {
    provider: &'a dyn ChatProvider,
    runner: &'a dyn ProcessRunner,
    ui: SelectionUI,
}

impl<'a> CommitAssistant<'a> {
    pub fn new(provider: &'a dyn ChatProvider, runner: &'a dyn ProcessRunner) -> Self {
        Self {
            provider,
            runner,
            ui: SelectionUI::new(),
        }
    }

    /// Output of `git diff --staged`; `None` when nothing is staged.
    pub fn staged_diff(&self) -> Result<Option<String>> {
        if !self.runner.program_exists("git") {
            return Err(anyhow!("git was not found in PATH"));
        }
        let output = self.runner.run("git", &["diff", "--staged"])?;
        if !output.status.success() {
            return Err(anyhow!(
                "Error retrieving the diff: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }
        let diff = String::from_utf8_lossy(&output.stdout).to_string();
        Ok(if diff.trim().is_empty() { None } else { Some(diff) })
    }

    /// Asks the model for a title and short description for `diff`.
    pub async fn generate_message(&self, diff: &str) -> Option<CommitMessage> {
        let reply = self
            .provider
            .chat_json(&[ChatMessage::user(commit_prompt(diff))])
            .await?;
        match serde_json::from_str::<CommitMessage>(&reply) {
            Ok(message) if !message.title.trim().is_empty() => Some(CommitMessage {
                title: message.title.trim().to_string(),
                description: message.description.trim().to_string(),
            }),
            Ok(_) => {
                warn!("Commit message reply had an empty title: {}", reply);
                None
            }
            Err(err) => {
                warn!("Error parsing commit message reply {:?}: {}", reply, err);
                None
            }
        }
    }

    pub async fn run(&self) -> Result<CommitOutcome> {
        let stdin = std::io::stdin();
        let mut input = stdin.lock();
        self.run_with_io(&mut input, &mut std::io::stdout()).await
    }

    /// Full flow: diff, generate, confirm, commit.
    pub async fn run_with_io<R: BufRead, W: Write>(
        &self,
        input: &mut R,
        output: &mut W,
    ) -> Result<CommitOutcome> {
        let Some(diff) = self.staged_diff()? else {
            writeln!(output, "There are no staged changes to commit.")?;
            return Ok(CommitOutcome::NothingStaged);
        };

        let Some(message) = self.generate_message(&diff).await else {
            writeln!(output, "Error generating the commit message.")?;
            return Ok(CommitOutcome::GenerationFailed);
        };

        writeln!(output, "\nCommit message generated:")?;
        writeln!(output, "Title: {}", message.title)?;
        writeln!(output, "Description: {}", message.description)?;

        if !self
            .ui
            .confirm_with_io("Do you want to commit with this message?", input, output)?
        {
            writeln!(output, "Commit canceled.")?;
            return Ok(CommitOutcome::Cancelled);
        }

        let mut args = vec!["commit", "-m", message.title.as_str()];
        if !message.description.is_empty() {
            args.extend(["-m", message.description.as_str()]);
        }
        let status = self.runner.run_interactive("git", &args)?;
        if !status.success() {
            return Err(anyhow!("Error committing: git exited with {}", status));
        }
        info!("Committed with title '{}'", message.title);
        writeln!(output, "Commit completed.")?;
        Ok(CommitOutcome::Committed(message))
    }
}

fn commit_prompt(diff: &str) -> String {
    format!(
        "Conventional Commits is a specification for writing consistent and meaningful commit \
         messages. The structure of a conventional commit is as follows:\n\n\
         <type>: <short description>\n\n\
         - type: Specifies the category of the change. Common types are:\n\
         \x20 - 'feat': A new feature\n\
         \x20 - 'fix': A bug fix\n\
         \x20 - 'chore': Routine tasks or maintenance\n\
         \x20 - 'refactor': Code changes that don't affect functionality\n\
         \x20 - 'docs': Documentation-only changes\n\
         \x20 - 'test': Adding or updating tests\n\
         \x20 - 'style': Code style changes (e.g., formatting)\n\n\
         Use the following git diff and give me the title and short description for the commit \
         using conventional commits. The description must have a maximum of 30 words in \
         English:\n\n\
         {}\n\n\
         Respond with a JSON of the form {{\"title\": \"...\", \"description\": \"...\"}}",
        diff
    )
}
