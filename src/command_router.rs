use crate::{
    classifier::Classifier,
    command_resolver::CommandResolver,
    custom_commands::CommandCorpus,
    executor::Executor,
    llm_provider::{ChatMessage, ChatProvider},
    selection_ui::SelectionUI,
    stream_reconciler::stream_answer,
};
use anyhow::Result;
use futures_util::StreamExt;
use std::io::{BufRead, Write};
use tracing::{info, warn};

/// How a general question is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnswerMode {
    #[default]
    Streaming,
    Whole,
}

/// What the router ended up doing with an input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Handled {
    Answered,
    NoCommandsFound,
    Declined,
    Executed(String),
    ExecutionFailed(String),
}

pub struct CommandRouter {
    provider: Box<dyn ChatProvider>,
    corpus: CommandCorpus,
    executor: Executor,
    selection_ui: SelectionUI,
    answer_mode: AnswerMode,
}

impl CommandRouter {
    pub fn new(
        provider: Box<dyn ChatProvider>,
        corpus: CommandCorpus,
        executor: Executor,
    ) -> Self {
        Self {
            provider,
            corpus,
            executor,
            selection_ui: SelectionUI::new(),
            answer_mode: AnswerMode::default(),
        }
    }

    pub fn with_answer_mode(mut self, answer_mode: AnswerMode) -> Self {
        self.answer_mode = answer_mode;
        self
    }

    pub async fn process_input(&self, input: &str) -> Result<Handled> {
        let stdin = std::io::stdin();
        let mut reader = stdin.lock();
        self.process_input_with_io(input, &mut reader, &mut std::io::stdout())
            .await
    }

    /// Classifies `input` and either offers commands or answers it.
    pub async fn process_input_with_io<R: BufRead, W: Write>(
        &self,
        input: &str,
        reader: &mut R,
        output: &mut W,
    ) -> Result<Handled> {
        info!("Processing input: {}", input);

        if Classifier::new(self.provider.as_ref())
            .is_command_request(input)
            .await
        {
            info!("Input classified as a command request");
            self.handle_command(input, reader, output).await
        } else {
            info!("Input classified as a question");
            self.answer_question(input, output).await?;
            Ok(Handled::Answered)
        }
    }

    async fn handle_command<R: BufRead, W: Write>(
        &self,
        input: &str,
        reader: &mut R,
        output: &mut W,
    ) -> Result<Handled> {
        let corpus = self.corpus.load()?;
        let commands = CommandResolver::new(self.provider.as_ref(), corpus)
            .resolve_commands(input)
            .await;

        if commands.is_empty() {
            writeln!(output, "No commands found for the given request.")?;
            return Ok(Handled::NoCommandsFound);
        }

        let Some(command) = self
            .selection_ui
            .choose_command_with_io(&commands, reader, output)?
        else {
            writeln!(output, "No command will be executed.")?;
            return Ok(Handled::Declined);
        };

        match self.executor.execute_shell_command(&command, output) {
            Ok(()) => Ok(Handled::Executed(command)),
            Err(err) => {
                warn!("Command execution failed: {}", err);
                writeln!(output, "Error executing command: {}", err)?;
                Ok(Handled::ExecutionFailed(command))
            }
        }
    }

    /// Writes the model's answer to `output`, fragment by fragment.
    pub async fn answer_question<W: Write>(
        &self,
        question: &str,
        output: &mut W,
    ) -> Result<()> {
        match self.answer_mode {
            AnswerMode::Streaming => {
                let mut fragments = stream_answer(self.provider.as_ref(), question).await;
                let mut wrote_any = false;
                while let Some(fragment) = fragments.next().await {
                    write!(output, "{}", fragment)?;
                    output.flush()?;
                    wrote_any |= !fragment.is_empty();
                }
                if wrote_any {
                    writeln!(output)?;
                }
            }
            AnswerMode::Whole => {
                let messages = [ChatMessage::user(question)];
                if let Some(answer) = self.provider.chat(&messages).await {
                    writeln!(output, "{}", answer)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::tests::MockProcessRunner;
    use crate::llm_provider::ScriptedProvider;
    use crate::stream_reconciler::WireChunk;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn router(provider: ScriptedProvider, runner: MockProcessRunner) -> (TempDir, CommandRouter) {
        let dir = TempDir::new().unwrap();
        let corpus = CommandCorpus::at(dir.path().join("cmds.txt"));
        std::fs::write(corpus.path(), "restart-nginx: sudo systemctl restart nginx\n").unwrap();
        let router = CommandRouter::new(
            Box::new(provider),
            corpus,
            Executor::with_runner(Box::new(runner)),
        );
        (dir, router)
    }

    #[tokio::test]
    async fn test_question_is_streamed_to_output() {
        let provider = ScriptedProvider::new()
            .with_reply(Some(r#"{"isCommand": false}"#))
            .with_stream(vec![WireChunk::local("Hel"), WireChunk::local("lo")]);
        let (_dir, router) = router(provider, MockProcessRunner::success(""));
        let mut output = Vec::new();

        let handled = router
            .process_input_with_io("say hello", &mut Cursor::new(b""), &mut output)
            .await
            .unwrap();

        assert_eq!(handled, Handled::Answered);
        assert_eq!(String::from_utf8_lossy(&output), "Hello\n");
    }

    #[tokio::test]
    async fn test_unreachable_backend_degrades_to_silent_answer() {
        let provider = ScriptedProvider::new().with_reply(None);
        let runner = MockProcessRunner::success("");
        let (_dir, router) = router(provider, runner.clone());
        let mut output = Vec::new();

        let handled = router
            .process_input_with_io("restart nginx", &mut Cursor::new(b""), &mut output)
            .await
            .unwrap();

        assert_eq!(handled, Handled::Answered);
        assert!(output.is_empty());
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_command_request_runs_selected_command() {
        let provider = ScriptedProvider::new()
            .with_reply(Some(r#"{"isCommand": true}"#))
            .with_reply(Some(r#"{"commands": ["sudo systemctl restart nginx"]}"#));
        let runner = MockProcessRunner::success("");
        let (_dir, router) = router(provider, runner.clone());
        let mut output = Vec::new();

        let handled = router
            .process_input_with_io("my web server is down", &mut Cursor::new(b"1\n"), &mut output)
            .await
            .unwrap();

        assert_eq!(handled, Handled::Executed("sudo systemctl restart nginx".to_string()));
        assert_eq!(runner.calls(), vec!["sh -c sudo systemctl restart nginx"]);
    }

    #[tokio::test]
    async fn test_command_request_with_no_candidates() {
        let provider = ScriptedProvider::new()
            .with_reply(Some(r#"{"isCommand": true}"#))
            .with_reply(Some(r#"{"commands": []}"#))
            .with_reply(Some(r#"{"commands": []}"#));
        let (_dir, router) = router(provider, MockProcessRunner::success(""));
        let mut output = Vec::new();

        let handled = router
            .process_input_with_io("teleport me", &mut Cursor::new(b""), &mut output)
            .await
            .unwrap();

        assert_eq!(handled, Handled::NoCommandsFound);
        let text = String::from_utf8_lossy(&output);
        assert!(text.contains("No commands found for the given request."));
    }

    #[tokio::test]
    async fn test_choosing_none_runs_nothing() {
        let provider = ScriptedProvider::new()
            .with_reply(Some(r#"{"isCommand": true}"#))
            .with_reply(Some(r#"{"commands": ["ls -la"]}"#));
        let runner = MockProcessRunner::success("");
        let (_dir, router) = router(provider, runner.clone());
        let mut output = Vec::new();

        let handled = router
            .process_input_with_io("list files", &mut Cursor::new(b"2\n"), &mut output)
            .await
            .unwrap();

        assert_eq!(handled, Handled::Declined);
        assert!(runner.calls().is_empty());
        assert!(String::from_utf8_lossy(&output).contains("No command will be executed."));
    }

    #[tokio::test]
    async fn test_failed_command_is_reported_not_raised() {
        let provider = ScriptedProvider::new()
            .with_reply(Some(r#"{"isCommand": true}"#))
            .with_reply(Some(r#"{"commands": ["false"]}"#));
        let (_dir, router) = router(provider, MockProcessRunner::exiting_with(1));
        let mut output = Vec::new();

        let handled = router
            .process_input_with_io("fail please", &mut Cursor::new(b"1\n"), &mut output)
            .await
            .unwrap();

        assert_eq!(handled, Handled::ExecutionFailed("false".to_string()));
        assert!(String::from_utf8_lossy(&output).contains("Error executing command"));
    }

    #[tokio::test]
    async fn test_whole_answer_mode_uses_single_chat_call() {
        let provider = ScriptedProvider::new()
            .with_reply(Some(r#"{"isCommand": false}"#))
            .with_reply(Some("Forty-two."));
        let (_dir, router) = router(provider, MockProcessRunner::success(""));
        let router = router.with_answer_mode(AnswerMode::Whole);
        let mut output = Vec::new();

        router
            .process_input_with_io("meaning of life?", &mut Cursor::new(b""), &mut output)
            .await
            .unwrap();

        assert_eq!(String::from_utf8_lossy(&output), "Forty-two.\n");
    }
}
