//! The user's custom-command corpus.
//!
//! A free-form text file of command snippets that is pasted verbatim into
//! the command-resolution prompt. The assistant never parses it.

use crate::config::ConfigStore;
use crate::executor::ProcessRunner;
use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info};

const COMMANDS_FILE_NAME: &str = "jarvissh_commands.txt";
const DEFAULT_EDITOR: &str = "nano";

#[derive(Debug, Clone)]
pub struct CommandCorpus {
    path: PathBuf,
}

impl CommandCorpus {
    /// The corpus kept alongside the configuration file.
    pub fn in_store(store: &ConfigStore) -> Self {
        Self::at(store.dir().join(COMMANDS_FILE_NAME))
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Full corpus text; a missing file reads as empty.
    pub fn load(&self) -> Result<String> {
        if !self.path.exists() {
            debug!("No custom commands file at {}", self.path.display());
            return Ok(String::new());
        }
        fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))
    }

    /// Opens the corpus in `$EDITOR` (or nano), creating it first if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the editor cannot be found, cannot be started, or
    /// exits unsuccessfully.
    pub fn open_in_editor(&self, runner: &dyn ProcessRunner) -> Result<()> {
        let editor = std::env::var("EDITOR")
            .ok()
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_EDITOR.to_string());
        self.open_with(&editor, runner)
    }

    /// Opens the corpus with a specific editor command line, e.g. `code -w`.
    pub fn open_with(&self, editor: &str, runner: &dyn ProcessRunner) -> Result<()> {
        let mut words = editor.split_whitespace();
        let program = words
            .next()
            .ok_or_else(|| anyhow!("Error opening the editor: no editor configured"))?;
        if !runner.program_exists(program) {
            return Err(anyhow!("Error opening the editor: '{}' was not found in PATH", program));
        }

        self.ensure_exists()?;
        let path = self.path.to_string_lossy().into_owned();
        let mut args: Vec<&str> = words.collect();
        args.push(&path);
        info!("Opening {} with {}", path, editor);

        let status = runner
            .run_interactive(program, &args)
            .with_context(|| format!("Error opening the editor '{}'", editor))?;
        if !status.success() {
            return Err(anyhow!("Editor '{}' exited with {}", editor, status));
        }
        Ok(())
    }

    fn ensure_exists(&self) -> Result<()> {
        if self.path.exists() {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, "")?;
        Ok(())
    }
}
