//! Interactive prompts: picking a suggested command and yes/no confirmation.
//!
//! Every prompt has a `_with_io` variant taking any reader and writer so it
//! can be driven from tests; the plain variants bind to stdin/stdout.

use anyhow::Result;
use std::io::{self, BufRead, Write};
use tracing::info;

const NONE_OPTION: &str = "None";

/// Handles user interaction for choosing among suggested commands.
///
/// # Example
///
/// ```no_run
/// use jarvissh::selection_ui::SelectionUI;
///
/// let ui = SelectionUI::new();
/// let commands = vec!["ls -la".to_string(), "ls -lah".to_string()];
///
/// if let Some(command) = ui.choose_command(&commands)? {
///     println!("running {command}");
/// }
/// # Ok::<(), anyhow::Error>(())
/// ```
#[derive(Debug, Default)]
pub struct SelectionUI;

impl SelectionUI {
    pub fn new() -> Self {
        Self
    }

    // =========================================================================
    // Core methods with I/O injection (testable)
    // =========================================================================

    /// Lists `commands` plus a final "None" entry and reads the user's pick.
    ///
    /// Invalid input re-prompts. End of input is treated as "None".
    ///
    /// # Returns
    ///
    /// The chosen command, or `None` if the user declined.
    pub fn choose_command_with_io<R: BufRead, W: Write>(
        &self,
        commands: &[String],
        input: &mut R,
        output: &mut W,
    ) -> Result<Option<String>> {
        writeln!(output, "\nSelect the command you want to run:")?;
        for (i, command) in commands.iter().enumerate() {
            writeln!(output, "  {}. {}", i + 1, command)?;
        }
        let none_choice = commands.len() + 1;
        writeln!(output, "  {}. {}", none_choice, NONE_OPTION)?;

        loop {
            write!(output, "\nChoose an option (1-{}): ", none_choice)?;
            output.flush()?;

            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                writeln!(output)?;
                return Ok(None);
            }

            match line.trim().parse::<usize>() {
                Ok(n) if n == none_choice => {
                    info!("User chose not to run a command");
                    return Ok(None);
                }
                Ok(n) if (1..none_choice).contains(&n) => {
                    let command = commands[n - 1].clone();
                    info!("User chose command '{}'", command);
                    return Ok(Some(command));
                }
                _ => {
                    writeln!(
                        output,
                        "Invalid choice. Please enter a number from 1 to {}.",
                        none_choice
                    )?;
                }
            }
        }
    }

    /// Asks a yes/no question; only `y`/`yes` (any case) count as yes.
    pub fn confirm_with_io<R: BufRead, W: Write>(
        &self,
        question: &str,
        input: &mut R,
        output: &mut W,
    ) -> Result<bool> {
        write!(output, "{} (y/n) ", question)?;
        output.flush()?;

        let mut line = String::new();
        input.read_line(&mut line)?;
        let answer = line.trim().to_lowercase();
        Ok(answer == "y" || answer == "yes")
    }

    // =========================================================================
    // Convenience methods using standard I/O
    // =========================================================================

    pub fn choose_command(&self, commands: &[String]) -> Result<Option<String>> {
        let stdin = io::stdin();
        let mut input = stdin.lock();
        let mut output = io::stdout();
        self.choose_command_with_io(commands, &mut input, &mut output)
    }
}
