use std::path::{Path, PathBuf};

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::debug;

use crate::core::prompt::InputSource;
use crate::output::Printer;

pub const HISTORY_FILE: &str = "repl_history.txt";

/// Line editor for the interactive shell. Also answers the field prompts
/// of `add`/`update` when they run interactively.
pub struct Repl {
    editor: DefaultEditor,
    history_file: PathBuf,
    printer: Printer,
}

impl Repl {
    pub fn new(base_dir: &Path) -> Result<Self, String> {
        let mut editor = DefaultEditor::new()
            .map_err(|e| format!("Failed to initialize line editor: {}", e))?;

        if !base_dir.exists() {
            std::fs::create_dir_all(base_dir)
                .map_err(|e| format!("Failed to create {}: {}", base_dir.display(), e))?;
        }

        let history_file = base_dir.join(HISTORY_FILE);
        if history_file.exists() {
            editor.load_history(&history_file).ok();
        }

        Ok(Self {
            editor,
            history_file,
            printer: Printer::new(),
        })
    }

    /// `Ok(None)` on an empty line or Ctrl-C; `Err(Eof)` is passed through so
    /// the caller can leave the loop.
    pub fn read_command(&mut self, prompt: &str) -> Result<Option<String>, ReadlineError> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                if line.trim().is_empty() {
                    return Ok(None);
                }
                self.editor.add_history_entry(line.as_str())?;
                Ok(Some(line))
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    pub fn save_history(&mut self) -> Result<(), String> {
        self.editor
            .save_history(&self.history_file)
            .map_err(|e| format!("Failed to save REPL history: {}", e))
    }

    pub fn printer(&self) -> &Printer {
        &self.printer
    }
}

impl InputSource for Repl {
    // Empty answers are meaningful here (skip / keep current), so the editor
    // is read directly instead of through `read_command`.
    fn read_line(&mut self, prompt: &str) -> Option<String> {
        match self.editor.readline(prompt) {
            Ok(line) => Some(line),
            Err(err) => {
                debug!(error = %err, "field prompt aborted");
                None
            }
        }
    }

    fn notify(&mut self, message: &str) {
        self.printer.error(message);
    }
}
