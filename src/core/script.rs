use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::core::command::{Argument, CommandKind, CommandRouter, Notice, Outcome};
use crate::core::config::Settings;
use crate::core::error::{CommandError, ScriptError};
use crate::core::prompt::{NoInput, ScriptedInput};

pub const MAX_SCRIPT_DEPTH: usize = 5;

/// A non-blank script line with its 1-based position in the file.
#[derive(Debug, Clone)]
struct ScriptLine {
    number: usize,
    text: String,
}

/// Runs a script file through a [`CommandRouter`].
///
/// Each nested `execute_script` gets an interpreter one level deeper; the
/// run is refused once the depth reaches [`MAX_SCRIPT_DEPTH`].
#[derive(Debug, Clone)]
pub struct ScriptInterpreter {
    depth: usize,
    max_depth: usize,
}

impl Default for ScriptInterpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptInterpreter {
    pub fn new() -> Self {
        Self::at_depth(0)
    }

    pub fn at_depth(depth: usize) -> Self {
        Self {
            depth,
            max_depth: MAX_SCRIPT_DEPTH,
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn run(&self, router: &mut CommandRouter, argument: &str) -> Result<Outcome, CommandError> {
        if self.depth >= self.max_depth {
            warn!(depth = self.depth, script = argument, "script depth limit reached");
            return Err(ScriptError::DepthExceeded {
                limit: self.max_depth,
            }
            .into());
        }

        let path = resolve_script(router.settings(), argument)?;
        let lines = read_script(&path)?;
        info!(path = %path.display(), depth = self.depth, lines = lines.len(), "executing script");

        let previous = router.script_depth();
        router.set_script_depth(self.depth + 1);
        let walked = walk(router, &lines);
        router.set_script_depth(previous);

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| argument.to_string());
        let Walked {
            mut notices,
            commands,
            errors,
            exit,
        } = walked;
        notices.push(Notice::Info(format!(
            "Script '{}' finished: {} commands, {} errors",
            name, commands, errors
        )));

        if exit {
            Ok(Outcome::Exit(notices))
        } else {
            Ok(Outcome::Continue(notices))
        }
    }
}

struct Walked {
    notices: Vec<Notice>,
    commands: usize,
    errors: usize,
    exit: bool,
}

fn walk(router: &mut CommandRouter, lines: &[ScriptLine]) -> Walked {
    let mut walked = Walked {
        notices: Vec::new(),
        commands: 0,
        errors: 0,
        exit: false,
    };
    let mut cursor = 0;

    while cursor < lines.len() {
        let line = &lines[cursor];
        cursor += 1;

        let mut tokens = line.text.split_whitespace();
        let Some(name) = tokens.next() else {
            continue;
        };
        let Some(kind) = CommandKind::from_name(name) else {
            walked
                .notices
                .push(Notice::Warning(format!("Unknown command in script: {}", name)));
            continue;
        };

        let mut args: Vec<&str> = tokens.collect();
        if lacks_argument(kind, &args) {
            if let Some(next) = lines.get(cursor) {
                args = next.text.split_whitespace().collect();
                cursor += 1;
            }
        }

        // the block is consumed even when the command is rejected
        let needed = kind.answer_lines();
        let available = needed.min(lines.len() - cursor);
        let block = &lines[cursor..cursor + available];
        cursor += available;

        walked.commands += 1;
        let result = match router.prepare(kind, &args) {
            Err(err) => Err(err),
            Ok(_) if available < needed => Err(ScriptError::ShortAnswerBlock {
                command: kind.name(),
                needed,
                got: available,
            }
            .into()),
            Ok(command) if needed > 0 => {
                let mut answers = ScriptedInput::new(block.iter().map(|l| l.text.clone()));
                let result = router.dispatch(command, &mut answers);
                walked.notices.extend(
                    answers
                        .rejections()
                        .iter()
                        .map(|message| Notice::Warning(message.clone())),
                );
                result
            }
            Ok(command) => router.dispatch(command, &mut NoInput),
        };

        match result {
            Ok(Outcome::Continue(notices)) => walked.notices.extend(notices),
            Ok(Outcome::Exit(notices)) => {
                walked.notices.extend(notices);
                walked.exit = true;
                break;
            }
            Err(err) => {
                walked.errors += 1;
                walked
                    .notices
                    .push(Notice::Error(format!("Line {}: {}", line.number, err)));
            }
        }
    }
    walked
}

/// True when the argument has to come from the next script line. A lone
/// `update id` counts, since the id itself is still missing.
fn lacks_argument(kind: CommandKind, args: &[&str]) -> bool {
    match args {
        [] => matches!(kind.argument(), Argument::Required(_)),
        [keyword] => kind == CommandKind::Update && keyword.eq_ignore_ascii_case("id"),
        _ => false,
    }
}

fn read_script(path: &Path) -> Result<Vec<ScriptLine>, ScriptError> {
    let content = fs::read_to_string(path).map_err(|source| ScriptError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(content
        .lines()
        .enumerate()
        .map(|(index, text)| ScriptLine {
            number: index + 1,
            text: text.trim().to_string(),
        })
        .filter(|line| !line.text.is_empty())
        .collect())
}

/// Finds the script file, matching the file name case-insensitively in each
/// search directory. The first match wins.
pub fn resolve_script(settings: &Settings, argument: &str) -> Result<PathBuf, ScriptError> {
    let expanded = shellexpand::tilde(argument.trim());
    let direct = Path::new(expanded.as_ref());
    if direct.is_absolute() && direct.is_file() {
        return Ok(direct.to_path_buf());
    }

    let wanted = direct
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .ok_or_else(|| ScriptError::NotFound(argument.to_string()))?;

    for dir in settings.script_search_dirs(argument) {
        let exact = dir.join(direct.file_name().unwrap_or_default());
        if exact.is_file() {
            return Ok(exact);
        }
        let Ok(entries) = fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if entry.file_name().to_string_lossy().to_lowercase() == wanted && path.is_file() {
                return Ok(path);
            }
        }
    }
    Err(ScriptError::NotFound(argument.to_string()))
}
