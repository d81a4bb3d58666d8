use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use rustyline::error::ReadlineError;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use bandheap::core::command::{CommandRouter, Outcome};
use bandheap::core::config::Settings;
use bandheap::core::error::CommandError;
use bandheap::core::prompt::InputSource;
use bandheap::core::script::ScriptInterpreter;
use bandheap::output::Printer;
use bandheap::repl::Repl;

const PROMPT: &str = "bands> ";
const LOG_ENV: &str = "BANDHEAP_LOG";

fn main() -> io::Result<()> {
    init_logging();

    let printer = Printer::new();
    let (base_dir, settings) = bootstrap(&printer);

    let mut router = CommandRouter::new(settings);
    printer.emit_all(&router.load_default());

    let args: Vec<String> = std::env::args().collect();
    if args.len() > 1 {
        let script = &args[1];
        match ScriptInterpreter::new().run(&mut router, script) {
            Ok(outcome) => printer.emit_all(outcome.notices()),
            Err(e) => printer.error(&format!("Error: {}", e)),
        }
        return Ok(());
    }

    interactive_mode(&mut router, &base_dir)
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// Resolves the base directory and settings, falling back to defaults so
/// the shell always starts.
fn bootstrap(printer: &Printer) -> (PathBuf, Settings) {
    let base_dir = match Settings::base_dir() {
        Ok(dir) => dir,
        Err(e) => {
            printer.warning(&format!("{}, using current directory", e));
            PathBuf::from(".")
        }
    };
    let settings = match Settings::load_or_create(&base_dir) {
        Ok(settings) => settings,
        Err(e) => {
            warn!(error = %e, "settings unavailable");
            printer.warning(&format!("Could not load settings: {}", e));
            Settings::defaults()
        }
    };
    debug!(base = %base_dir.display(), paths = ?settings.data_paths, "configuration ready");
    (base_dir, settings)
}

fn interactive_mode(router: &mut CommandRouter, base_dir: &Path) -> io::Result<()> {
    ctrlc::set_handler(|| {
        // rustyline reports Ctrl-C as Interrupted while it owns the terminal
    })
    .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

    let mut repl = match Repl::new(base_dir) {
        Ok(repl) => repl,
        Err(e) => {
            println!("Error: {}", e);
            println!("Falling back to basic input mode...");
            return interactive_mode_fallback(router);
        }
    };

    repl.printer().header("bandheap");
    println!("Music band collection shell. Type 'help' for commands, 'exit' to quit.");

    loop {
        let line = match repl.read_command(PROMPT) {
            Ok(Some(line)) => line,
            Ok(None) => continue,
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                repl.printer().error(&format!("Input error: {}", e));
                break;
            }
        };

        let result = router.execute_line(&line, &mut repl);
        if finish(result, repl.printer()) {
            if let Err(e) = repl.save_history() {
                warn!(error = %e, "history not saved");
            }
            std::process::exit(0);
        }
    }

    if let Err(e) = repl.save_history() {
        warn!(error = %e, "history not saved");
    }
    Ok(())
}

/// Plain stdin loop for terminals the line editor cannot drive.
fn interactive_mode_fallback(router: &mut CommandRouter) -> io::Result<()> {
    let printer = Printer::new();
    let mut input = StdinInput;

    loop {
        print!("{}", PROMPT);
        io::stdout().flush()?;

        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Ok(());
        }
        if line.trim().is_empty() {
            continue;
        }

        let result = router.execute_line(&line, &mut input);
        if finish(result, &printer) {
            std::process::exit(0);
        }
    }
}

/// Prints the outcome and reports whether the process should exit.
fn finish(result: Result<Outcome, CommandError>, printer: &Printer) -> bool {
    match result {
        Ok(outcome) => {
            printer.emit_all(outcome.notices());
            outcome.is_exit()
        }
        Err(e) => {
            printer.error(&format!("Error: {}", e));
            false
        }
    }
}

struct StdinInput;

impl InputSource for StdinInput {
    fn read_line(&mut self, prompt: &str) -> Option<String> {
        print!("{}", prompt);
        io::stdout().flush().ok()?;
        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
        }
    }

    fn notify(&mut self, message: &str) {
        println!("{}", message);
    }
}
