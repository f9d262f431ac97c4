//! Interactive inspector shell.

use std::io::{self, Write};
use std::time::Instant;

use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use survey::{Error, Result};

use crate::commands::{CommandSet, Env, Flow, Session};

fn readline_error(e: ReadlineError) -> Error {
    Error::Io(io::Error::new(io::ErrorKind::Other, e.to_string()))
}

/// Load the survey and read commands until `quit` or end of input.
pub fn run(env: &Env) -> Result<()> {
    println!("Loading survey data from {}...", env.source.display());
    let start = Instant::now();
    let loaded = env.load()?;
    println!(
        "Loaded {} questions and {} responses from {} in {:.2?}",
        loaded.data.schema.len(),
        loaded.data.responses.len(),
        loaded.origin.as_str(),
        start.elapsed()
    );

    let commands = CommandSet::standard()?;
    let session = Session::new(loaded.data, env.config.display);

    let mut rl = DefaultEditor::new().map_err(readline_error)?;
    let history_path = env.config.history_path();
    if env.config.history {
        // Missing history on first run is fine
        let _ = rl.load_history(&history_path);
    }

    println!("Survey CLI. Type {}.", commands.help().bold());

    let mut stdout = io::stdout();
    loop {
        match rl.readline(&env.config.prompt) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line);

                let flow = commands.execute(&session, line, &mut stdout);
                stdout.flush()?;
                match flow {
                    Ok(Flow::Continue) => {}
                    Ok(Flow::Quit) => break,
                    Err(e) => eprintln!("{} {}", "Error:".red().bold(), e),
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(readline_error(e)),
        }
    }

    if env.config.history {
        if let Err(e) = std::fs::create_dir_all(&env.config.root) {
            tracing::warn!(path = %env.config.root.display(), "failed to create config dir: {}", e);
        } else if let Err(e) = rl.save_history(&history_path) {
            tracing::warn!(path = %history_path.display(), "failed to save history: {}", e);
        }
    }

    Ok(())
}
