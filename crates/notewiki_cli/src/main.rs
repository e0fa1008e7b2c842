//! `notewiki` executable.
//!
//! # Responsibility
//! - Resolve configuration, start logging and open the wiki under the data
//!   root.
//! - Print errors to stderr and exit non-zero on failure.

mod args;
mod commands;

use args::{Cli, Commands};
use clap::Parser;
use commands::{CommandError, Session};
use log::error;
use notewiki_core::{
    init_logging, CommandEditor, ConfigOverrides, FsNoteRepository, WikiConfig, WikiService,
};
use std::io::{self, BufRead, Write};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=command module=cli status=error error={err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CommandError> {
    let config = WikiConfig::resolve(
        ConfigOverrides {
            root: cli.data,
            log_level: cli.log_level,
            editor: cli.editor,
        },
        |key| std::env::var(key).ok(),
        dirs::home_dir(),
    )?;
    if let Err(message) = init_logging(&config.log_level, &config.log_dir()) {
        eprintln!("warning: file logging disabled: {message}");
    }

    let repo = FsNoteRepository::open(config.notes_dir())?;
    let mut wiki = WikiService::open(repo)?;
    let editor = CommandEditor::new(config.editor.as_str());

    let stdout = io::stdout();
    let stderr = io::stderr();
    let mut out = stdout.lock();
    let mut err = stderr.lock();
    let mut confirm = |question: &str| -> io::Result<bool> {
        let mut prompt = io::stderr().lock();
        write!(prompt, "{question} [y/N] ")?;
        prompt.flush()?;
        let mut answer = String::new();
        io::stdin().lock().read_line(&mut answer)?;
        Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
    };
    let mut session = Session {
        editor: &editor,
        out: &mut out,
        err: &mut err,
        confirm: &mut confirm,
    };

    match cli.command {
        Commands::Wiki(command) => commands::run(command, &mut wiki, &mut session),
    }
}
