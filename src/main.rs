use std::{
    io,
    path::{Path, PathBuf},
    process::ExitCode,
};

use clap::Parser;
use rustyline::{error::ReadlineError, DefaultEditor};
use simian::{EvaluationContext, SimianError};
use tracing::debug;

const SOURCE_EXTENSIONS: [&str; 4] = ["m", "mk", "mon", "sim"];

/// simian runs programs written in a small expression language with
/// first-class functions, arrays and dictionaries.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Source file to run. Starts an interactive session when omitted.
    #[arg(conflicts_with = "file")]
    path: Option<PathBuf>,

    /// Source file to run, given as an option instead.
    #[arg(short, long, value_name = "FILE")]
    file: Option<PathBuf>,

    /// Don't print the banner when starting an interactive session.
    #[arg(short, long)]
    quiet: bool,
}

/// Only installs a subscriber if RUST_LOG is set, so normal runs print
/// nothing but program output.
fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(io::stderr).with_target(true))
            .with(EnvFilter::from_default_env())
            .init();
    }
}

fn report(error: &SimianError) {
    match error {
        SimianError::Syntax(errors) => {
            eprintln!("Parse errors:");
            for error in errors {
                eprintln!("\t- {error}");
            }
        }
        SimianError::Runtime(message) => {
            eprintln!("Runtime error:");
            eprintln!("\t- {message}");
        }
        SimianError::UnsupportedExtension(_) => {
            eprintln!("{error}");
            eprintln!("Use a file ending with .m, .mk, .mon or .sim");
        }
        SimianError::Io { source, .. } => eprintln!("{error}: {source}"),
    }
}

fn read_source(path: &Path) -> Result<String, SimianError> {
    let extension = path.extension().and_then(|extension| extension.to_str()).unwrap_or_default();
    if !SOURCE_EXTENSIONS.contains(&extension) {
        let shown = if extension.is_empty() { "unknown" } else { extension };
        return Err(SimianError::UnsupportedExtension(shown.to_owned()));
    }

    std::fs::read_to_string(path).map_err(|source| SimianError::Io { path: path.to_owned(), source })
}

fn run_file(path: &Path) -> Result<(), SimianError> {
    debug!(path = %path.display(), "running file");

    let source = read_source(path)?;
    EvaluationContext::new().evaluate_str(&source)?;
    Ok(())
}

/// `None` once the session should end: on Ctrl-D, or on Ctrl-C after
/// telling the user.
fn prompt_line(input: Result<String, ReadlineError>) -> anyhow::Result<Option<String>> {
    match input {
        Ok(line) => Ok(Some(line)),
        Err(ReadlineError::Interrupted) => {
            println!("Keyboard Interrupt - stopping execution");
            Ok(None)
        }
        Err(ReadlineError::Eof) => Ok(None),
        Err(err) => Err(err.into()),
    }
}

fn repl(quiet: bool) -> anyhow::Result<()> {
    if !quiet {
        println!("simian {}", env!("CARGO_PKG_VERSION"));
        println!("Type exit() to leave and help() to list the builtin functions.");
    }

    let mut context = EvaluationContext::new();
    let mut editor = DefaultEditor::new()?;

    loop {
        let Some(line) = prompt_line(editor.readline(">> "))? else {
            return Ok(());
        };
        if line.trim().is_empty() {
            continue;
        }
        editor.add_history_entry(line.as_str())?;

        match context.evaluate_str(&line) {
            Ok(Some(value)) => println!("{value}"),
            Ok(None) => {}
            Err(error) => report(&error),
        }
    }
}

fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();
    init_tracing();

    match args.file.or(args.path) {
        Some(path) => match run_file(&path) {
            Ok(()) => Ok(ExitCode::SUCCESS),
            Err(error) => {
                report(&error);
                Ok(ExitCode::FAILURE)
            }
        },
        None => {
            repl(args.quiet)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
