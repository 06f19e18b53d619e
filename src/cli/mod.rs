//! CLI for the Mica compiler front-end
//!
//! ## Commands
//!
//! - `check <file>` - run the full pipeline and report diagnostics
//! - `tokens <file>` - lex only and dump the token stream
//! - `ast <file>` - lex and parse, then dump the tree
//!
//! Command functions return `CliResult` instead of calling `process::exit`;
//! only the top-level `run()` handles errors and exits.

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};

use crate::dump;
use crate::frontend::diagnostics::{render_diagnostic, Diagnostics};
use crate::frontend::{analyzer, lexer, parser};

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const FAILURE: ExitCode = ExitCode(1);
}

/// Error type for CLI operations: a user-facing message plus an exit code.
#[derive(Debug)]
pub struct CliError {
    pub message: String,
    pub code: ExitCode,
}

impl CliError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: ExitCode::FAILURE,
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

pub type CliResult = Result<ExitCode, CliError>;

#[derive(Parser)]
#[command(
    name = "mica",
    version,
    about = "Compiler front-end for the Mica programming language"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full pipeline (lex, parse, analyze) and report diagnostics
    Check { file: PathBuf },
    /// Dump the token stream
    Tokens { file: PathBuf },
    /// Dump the parsed tree
    Ast { file: PathBuf },
}

/// Parse arguments, dispatch, and exit with the resulting code.
pub fn run() {
    let cli = Cli::parse();
    let result = match cli.command {
        Command::Check { file } => check(&file),
        Command::Tokens { file } => tokens(&file),
        Command::Ast { file } => ast(&file),
    };
    match result {
        Ok(code) => process::exit(code.0),
        Err(error) => {
            eprintln!("error: {error}");
            process::exit(error.code.0);
        }
    }
}

fn read_source(path: &Path) -> Result<String, CliError> {
    fs::read_to_string(path)
        .map_err(|e| CliError::new(format!("failed to read {}: {e}", path.display())))
}

fn report(path: &Path, source: &str, sink: &Diagnostics) {
    for diagnostic in sink.iter() {
        eprint!("{}", render_diagnostic(&path.display().to_string(), source, diagnostic));
    }
}

fn check(path: &Path) -> CliResult {
    let source = read_source(path)?;
    let mut sink = Diagnostics::new();

    let tokens = lexer::lex(&source, &mut sink);
    let mut program = parser::parse(&tokens, &mut sink);
    analyzer::analyze(&mut program, &mut sink);

    report(path, &source, &sink);
    if sink.has_errors() {
        eprintln!(
            "{}: {} error(s)",
            path.display(),
            sink.error_count()
        );
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn tokens(path: &Path) -> CliResult {
    let source = read_source(path)?;
    let mut sink = Diagnostics::new();
    let tokens = lexer::lex(&source, &mut sink);
    print!("{}", dump::dump_tokens(&tokens));
    report(path, &source, &sink);
    Ok(if sink.has_errors() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn ast(path: &Path) -> CliResult {
    let source = read_source(path)?;
    let mut sink = Diagnostics::new();
    let tokens = lexer::lex(&source, &mut sink);
    let program = parser::parse(&tokens, &mut sink);
    print!("{}", dump::dump_program(&program));
    report(path, &source, &sink);
    Ok(if sink.has_errors() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
