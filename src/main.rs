//! CLI tool to tokenize, parse and check Galaxy source files.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use log::{LevelFilter, debug};

use galaxy_frontend::{Diagnostic, parse_source, print_tree, report, tokenize};

#[derive(Parser)]
#[command(name = "galaxyc")]
#[command(about = "Galaxy front end: lex, parse and inspect source files", version)]
struct Cli {
    /// Print diagnostics without ANSI colours
    #[arg(long, global = true)]
    no_color: bool,

    /// Raise log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the token stream of each file
    Tokens {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Print the syntax tree of each file
    Ast {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Only report diagnostics
    Check {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Tokens,
    Ast,
    Check,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let color = !cli.no_color;

    let (mode, files) = match cli.command {
        Commands::Tokens { files } => (Mode::Tokens, files),
        Commands::Ast { files } => (Mode::Ast, files),
        Commands::Check { files } => (Mode::Check, files),
    };

    let mut had_error = false;

    for path in &files {
        match run_file(path, mode, color) {
            Ok(clean) => had_error |= !clean,
            Err(err) => {
                eprintln!("error: {err:#}");
                had_error = true;
            }
        }
    }

    if had_error {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp(None)
        .parse_default_env()
        .init();
}

/// Process one file and print its diagnostics. Returns whether it was clean.
fn run_file(path: &Path, mode: Mode, color: bool) -> Result<bool> {
    let source = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let source_id = path.display().to_string();
    debug!("{source_id}: read {} byte(s)", source.len());

    let diagnostics: Vec<Diagnostic> = if mode == Mode::Tokens {
        let (tokens, errors) = tokenize(&source, &source_id);
        for token in &tokens {
            println!("{token}");
        }
        errors.into_iter().map(Diagnostic::from).collect()
    } else {
        let parsed = parse_source(&source, &source_id);
        if mode == Mode::Ast {
            print!("{}", print_tree(&parsed.ast));
        } else if !parsed.has_errors() {
            eprintln!(
                "{source_id}: ok ({} statement(s))",
                parsed.ast.statements().len()
            );
        }
        parsed.diagnostics
    };

    for diagnostic in &diagnostics {
        eprint!("{}", report::render(diagnostic, &source, color));
    }
    if !diagnostics.is_empty() {
        eprintln!("{source_id}: {} error(s)", diagnostics.len());
    }

    Ok(diagnostics.is_empty())
}
