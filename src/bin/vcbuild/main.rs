//! vcbuild CLI - A lightweight MSVC build orchestrator

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};
use vcbuild::builder::BuildError;
use vcbuild::core::ConfigError;
use vcbuild::util::diagnostic::{emit, Diagnostic};
use vcbuild::util::Shell;

fn main() {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("vcbuild=debug")
    } else {
        EnvFilter::new("vcbuild=warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let shell = Shell::from_flags(cli.quiet, cli.verbose, cli.color);

    if let Err(e) = run(cli.command, &shell) {
        match diagnostic_for(&e) {
            Some(diag) => emit(&diag, shell.use_color()),
            None => match error_detail(&e) {
                Some(detail) => shell.error_with_detail(&e, detail),
                None => shell.error(&e),
            },
        }
        std::process::exit(1);
    }
}

fn run(command: Commands, shell: &Shell) -> Result<()> {
    match command {
        Commands::Build(args) => commands::build::execute(args, shell),
        Commands::Clean => commands::clean::execute(shell),
        Commands::Init(args) => commands::init::execute(args, shell),
        Commands::Config(args) => commands::config::execute(args),
        Commands::Gui => commands::gui::execute(shell),
    }
}

/// The cause chain below the top-level message, if any.
fn error_detail(e: &anyhow::Error) -> Option<String> {
    let causes: Vec<String> = e.chain().skip(1).map(|c| c.to_string()).collect();
    (!causes.is_empty()).then(|| causes.join(": "))
}

/// Typed errors render as diagnostics with context and suggestions.
fn diagnostic_for(e: &anyhow::Error) -> Option<Diagnostic> {
    e.downcast_ref::<BuildError>()
        .map(BuildError::to_diagnostic)
        .or_else(|| e.downcast_ref::<ConfigError>().map(ConfigError::to_diagnostic))
}
