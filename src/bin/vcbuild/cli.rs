//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use vcbuild::util::shell::ColorChoice;

/// vcbuild - A lightweight MSVC build orchestrator for C/C++ projects
#[derive(Parser)]
#[command(name = "vcbuild")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Echo command lines and full toolchain output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print errors only
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Coloring: auto, always, never
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    pub color: ColorChoice,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build the project in the current directory
    Build(BuildArgs),

    /// Remove build output, stray intermediates and the build cache
    Clean,

    /// Create a vcbuild.json template
    Init(InitArgs),

    /// Print the resolved configuration
    Config(ConfigArgs),

    /// Open the configuration editor
    Gui,
}

#[derive(Args)]
pub struct BuildArgs {
    /// Profile to build with
    #[arg(short, long, default_value = "release")]
    pub profile: String,

    /// Add a preprocessor definition (repeatable)
    #[arg(short = 'D', long = "define", value_name = "MACRO")]
    pub defines: Vec<String>,

    /// Override the target architecture (x86, x64, arm64)
    #[arg(long, value_name = "ARCH")]
    pub arch: Option<String>,

    /// Override the language standard (e.g. c++17)
    #[arg(long, value_name = "STD")]
    pub standard: Option<String>,

    /// Override the output file name
    #[arg(short, long, value_name = "NAME")]
    pub output: Option<String>,

    /// Clean before building
    #[arg(long)]
    pub rebuild: bool,

    /// Print the toolchain commands without running them
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args)]
pub struct InitArgs {
    /// Directory to initialize (defaults to current directory)
    pub path: Option<PathBuf>,
}

#[derive(Args)]
pub struct ConfigArgs {
    /// Profile to resolve
    #[arg(default_value = "release")]
    pub profile: String,
}
