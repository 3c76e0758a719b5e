//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

use slipway::project::report::OutputFormat;
use slipway::util::config::Mode;

/// Slipway - build configuration for C/C++ projects
#[derive(Parser)]
#[command(name = "slipway")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Configure the project and plan its targets
    Build(BuildArgs),

    /// Probe every declared external library
    Check(CheckArgs),

    /// List declared targets
    Targets(TargetsArgs),

    /// Show the merged environment for a target
    Flags(FlagsArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args)]
pub struct BuildArgs {
    /// Path to Slipway.toml (defaults to searching upward from the
    /// current directory)
    #[arg(long)]
    pub manifest_path: Option<PathBuf>,

    /// Compilation mode
    #[arg(short, long)]
    pub mode: Option<Mode>,

    /// Skip external-library verification
    #[arg(long)]
    pub no_check: bool,

    /// Report probe failures without failing the run
    #[arg(long)]
    pub ignore_errors: bool,

    /// Number of parallel verification jobs
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Report format
    #[arg(long, default_value = "human")]
    pub output_format: OutputFormat,
}

#[derive(Args)]
pub struct CheckArgs {
    /// Path to Slipway.toml
    #[arg(long)]
    pub manifest_path: Option<PathBuf>,

    /// Number of parallel probe jobs
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Report format
    #[arg(long, default_value = "human")]
    pub output_format: OutputFormat,
}

#[derive(Args)]
pub struct TargetsArgs {
    /// Path to Slipway.toml
    #[arg(long)]
    pub manifest_path: Option<PathBuf>,
}

#[derive(Args)]
pub struct FlagsArgs {
    /// Target name
    pub target: String,

    /// Path to Slipway.toml
    #[arg(long)]
    pub manifest_path: Option<PathBuf>,

    /// Compilation mode
    #[arg(short, long)]
    pub mode: Option<Mode>,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: Shell,
}
