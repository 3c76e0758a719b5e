//! Slipway CLI - build configuration for C/C++ projects

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    // Parse CLI
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("slipway=debug")
    } else {
        EnvFilter::new("slipway=info")
    };

    // Logs go to stderr; stdout is reserved for reports.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let color = !cli.no_color;

    // Execute command
    match cli.command {
        Commands::Build(args) => commands::build::execute(args, color),
        Commands::Check(args) => commands::check::execute(args, color),
        Commands::Targets(args) => commands::targets::execute(args),
        Commands::Flags(args) => commands::flags::execute(args),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
