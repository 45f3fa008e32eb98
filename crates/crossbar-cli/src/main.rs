//! Crossbar CLI - command-line host for crossbar routing matrices.

mod commands;
mod script;
mod wav;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "crossbar")]
#[command(author, version, about = "Crossbar routing matrix CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply control events and print the router's responses
    Run(commands::run::RunArgs),

    /// Mix a multichannel WAV file through the matrix
    Render(commands::render::RenderArgs),

    /// Validate a configuration file and summarize it
    Check(commands::check::CheckArgs),
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays a clean response stream
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => commands::run::run(args),
        Commands::Render(args) => commands::render::run(args),
        Commands::Check(args) => commands::check::run(args),
    }
}
