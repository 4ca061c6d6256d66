//! Vario CLI - command-line interface for the vario avionics core.

mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "vario")]
#[command(author, version, about = "Vario avionics dataflow CLI", long_about = None)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a machine's processing loop
    Run(commands::run::RunArgs),

    /// Load, wire and validate a machine without running it
    Check(commands::check::CheckArgs),

    /// Run a machine briefly and print its socket table
    Sockets(commands::sockets::SocketsArgs),

    /// List available module types and their sockets and settings
    Modules(commands::modules::ModulesArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run(args) => commands::run::run(args),
        Commands::Check(args) => commands::check::run(args),
        Commands::Sockets(args) => commands::sockets::run(args),
        Commands::Modules(args) => commands::modules::run(args),
    }
}
