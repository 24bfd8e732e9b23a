use clap::Parser;
use tracing_subscriber::EnvFilter;

use credvault::cli::{Cli, Commands};

fn main() {
    // Diagnostics go to stderr; RUST_LOG=credvault=debug for detail.
    // Events never carry passwords or key bytes.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("credvault=warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Add {
            ref service,
            ref username,
        } => credvault::cli::commands::add::execute(&cli, service, username),
        Commands::Get { ref service, show } => {
            credvault::cli::commands::get::execute(&cli, service, show)
        }
        Commands::List => credvault::cli::commands::list::execute(&cli),
        Commands::KeyInfo => credvault::cli::commands::key_info::execute(&cli),
    };

    if let Err(e) = result {
        credvault::cli::output::error(&e.to_string());
        std::process::exit(1);
    }
}
