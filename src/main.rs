// Unraid BFF — Application Entry Point
//
// Parses CLI arguments, initializes structured logging (the default filter
// never emits api keys or key material), and dispatches to the command handler.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use unraid_bff::cli::{execute, Cli};
use unraid_bff::Config;

#[tokio::main]
async fn main() {
    // RUST_LOG=unraid_bff=debug for verbose output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("unraid_bff=info,tower_http=info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let config = match Config::load() {
        Ok(config) => cli.overrides.apply(config),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = execute(cli.command, config).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
