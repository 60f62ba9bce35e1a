// Unraid BFF — CLI Command Handlers
//
// `serve` runs the HTTP API. `servers` and `audit` read the data directory
// directly and print to stdout, so they work while the server is stopped.

use crate::config::Config;
use crate::error::BffError;
use crate::store::{AuditLog, CredentialStore, FileCredentialStore};

use super::Commands;

/// Execute the parsed CLI command.
pub async fn execute(command: Option<Commands>, config: Config) -> Result<(), BffError> {
    match command.unwrap_or(Commands::Serve) {
        Commands::Serve => crate::serve(config).await,
        Commands::Servers => crate::run_blocking(move || cmd_servers(&config)).await,
        Commands::Audit { limit } => crate::run_blocking(move || cmd_audit(&config, limit)).await,
    }
}

// ─── Servers ─────────────────────────────────────────────────────────────────

fn cmd_servers(config: &Config) -> Result<(), BffError> {
    let store = FileCredentialStore::open(&config.data_dir, config.encryption_key.as_deref())?;
    let listing = store.list_all()?;

    if listing.servers.is_empty() {
        println!("No servers configured yet.");
        println!("Add one from the PWA, or POST /api/servers.");
        return Ok(());
    }

    println!("Stored servers ({}):\n", listing.servers.len());
    for server in &listing.servers {
        let marker = if listing.active_server_id.as_deref() == Some(server.id.as_str()) {
            "*"
        } else {
            " "
        };
        println!(
            "{} {} │ {:20} │ {} │ {}",
            marker,
            server.id,
            server.name,
            server.base_url,
            if server.scopes.is_empty() {
                "-".to_string()
            } else {
                server.scopes.join(", ")
            },
        );
    }

    Ok(())
}

// ─── Audit ───────────────────────────────────────────────────────────────────

fn cmd_audit(config: &Config, limit: usize) -> Result<(), BffError> {
    let audit = AuditLog::in_dir(&config.data_dir);
    let entries = audit.entries()?;

    if entries.is_empty() {
        println!("No write actions recorded in {}", audit.path().display());
        return Ok(());
    }

    let skip = entries.len().saturating_sub(limit);
    println!("{:-<80}", "");
    for entry in &entries[skip..] {
        println!(
            "{} │ {:22} │ {:40} │ {:?}",
            entry.timestamp.to_rfc3339(),
            entry.action,
            entry.target,
            entry.result,
        );
    }
    println!("{:-<80}", "");

    Ok(())
}
