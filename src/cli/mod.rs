// Unraid BFF — CLI Module
//
// Command-line interface using clap derive macros. Flags override the
// `UNRAID_BFF_*` environment. Subcommands: serve (default), servers, audit.

mod commands;

use std::net::IpAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

pub use commands::execute;

use crate::config::Config;

/// Unraid BFF: a backend-for-frontend for the Unraid GraphQL API.
#[derive(Parser, Debug)]
#[command(name = "unraid-bff")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub overrides: Overrides,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Args, Debug, Default)]
pub struct Overrides {
    /// Address to bind (UNRAID_BFF_HOST).
    #[arg(long, global = true)]
    pub host: Option<IpAddr>,

    /// Port to bind (UNRAID_BFF_PORT).
    #[arg(long, global = true)]
    pub port: Option<u16>,

    /// Directory holding servers.enc, the key file and audit.log (UNRAID_BFF_DATA_DIR).
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,
}

impl Overrides {
    pub fn apply(self, mut config: Config) -> Config {
        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(data_dir) = self.data_dir {
            config.data_dir = data_dir;
        }
        config
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve the HTTP API (the default).
    Serve,

    /// List stored servers (metadata only, never api keys).
    Servers,

    /// Show the most recent write-action audit entries.
    Audit {
        /// Number of entries to show.
        #[arg(long, default_value = "20")]
        limit: usize,
    },
}
