// Unraid BFF — Configuration
//
// Environment-driven settings, read once at startup. `from_kv` takes the
// variables as a map so tests never touch the process environment.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

pub const ENV_HOST: &str = "UNRAID_BFF_HOST";
pub const ENV_PORT: &str = "UNRAID_BFF_PORT";
pub const ENV_DATA_DIR: &str = "UNRAID_BFF_DATA_DIR";
pub const ENV_ENCRYPTION_KEY: &str = "UNRAID_BFF_ENCRYPTION_KEY";
pub const ENV_ORIGIN: &str = "UNRAID_BFF_ORIGIN";
pub const ENV_TRUST_PROXY: &str = "UNRAID_BFF_TRUST_PROXY";
pub const ENV_UPSTREAM_TIMEOUT_MS: &str = "UNRAID_BFF_UPSTREAM_TIMEOUT_MS";
pub const ENV_WRITE_RATE_LIMIT: &str = "UNRAID_BFF_WRITE_RATE_LIMIT";
pub const ENV_WRITE_RATE_WINDOW_SECS: &str = "UNRAID_BFF_WRITE_RATE_WINDOW_SECS";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} is not a valid {expected}: {value:?}")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },

    #[error("{name} must be greater than zero")]
    Zero { name: &'static str },
}

#[derive(Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub data_dir: PathBuf,
    pub encryption_key: Option<String>,
    /// Lower-cased CORS origins; `*` allows any.
    pub allowed_origins: Vec<String>,
    /// Take the client address from `x-forwarded-for` when behind a proxy.
    pub trust_proxy: bool,
    pub upstream_timeout: Duration,
    pub write_rate_limit: u32,
    pub write_rate_window: Duration,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let vars: HashMap<String, String> = std::env::vars().collect();
        Self::from_kv(&vars)
    }

    pub fn from_kv(kv: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let get = |name: &str| {
            kv.get(name)
                .map(|value| value.trim())
                .filter(|value| !value.is_empty())
        };

        let host = match get(ENV_HOST) {
            Some(raw) => raw.parse().map_err(|_| invalid(ENV_HOST, "IP address", raw))?,
            None => IpAddr::from([0, 0, 0, 0]),
        };
        let port = parse_number(get(ENV_PORT), ENV_PORT, 3001u16)?;
        let data_dir = get(ENV_DATA_DIR).map(PathBuf::from).unwrap_or_else(|| PathBuf::from("data"));
        let encryption_key = get(ENV_ENCRYPTION_KEY).map(str::to_string);

        let allowed_origins = get(ENV_ORIGIN)
            .unwrap_or("*")
            .split(',')
            .map(|origin| origin.trim().to_lowercase())
            .filter(|origin| !origin.is_empty())
            .collect();

        let trust_proxy = match get(ENV_TRUST_PROXY).map(str::to_lowercase).as_deref() {
            None | Some("false") | Some("0") | Some("no") => false,
            Some("true") | Some("1") | Some("yes") => true,
            Some(other) => return Err(invalid(ENV_TRUST_PROXY, "boolean", other)),
        };

        let timeout_ms = parse_number(get(ENV_UPSTREAM_TIMEOUT_MS), ENV_UPSTREAM_TIMEOUT_MS, 15_000u64)?;
        let write_rate_limit = parse_number(get(ENV_WRITE_RATE_LIMIT), ENV_WRITE_RATE_LIMIT, 20u32)?;
        let window_secs = parse_number(get(ENV_WRITE_RATE_WINDOW_SECS), ENV_WRITE_RATE_WINDOW_SECS, 60u64)?;

        for (name, value) in [
            (ENV_UPSTREAM_TIMEOUT_MS, timeout_ms),
            (ENV_WRITE_RATE_LIMIT, u64::from(write_rate_limit)),
            (ENV_WRITE_RATE_WINDOW_SECS, window_secs),
        ] {
            if value == 0 {
                return Err(ConfigError::Zero { name });
            }
        }

        Ok(Self {
            host,
            port,
            data_dir,
            encryption_key,
            allowed_origins,
            trust_proxy,
            upstream_timeout: Duration::from_millis(timeout_ms),
            write_rate_limit,
            write_rate_window: Duration::from_secs(window_secs),
        })
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn allows_any_origin(&self) -> bool {
        self.allowed_origins.iter().any(|origin| origin == "*")
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("bind_addr", &self.bind_addr())
            .field("data_dir", &self.data_dir)
            .field(
                "encryption_key",
                &self.encryption_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("allowed_origins", &self.allowed_origins)
            .field("trust_proxy", &self.trust_proxy)
            .field("upstream_timeout", &self.upstream_timeout)
            .field("write_rate_limit", &self.write_rate_limit)
            .field("write_rate_window", &self.write_rate_window)
            .finish()
    }
}

fn invalid(name: &'static str, expected: &'static str, value: &str) -> ConfigError {
    ConfigError::Invalid {
        name,
        expected,
        value: value.to_string(),
    }
}

fn parse_number<T: std::str::FromStr>(raw: Option<&str>, name: &'static str, default: T) -> Result<T, ConfigError> {
    match raw {
        Some(raw) => raw.parse().map_err(|_| invalid(name, "number", raw)),
        None => Ok(default),
    }
}
