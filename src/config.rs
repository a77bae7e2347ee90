//! Layered configuration.
//!
//! Sources, later ones overriding earlier ones:
//!
//! 1. built-in defaults
//! 2. an optional file (`garage.toml` unless another name is given)
//! 3. environment variables prefixed `GARAGE`, nested keys separated by
//!    `__` (`GARAGE_SERVER__PORT=9000`, `GARAGE_DATABASE__URL=...`)

use std::net::SocketAddr;

use serde::Deserialize;

use crate::error::Error;

/// File name (without extension) read when none is configured.
pub const DEFAULT_FILE: &str = "garage";

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub http: HttpConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Clone, Debug, Deserialize)]
pub struct DatabaseConfig {
    /// sqlx connection URL, e.g. `sqlite://garage.db` or `sqlite::memory:`.
    pub url: String,
    pub max_connections: u32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct HttpConfig {
    /// Send the permissive CORS headers on every response.
    pub cors: bool,
}

#[derive(Clone, Debug, Deserialize)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is unset.
    pub level: String,
}

impl Config {
    /// Loads configuration from `path` (without extension). A missing file
    /// is not an error.
    pub fn load_from(path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("database.url", "sqlite://garage.db")?
            .set_default("database.max_connections", 5)?
            .set_default("http.cors", true)?
            .set_default("logging.level", "info")?
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("GARAGE").separator("__"))
            .build()?;

        settings.try_deserialize()
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, Error> {
        let addr = format!("{}:{}", self.server.host, self.server.port);
        addr.parse().map_err(|_| Error::Address(addr))
    }
}
