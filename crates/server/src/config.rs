//! Server configuration.
//!
//! Resolved once at startup from: `--port` flag > `PORT` env > `3000`.

use std::net::{IpAddr, SocketAddr};

use clap::Parser;

use crate::error::ConfigError;

pub const DEFAULT_PORT: u16 = 3000;
pub const PORT_ENV: &str = "PORT";

/// chatline relay server.
#[derive(Parser, Debug)]
#[command(name = "chatline", version, about = "Real-time chat relay over WebSocket")]
pub struct Cli {
    /// Address to bind.
    #[arg(long, env = "CHATLINE_HOST", default_value = "0.0.0.0")]
    pub host: IpAddr,

    /// Port to bind. Overrides the PORT environment variable.
    #[arg(long)]
    pub port: Option<u16>,
}

/// Resolved runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
}

impl ServerConfig {
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let env_port = std::env::var(PORT_ENV).ok();
        Self::resolve(cli, env_port.as_deref())
    }

    fn resolve(cli: &Cli, env_port: Option<&str>) -> Result<Self, ConfigError> {
        let port = match cli.port {
            Some(port) => port,
            None => resolve_port(env_port)?,
        };
        Ok(Self {
            bind_addr: SocketAddr::new(cli.host, port),
        })
    }
}

/// Parse the port from the environment value. Unset or empty means the default.
pub fn resolve_port(raw: Option<&str>) -> Result<u16, ConfigError> {
    let Some(value) = raw.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(DEFAULT_PORT);
    };
    value.parse::<u16>().map_err(|source| ConfigError::InvalidPort {
        value: value.to_string(),
        source,
    })
}
