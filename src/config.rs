//! Server configuration.
//!
//! Parsed from command-line flags with environment variable fallbacks.

use crate::connection::DEFAULT_MAX_BUFFER_SIZE;
use crate::{DEFAULT_HOST, DEFAULT_PORT};
use clap::Parser;

/// tickstore - in-memory time-series metrics over a line protocol.
#[derive(Debug, Clone, PartialEq, Eq, Parser)]
#[command(name = "tickstore", version, about)]
pub struct ServerConfig {
    /// Host to bind to.
    #[arg(short = 'H', long, env = "TICKSTORE_HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, env = "TICKSTORE_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Largest incomplete message a client may buffer before it is disconnected.
    #[arg(
        long,
        env = "TICKSTORE_MAX_BUFFER_SIZE",
        default_value_t = DEFAULT_MAX_BUFFER_SIZE,
        value_parser = parse_buffer_size
    )]
    pub max_buffer_size: usize,

    /// Log filter directive (e.g. "info", "tickstore=debug").
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            max_buffer_size: DEFAULT_MAX_BUFFER_SIZE,
            log_level: "info".to_string(),
        }
    }
}

impl ServerConfig {
    /// Returns the bind address as a string
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_buffer_size(s: &str) -> Result<usize, String> {
    let size: usize = s.parse().map_err(|e| format!("{}", e))?;
    if size == 0 {
        return Err("buffer size must be greater than zero".to_string());
    }
    Ok(size)
}
