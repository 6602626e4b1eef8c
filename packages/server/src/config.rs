//! Runtime server configuration
//!
//! ServerConfig is built once at startup from environment variables and is
//! immutable for the lifetime of the process.
//!
//! # Environment Variables
//!
//! - `FLOWTREE_DB_PATH`: database file (default `~/.flowtree/database/flowtree.db`)
//! - `FLOWTREE_PORT`: listen port (default 8000)
//! - `FLOWTREE_BIND_ADDR`: listen address (default `127.0.0.1`)
//! - `CORS_ALLOW_ORIGIN`: the single browser origin allowed to call the API
//!   with credentials (default `http://localhost:3000`)

use anyhow::{anyhow, Context};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_CORS_ORIGIN: &str = "http://localhost:3000";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Resolved path to the database file
    pub db_path: PathBuf,

    pub bind_addr: IpAddr,

    pub port: u16,

    /// Origin allowed by the CORS layer
    pub cors_origin: String,
}

impl ServerConfig {
    /// Build the configuration from the process environment
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup
    ///
    /// Unset and empty variables fall back to their defaults; set but
    /// unparseable values are an error.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let db_path = match get("FLOWTREE_DB_PATH") {
            Some(path) => PathBuf::from(path),
            None => default_db_path()?,
        };

        let port = match get("FLOWTREE_PORT") {
            Some(port) => port
                .trim()
                .parse::<u16>()
                .with_context(|| format!("Invalid FLOWTREE_PORT '{}'", port))?,
            None => DEFAULT_PORT,
        };

        let bind_addr = match get("FLOWTREE_BIND_ADDR") {
            Some(addr) => addr
                .trim()
                .parse::<IpAddr>()
                .with_context(|| format!("Invalid FLOWTREE_BIND_ADDR '{}'", addr))?,
            None => IpAddr::V4(Ipv4Addr::LOCALHOST),
        };

        let cors_origin = get("CORS_ALLOW_ORIGIN").unwrap_or_else(|| DEFAULT_CORS_ORIGIN.to_string());

        Ok(Self {
            db_path,
            bind_addr,
            port,
            cors_origin,
        })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }
}

/// Default: ~/.flowtree/database/flowtree.db
fn default_db_path() -> anyhow::Result<PathBuf> {
    let home_dir = dirs::home_dir().ok_or_else(|| anyhow!("Failed to get home directory"))?;

    Ok(home_dir
        .join(".flowtree")
        .join("database")
        .join("flowtree.db"))
}
