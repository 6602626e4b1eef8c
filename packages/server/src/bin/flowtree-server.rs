//! Flow Tree HTTP Server Binary
//!
//! # Usage
//!
//! ```bash
//! # Start with default settings (127.0.0.1:8000, ~/.flowtree/database/flowtree.db)
//! cargo run --bin flowtree-server
//!
//! # Custom port and database
//! FLOWTREE_PORT=9000 FLOWTREE_DB_PATH=/tmp/flow.db cargo run --bin flowtree-server
//! ```
//!
//! # Environment Variables
//!
//! - `FLOWTREE_DB_PATH`, `FLOWTREE_PORT`, `FLOWTREE_BIND_ADDR`, `CORS_ALLOW_ORIGIN`:
//!   see `ServerConfig`
//! - `RUST_LOG`: Logging level (e.g., "info", "debug", "trace")

use flowtree_server::{start_server, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Flow Tree HTTP Server");

    let config = ServerConfig::from_env()?;
    start_server(config).await
}
