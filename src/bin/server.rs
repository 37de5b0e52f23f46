//! KVLDS Server Binary
//!
//! Serves the KVLDS protocol over TCP from an in-memory store.

use std::sync::Arc;

use clap::Parser;
use kvlds::network::Server;
use kvlds::store::MemStore;
use kvlds::Config;
use tracing_subscriber::{fmt, EnvFilter};

/// KVLDS Server
#[derive(Parser, Debug)]
#[command(name = "kvlds-server")]
#[command(about = "In-memory key-value server speaking the KVLDS protocol")]
#[command(version)]
struct Args {
    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:9741")]
    listen: String,

    /// Maximum concurrent connections
    #[arg(short, long, default_value = "1024")]
    max_connections: usize,

    /// Requests that may be in flight across all connections
    #[arg(short = 'r', long, default_value = "4096")]
    request_pool: usize,

    /// Largest accepted packet payload in KB
    #[arg(short = 'p', long, default_value = "1024")]
    max_packet_kb: usize,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,kvlds=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("KVLDS Server v{}", kvlds::VERSION);
    tracing::info!("Listen address: {}", args.listen);

    // Build config from args
    let config = Config::builder()
        .listen_addr(&args.listen)
        .max_connections(args.max_connections)
        .request_pool_capacity(args.request_pool)
        .max_packet_size(args.max_packet_kb * 1024)
        .build();

    if let Err(e) = config.validate() {
        tracing::error!("Invalid configuration: {}", e);
        std::process::exit(1);
    }

    let store = Arc::new(MemStore::with_config(&config));

    let mut server = match Server::new(config, store) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Could not start server: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}
