//! EmberKV Server Binary
//!
//! Serves one record file over TCP.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use emberkv::network::Server;
use emberkv::{Config, Engine};
use tracing_subscriber::{fmt, EnvFilter};

/// EmberKV Server
#[derive(Parser, Debug)]
#[command(name = "emberkv-server")]
#[command(about = "Embedded key-value store served over TCP")]
#[command(version)]
struct Args {
    /// Record file
    #[arg(short, long, default_value = "./emberkv.db")]
    db: String,

    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:7878")]
    listen: String,

    /// Connection worker threads
    #[arg(short, long, default_value = "16")]
    max_connections: usize,

    /// Maximum cached entries
    #[arg(short = 'c', long, default_value = "1000")]
    cache_size: usize,

    /// Idle seconds before a cached entry expires
    #[arg(short = 't', long, default_value = "60")]
    cache_ttl_secs: u64,

    /// Seconds between sweeps of expired cache entries (0 disables)
    #[arg(long, default_value = "0")]
    cache_sweep_secs: u64,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,emberkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("EmberKV Server v{}", emberkv::VERSION);
    tracing::info!("Record file: {}", args.db);
    tracing::info!("Listen address: {}", args.listen);

    // Build config from args
    let mut builder = Config::builder()
        .db_path(&args.db)
        .listen_addr(&args.listen)
        .max_connections(args.max_connections)
        .cache_capacity(args.cache_size)
        .cache_buckets(args.cache_size)
        .cache_ttl(Duration::from_secs(args.cache_ttl_secs));
    if args.cache_sweep_secs > 0 {
        builder = builder.cache_sweep_interval(Duration::from_secs(args.cache_sweep_secs));
    }
    let config = builder.build();

    // Open engine
    let engine = match Engine::open(config.clone()) {
        Ok(e) => Arc::new(e),
        Err(e) => {
            tracing::error!("Failed to open engine: {}", e);
            std::process::exit(1);
        }
    };

    // A server has nobody to ask, so the record file is created silently
    if let Err(e) = engine.create_store() {
        tracing::error!("Failed to create record file: {}", e);
        std::process::exit(1);
    }

    let server = match Server::bind(config, Arc::clone(&engine)) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = engine.close() {
        tracing::warn!("Engine close: {}", e);
    }
    tracing::info!("Server stopped");
}
