//! diskwire Daemon Binary
//!
//! Starts the storage daemon.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use diskwire::network::Server;
use diskwire::storage::{format_size, Store};
use diskwire::Config;
use tracing_subscriber::{fmt, EnvFilter};

/// diskwire storage daemon
#[derive(Parser, Debug)]
#[command(name = "diskwire-daemon")]
#[command(about = "Storage daemon for the diskwire file transfer protocol")]
#[command(version)]
struct Args {
    /// Storage directory
    #[arg(short, long, default_value = "./data")]
    storage_dir: PathBuf,

    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:65431")]
    listen: String,

    /// Worker threads
    #[arg(short, long, default_value = "4")]
    workers: usize,

    /// Largest accepted upload in MB
    #[arg(short = 'm', long, default_value = "4096")]
    max_payload_mb: u64,

    /// Per-call read/write deadline in milliseconds (0 = none)
    #[arg(long, default_value = "30000")]
    io_timeout_ms: u64,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,diskwire=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("diskwire daemon v{}", diskwire::VERSION);
    tracing::info!("Storage directory: {}", args.storage_dir.display());

    let config = Config::builder()
        .storage_dir(&args.storage_dir)
        .daemon_addr(&args.listen)
        .workers(args.workers)
        .max_payload_size(args.max_payload_mb.saturating_mul(1024 * 1024))
        .io_timeout_ms(args.io_timeout_ms)
        .build();

    // Open store
    let store = match Store::open(&config.storage_dir) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            tracing::error!("Failed to open storage directory: {}", e);
            std::process::exit(1);
        }
    };

    match store.list() {
        Ok(files) => {
            let total: u64 = files.iter().map(|f| f.size).sum();
            tracing::info!("Serving {} files ({})", files.len(), format_size(total));
        }
        Err(e) => tracing::warn!("Could not list storage directory: {}", e),
    }

    let server = match Server::bind(config, store) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to bind: {}", e);
            std::process::exit(1);
        }
    };

    // Set up Ctrl+C handler
    match server.shutdown_handle() {
        Ok(handle) => {
            let installed = ctrlc::set_handler(move || {
                tracing::info!("Received Ctrl+C, initiating shutdown...");
                handle.shutdown();
            });
            if let Err(e) = installed {
                tracing::warn!("Could not install Ctrl+C handler: {}", e);
            }
        }
        Err(e) => tracing::warn!("Could not create shutdown handle: {}", e),
    }

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Daemon stopped");
}
