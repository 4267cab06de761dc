//! SiltKV Server Binary
//!
//! Starts the TCP server for SiltKV.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use siltkv::network::Server;
use siltkv::{Config, Engine};
use tracing_subscriber::{fmt, EnvFilter};

/// SiltKV Server
#[derive(Parser, Debug)]
#[command(name = "siltkv-server")]
#[command(about = "Log-structured key-value store server")]
#[command(version)]
struct Args {
    /// Data directory (manifest and segment files)
    #[arg(short, long, env = "SILTKV_DATA_DIR", default_value = "./siltkv_data")]
    data_dir: PathBuf,

    /// Listen address (host:port)
    #[arg(short, long, env = "SILTKV_LISTEN", default_value = "127.0.0.1:7878")]
    listen: String,

    /// Writes accepted before the memtable is flushed to a segment
    #[arg(short = 't', long, env = "SILTKV_FLUSH_THRESHOLD", default_value_t = 100)]
    flush_threshold: usize,

    /// Connections served at once before new ones are refused
    #[arg(short, long, env = "SILTKV_MAX_CONNECTIONS", default_value_t = 1024)]
    max_connections: usize,

    /// Per-connection read timeout in milliseconds (0 = none)
    #[arg(long, env = "SILTKV_READ_TIMEOUT_MS", default_value_t = 5000)]
    read_timeout_ms: u64,

    /// Per-connection write timeout in milliseconds (0 = none)
    #[arg(long, env = "SILTKV_WRITE_TIMEOUT_MS", default_value_t = 5000)]
    write_timeout_ms: u64,
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,siltkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("SiltKV Server v{}", siltkv::VERSION);

    let config = Config::builder()
        .data_dir(&args.data_dir)
        .listen_addr(&args.listen)
        .flush_threshold(args.flush_threshold)
        .max_connections(args.max_connections)
        .read_timeout_ms(args.read_timeout_ms)
        .write_timeout_ms(args.write_timeout_ms)
        .build();

    let engine = match Engine::open(config.clone()) {
        Ok(e) => Arc::new(e),
        Err(e) => {
            tracing::error!("Failed to open engine: {}", e);
            std::process::exit(1);
        }
    };

    let server = match Server::bind(config, engine) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", args.listen, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}
