//! Camlink server entry point
//!
//! Exposes local cameras to an LLM agent as callable tools over stdio.

use std::env;
use std::sync::Arc;

use camlink_server::config::ServerConfig;
use camlink_server::serve::serve;
use camlink_server::tools::{ToolContext, ToolRegistry};

use camlink_capture::{CameraBackend, NokhwaBackend, StreamRegistry};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn print_help() {
    println!("camlink-server - expose local cameras to an LLM agent as callable tools");
    println!();
    println!("Usage: camlink-server [--help] [--version]");
    println!();
    println!("Requests are line-delimited JSON on stdin, responses on stdout.");
    println!("Configuration via environment:");
    println!("  CAMLINK_MAX_PROBE          device indices probed by list_cameras (default 5)");
    println!("  CAMLINK_POLL_INTERVAL_MS   pacing between stream reads (default 33)");
    println!("  CAMLINK_FAILURE_THRESHOLD  consecutive read failures before auto-stop (default 10)");
    println!("  RUST_LOG                   log filter (default info)");
}

#[tokio::main]
async fn main() {
    for arg in env::args().skip(1) {
        match arg.as_str() {
            "--help" | "-h" => {
                print_help();
                return;
            }
            "--version" | "-V" => {
                println!("camlink-server {}", env!("CARGO_PKG_VERSION"));
                return;
            }
            other => {
                eprintln!("unknown argument: {other}");
                print_help();
                std::process::exit(2);
            }
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let config = ServerConfig::from_env();
    info!(?config, "starting camlink server");

    let backend: Arc<dyn CameraBackend> = Arc::new(NokhwaBackend::new());
    let registry = StreamRegistry::new(backend, config.stream_config());
    let ctx = Arc::new(ToolContext { registry, config });
    let tools = Arc::new(ToolRegistry::with_builtin_tools());

    if let Err(e) = serve(ctx, tools).await {
        error!("server error: {}", e);
        std::process::exit(1);
    }
}
