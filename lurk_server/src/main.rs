// CLI entry point for the LURK server.
//
// Seeds the world from config, listens, and serves until killed. See
// `server.rs` for the threading model and `session.rs` for the protocol
// state machine.
//
// Usage:
//   lurk-server [OPTIONS]
//     --host <HOST>      Bind address (default: 127.0.0.1)
//     --port <PORT>      Listen port (default: 5050)
//     --config <FILE>    Game config JSON (default: built-in test world)
//
// Log verbosity follows `RUST_LOG` (default: info).

use std::path::PathBuf;

use lurk_server::config::{GameConfig, ServerConfig};
use lurk_server::start_server;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let (mut config, game_path) = parse_args();
    if let Some(path) = game_path {
        config.game = match GameConfig::load(&path) {
            Ok(game) => game,
            Err(e) => {
                eprintln!("Failed to load {}: {e}", path.display());
                std::process::exit(1);
            }
        };
    }

    let (handle, addr) = match start_server(config) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Failed to start server: {e}");
            std::process::exit(1);
        }
    };

    println!("LURK server listening on {addr}");
    println!("Press Ctrl+C to stop.");

    // The process exits on SIGINT/SIGTERM; session threads go with it.
    handle.wait();
}

/// Parse command-line arguments into a `ServerConfig` plus an optional game
/// config path. Uses simple `std::env::args()` matching.
fn parse_args() -> (ServerConfig, Option<PathBuf>) {
    let mut config = ServerConfig::default();
    let mut game_path = None;
    let args: Vec<String> = std::env::args().collect();
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "--host" => {
                i += 1;
                config.host = args.get(i).cloned().unwrap_or_else(|| {
                    eprintln!("--host requires a value");
                    std::process::exit(1);
                });
            }
            "--port" => {
                i += 1;
                config.port = args.get(i).and_then(|s| s.parse().ok()).unwrap_or_else(|| {
                    eprintln!("--port requires a valid port number");
                    std::process::exit(1);
                });
            }
            "--config" => {
                i += 1;
                game_path = args.get(i).map(PathBuf::from).or_else(|| {
                    eprintln!("--config requires a file path");
                    std::process::exit(1);
                });
            }
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {other}");
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    (config, game_path)
}

fn print_usage() {
    println!("Usage: lurk-server [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --host <HOST>      Bind address (default: 127.0.0.1)");
    println!("  --port <PORT>      Listen port (default: 5050)");
    println!("  --config <FILE>    Game config JSON (default: built-in test world)");
    println!("  --help, -h         Show this help");
}
