//! parley: a single-session TCP command server.
//!
//! Listens on one port and serves one connection at a time with a
//! newline-delimited text protocol:
//! - `connect` acknowledges with `OK`
//! - `whoami` returns the peer's `ip:port`
//! - `close` acknowledges with `OK` and ends the session
//!
//! Inbound messages and outbound responses are echoed to stdout for the
//! operator; diagnostics go to stderr via `tracing`.

use parley::config::Config;
use parley::server::Server;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() {
    // Load configuration
    let config = match Config::load() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    // Initialize logging on stderr, leaving stdout to the operator console
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    info!(
        host = %config.host,
        port = config.port,
        max_read_bytes = config.max_read_bytes,
        read_timeout = ?config.read_timeout,
        "Starting parley server"
    );

    let server = Server::new(config);
    if let Err(err) = server.run() {
        // The operator console already carries the diagnostic line.
        error!(error = %err, "server terminated");
        std::process::exit(1);
    }
}
