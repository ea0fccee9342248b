//! echo-server: a single-exchange TCP echo service
//!
//! Each accepted connection gets its own task, which:
//! - reads one chunk of at most `buffer_size` bytes
//! - writes those bytes back
//! - closes the connection
//!
//! Configuration via CLI arguments or TOML file; defaults listen on
//! `0.0.0.0:8080` with a backlog of 10 and a 1024-byte transfer buffer.

use echo_server::config::Config;
use echo_server::listener::Listener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!(
        host = %config.host,
        port = config.port,
        backlog = config.backlog,
        buffer_size = config.buffer_size,
        write_mode = ?config.write_mode,
        "Starting echo-server"
    );

    let mut builder = tokio::runtime::Builder::new_multi_thread();
    if let Some(workers) = config.workers {
        builder.worker_threads(workers);
    }
    let runtime = builder.enable_all().build()?;

    runtime.block_on(async {
        let listener = match Listener::bind(&config) {
            Ok(listener) => listener,
            Err(e) => {
                error!(error = %e, "Failed to start listener");
                return Err(e.into());
            }
        };

        listener.run().await;
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}
