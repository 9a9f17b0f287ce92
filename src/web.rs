#![cfg(not(tarpaulin_include))]

use storage_app::app;
use storage_app::config::Config;

/// Main entry point for the web client
///
/// Initializes logging, reads the runtime configuration from the
/// environment and runs the web server until it is stopped.
///
/// # Environment
/// * `STORAGE_APP_BIND` - listen address (default `127.0.0.1:3000`)
/// * `STORAGE_API_URL` - remote inventory API base URL
///   (default `http://127.0.0.1:8000`)
/// * `RUST_LOG` - log filter, e.g. `info` or `storage_app=debug`
///
/// # Returns
/// * `Result<(), Box<dyn std::error::Error>>` - Success or error object
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = Config::from_env();
    app::run(config).await
}
