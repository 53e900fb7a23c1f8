//! Tracing subscriber setup for the binary.

use tracing_subscriber::{EnvFilter, fmt};

use crate::WaitroomConfig;

/// Installs the global subscriber.
///
/// `RUST_LOG` wins over the configured level. `log_format = "json"` gives
/// one JSON object per line; anything else is human-readable.
pub fn init(config: &WaitroomConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    match config.log_format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}
