//! `waitroom-server`: runs the waiting room with configuration from
//! `waitroom.toml` and the environment.

use waitroom::{WaitroomConfig, WaitroomServer, logging};

#[tokio::main]
async fn main() {
    let config = match WaitroomConfig::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    logging::init(&config);
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        capacity = config.capacity,
        session_ttl = config.session_ttl,
        sweep_interval = config.sweep_interval,
        "starting Waitroom"
    );

    let server = match WaitroomServer::builder().config(&config).build().await {
        Ok(server) => server,
        Err(e) => {
            tracing::error!(error = %e, "failed to start");
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run().await {
        tracing::error!(error = %e, "server error");
        std::process::exit(1);
    }
}
