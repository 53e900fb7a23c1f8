//! `WaitroomServer` builder and server loop.
//!
//! This is the entry point for running a waiting room. It ties together
//! all the layers: transport → protocol → admission, plus the HTTP API and
//! the expiry sweeper.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::watch;
use waitroom_admission::{AdmissionConfig, Coordinator, ExpirySweeper, NotificationHub};
use waitroom_http::{AppState, build_router};
use waitroom_protocol::JsonCodec;
use waitroom_tick::TickConfig;
use waitroom_transport::{Transport, WebSocketTransport};

use crate::handler::handle_connection;
use crate::{WaitroomConfig, WaitroomError};

/// How long shutdown waits for background tasks to wind down.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Shared server state passed to each connection handler task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks.
pub(crate) struct ServerState {
    pub(crate) coordinator: Arc<Coordinator>,
    pub(crate) codec: JsonCodec,
    pub(crate) heartbeat_interval: Duration,
}

/// Builder for configuring and starting a Waitroom server.
///
/// # Example
///
/// ```rust,ignore
/// let server = WaitroomServer::builder()
///     .bind_http("0.0.0.0:3000")
///     .bind_ws("0.0.0.0:3001")
///     .build()
///     .await?;
/// server.run().await
/// ```
pub struct WaitroomServerBuilder {
    http_addr: String,
    ws_addr: String,
    admission: AdmissionConfig,
    heartbeat_interval: Duration,
}

impl WaitroomServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        let defaults = WaitroomConfig::default();
        Self {
            http_addr: "127.0.0.1:3000".to_string(),
            ws_addr: "127.0.0.1:3001".to_string(),
            admission: AdmissionConfig::default(),
            heartbeat_interval: defaults.heartbeat(),
        }
    }

    /// Takes addresses, admission settings, and heartbeat from `config`.
    pub fn config(self, config: &WaitroomConfig) -> Self {
        self.bind_http(&config.http_addr())
            .bind_ws(&config.ws_addr())
            .admission(config.admission())
            .heartbeat_interval(config.heartbeat())
    }

    /// Sets the address for the HTTP API.
    pub fn bind_http(mut self, addr: &str) -> Self {
        self.http_addr = addr.to_string();
        self
    }

    /// Sets the address for the WebSocket live channel.
    pub fn bind_ws(mut self, addr: &str) -> Self {
        self.ws_addr = addr.to_string();
        self
    }

    /// Sets capacity, TTL, sweep, and lock settings.
    pub fn admission(mut self, config: AdmissionConfig) -> Self {
        self.admission = config;
        self
    }

    /// Sets how often idle WebSockets are pinged.
    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Binds both listeners and wires up the admission layer.
    pub async fn build(self) -> Result<WaitroomServer, WaitroomError> {
        let transport = WebSocketTransport::bind(&self.ws_addr).await?;
        let listener = TcpListener::bind(&self.http_addr).await?;

        let admission = self.admission.validated();
        let hub = Arc::new(NotificationHub::new());
        let coordinator = Arc::new(Coordinator::new(&admission, hub));

        let state = Arc::new(ServerState {
            coordinator,
            codec: JsonCodec,
            heartbeat_interval: self.heartbeat_interval,
        });

        Ok(WaitroomServer {
            transport,
            listener,
            state,
            sweep: admission.sweep_schedule(),
            sweep_batch_limit: admission.sweep_batch_limit,
        })
    }
}

impl Default for WaitroomServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Waitroom server.
///
/// Call [`run()`](Self::run) to start serving.
pub struct WaitroomServer {
    transport: WebSocketTransport,
    listener: TcpListener,
    state: Arc<ServerState>,
    sweep: TickConfig,
    sweep_batch_limit: usize,
}

impl WaitroomServer {
    /// Creates a new builder.
    pub fn builder() -> WaitroomServerBuilder {
        WaitroomServerBuilder::new()
    }

    /// Returns the address the WebSocket listener is bound to.
    pub fn ws_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Returns the address the HTTP listener is bound to.
    pub fn http_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    /// The coordinator behind both listeners.
    pub fn coordinator(&self) -> Arc<Coordinator> {
        Arc::clone(&self.state.coordinator)
    }

    /// Serves until Ctrl-C or SIGTERM.
    pub async fn run(self) -> Result<(), WaitroomError> {
        self.run_until(shutdown_signal()).await
    }

    /// Serves until `shutdown` completes.
    ///
    /// Starts the expiry sweeper and the WebSocket accept loop, then serves
    /// HTTP in the foreground. When `shutdown` fires, the HTTP server
    /// drains, and the sweeper and accept loop are told to stop.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), WaitroomError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let sweeper = Arc::new(ExpirySweeper::new(
            self.coordinator(),
            self.sweep_batch_limit,
        ));
        let sweeper_handle = tokio::spawn(sweeper.run(self.sweep, shutdown_rx.clone()));

        let accept_handle = tokio::spawn(accept_loop(
            self.transport,
            Arc::clone(&self.state),
            shutdown_rx,
        ));

        let app = build_router(AppState::new(Arc::clone(&self.state.coordinator)));
        tracing::info!(addr = ?self.listener.local_addr().ok(), "Waitroom HTTP API running");

        let served = axum::serve(self.listener, app)
            .with_graceful_shutdown(async move {
                shutdown.await;
                tracing::info!("shutdown signal received");
                let _ = shutdown_tx.send(true);
            })
            .await;

        let _ = tokio::time::timeout(SHUTDOWN_GRACE, sweeper_handle).await;
        let _ = tokio::time::timeout(SHUTDOWN_GRACE, accept_handle).await;
        tracing::info!("Waitroom shut down");

        served.map_err(WaitroomError::Http)
    }
}

/// Accepts WebSocket connections and spawns a handler task for each.
async fn accept_loop(
    mut transport: WebSocketTransport,
    state: Arc<ServerState>,
    mut shutdown: watch::Receiver<bool>,
) {
    tracing::info!(addr = ?transport.local_addr().ok(), "Waitroom live channel running");

    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            accepted = transport.accept() => match accepted {
                Ok(conn) => {
                    let state = Arc::clone(&state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            },
        }
    }
}

/// Completes on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
