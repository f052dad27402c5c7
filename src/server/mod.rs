// Server module entry point
// Binds the listener, accepts connections and shuts down gracefully

mod connection;
mod listener;
pub mod signal;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use crate::config::{AppState, Config};
use crate::logger;

pub use listener::create_listener;

/// How long in-flight connections get to finish after shutdown starts
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);
const DRAIN_POLL: Duration = Duration::from_millis(50);

pub type ServerError = Box<dyn std::error::Error + Send + Sync>;

/// A bound, not yet running, server
///
/// All configuration arrives through `Config`, so tests can bind port `0`
/// and point `static_files.root` at a temporary directory.
pub struct Server {
    listener: TcpListener,
    state: Arc<AppState>,
    active_connections: Arc<AtomicUsize>,
}

impl Server {
    /// Bind the configured address and build the shared state.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn bind(config: Config) -> Result<Self, ServerError> {
        let addr = config.get_socket_addr()?;
        let listener = create_listener(addr)?;
        let state = Arc::new(AppState::new(config)?);

        Ok(Self {
            listener,
            state,
            active_connections: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serve until SIGINT/SIGTERM
    pub async fn run(self) -> std::io::Result<()> {
        self.run_until(signal::shutdown_signal()).await
    }

    /// Serve until `shutdown` resolves, then drain active connections
    pub async fn run_until<F>(self, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()>,
    {
        let addr = self.listener.local_addr()?;
        logger::log_server_start(&addr, &self.state.config);

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                accept_result = self.listener.accept() => {
                    match accept_result {
                        Ok((stream, peer_addr)) => {
                            connection::accept_connection(
                                stream,
                                peer_addr,
                                &self.state,
                                &self.active_connections,
                            );
                        }
                        Err(e) => {
                            logger::log_error(&format!("Failed to accept connection: {e}"));
                        }
                    }
                }

                () = &mut shutdown => break,
            }
        }

        drop(self.listener);
        drain_connections(&self.active_connections).await;
        Ok(())
    }
}

/// Wait for in-flight connections to finish, up to `SHUTDOWN_GRACE`
async fn drain_connections(active: &AtomicUsize) {
    logger::log_shutdown(active.load(Ordering::SeqCst));

    let deadline = tokio::time::Instant::now() + SHUTDOWN_GRACE;
    while active.load(Ordering::SeqCst) > 0 {
        if tokio::time::Instant::now() >= deadline {
            logger::log_warning(&format!(
                "Shutdown grace period elapsed with {} connection(s) still open",
                active.load(Ordering::SeqCst)
            ));
            return;
        }
        tokio::time::sleep(DRAIN_POLL).await;
    }
    logger::log_info("[Shutdown] All connections closed");
}
