//! Binding and running the exposition server.
//!
//! A server goes from stopped to running exactly once, in [`start`]. A failed
//! bind is returned to the caller and never retried.

use std::net::SocketAddr;
use std::time::Duration;

use hyper::server::conn::http1;
use hyper_util::rt::{TokioIo, TokioTimer};
use hyper_util::server::graceful::GracefulShutdown;
use hyper_util::service::TowerToHyperService;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{ExporterError, Result};
use crate::routes;
use crate::state::AppState;

/// Pause after a failed accept, so a full file table does not spin the loop.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Handle to a server that is accepting connections.
///
/// Dropping the handle leaves the server running for the rest of the process.
pub struct RunningServer {
    local_addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<std::io::Result<()>>,
}

impl RunningServer {
    /// Address actually bound; differs from the configured one for port 0.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stops accepting connections, lets in-flight requests finish and waits
    /// for the server task.
    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        self.wait().await
    }

    /// Waits for the server task to end without requesting a shutdown.
    pub async fn wait(self) -> Result<()> {
        match self.task.await {
            Ok(result) => result.map_err(ExporterError::Serve),
            Err(join_error) => Err(ExporterError::Serve(std::io::Error::other(join_error))),
        }
    }
}

/// Binds `addr` and serves the exposition routes on a background task.
///
/// A connection that has not sent a complete request head within
/// `read_timeout` is closed. Must be called from within a Tokio runtime.
pub async fn start(
    addr: SocketAddr,
    read_timeout: Option<Duration>,
    registry: prometheus::Registry,
) -> Result<RunningServer> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ExporterError::Bind { addr, source })?;
    let local_addr = listener
        .local_addr()
        .map_err(|source| ExporterError::Bind { addr, source })?;

    let app = routes::create_router(AppState::new(registry));
    let (tx, rx) = oneshot::channel::<()>();

    let task = tokio::spawn(async move {
        let mut builder = http1::Builder::new();
        builder.timer(TokioTimer::new()).header_read_timeout(read_timeout);
        let graceful = GracefulShutdown::new();

        let stop = async {
            // A dropped handle detaches the server instead of stopping it.
            if rx.await.is_err() {
                std::future::pending::<()>().await;
            }
        };
        tokio::pin!(stop);

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(accepted) => accepted,
                        Err(e) => {
                            warn!(%local_addr, error = %e, "Failed to accept connection");
                            tokio::time::sleep(ACCEPT_BACKOFF).await;
                            continue;
                        }
                    };
                    let service = TowerToHyperService::new(app.clone());
                    let connection = graceful.watch(builder.serve_connection(TokioIo::new(stream), service));
                    tokio::spawn(async move {
                        if let Err(e) = connection.await {
                            debug!(%peer, error = %e, "Connection closed with an error");
                        }
                    });
                }
                _ = &mut stop => break,
            }
        }

        drop(listener);
        graceful.shutdown().await;
        info!(%local_addr, "Metrics server stopped");
        Ok::<(), std::io::Error>(())
    });

    info!(%local_addr, "Serving metrics");

    Ok(RunningServer {
        local_addr,
        shutdown: Some(tx),
        task,
    })
}
