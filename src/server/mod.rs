// server/mod.rs — loopback review server.
//
// Axum HTTP server on the configured port (127.0.0.1 unless overridden).
// The post-commit hook is its only expected caller; there is no auth.
//
// Endpoints:
//   POST /review-diff
//   GET  /health
//   GET  /events   (SSE)

pub mod routes;
pub mod sse;

use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{info, warn};

use crate::AppContext;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Reported distinctly from a generic bind failure — the usual cause is
    /// a second daemon (or a previous one) still holding the port.
    #[error("port {0} is already in use — is another revd instance running?")]
    PortInUse(u16),
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },
    #[error("invalid bind address {0}")]
    InvalidAddress(String),
}

pub fn build_router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        .route("/review-diff", post(routes::review_diff))
        .route("/health", get(routes::health))
        .route("/events", get(sse::review_events_sse))
        .with_state(ctx)
}

struct RunningServer {
    addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    handle: tokio::task::JoinHandle<()>,
}

/// Owns the listening socket. Starting twice is a warning no-op; stopping
/// is an idempotent close.
pub struct ReviewServer {
    ctx: Arc<AppContext>,
    running: Option<RunningServer>,
}

impl ReviewServer {
    pub fn new(ctx: Arc<AppContext>) -> Self {
        Self { ctx, running: None }
    }

    /// Bind the configured address and start serving in a background task.
    /// Returns the bound address (useful when the configured port is 0).
    pub async fn start(&mut self) -> Result<SocketAddr, ServerError> {
        if let Some(running) = &self.running {
            warn!(addr = %running.addr, "review server is already running");
            return Ok(running.addr);
        }

        let bind = format!("{}:{}", self.ctx.config.bind_address, self.ctx.config.port);
        let addr: SocketAddr = bind
            .parse()
            .map_err(|_| ServerError::InvalidAddress(bind.clone()))?;

        let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::AddrInUse {
                ServerError::PortInUse(self.ctx.config.port)
            } else {
                ServerError::Bind {
                    addr: bind.clone(),
                    source: e,
                }
            }
        })?;
        let addr = listener.local_addr().map_err(|e| ServerError::Bind {
            addr: bind,
            source: e,
        })?;

        let router = build_router(self.ctx.clone());
        let (shutdown, rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            let serve = axum::serve(listener, router).with_graceful_shutdown(async {
                let _ = rx.await;
            });
            if let Err(e) = serve.await {
                tracing::error!("review server exited with error: {e}");
            }
        });

        info!("review server listening on http://{addr}");
        self.running = Some(RunningServer {
            addr,
            shutdown,
            handle,
        });
        Ok(addr)
    }

    /// Close the listener. Safe to call when not running.
    pub async fn stop(&mut self) {
        if let Some(running) = self.running.take() {
            let _ = running.shutdown.send(());
            let _ = running.handle.await;
            info!("review server stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }
}
