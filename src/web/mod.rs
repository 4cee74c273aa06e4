//! HTTP boundary for the avatar service
//!
//! Wires the avatar engine and the resize utility into an axum router and
//! serves it until a cancellation token fires.

use anyhow::{Context, Result};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::info;

use crate::avatar::AvatarEngine;
use crate::config::Config;

pub mod handlers;
pub mod responses;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<AvatarEngine>,
    pub config: Arc<Config>,
    pub started_at: Instant,
}

/// Web server wrapping the configured router
pub struct WebServer {
    app: Router,
    host: String,
    port: u16,
}

impl WebServer {
    pub fn new(config: Config, engine: Arc<AvatarEngine>) -> Self {
        let host = config.web.host.clone();
        let port = config.web.port;
        let state = AppState {
            engine,
            config: Arc::new(config),
            started_at: Instant::now(),
        };

        Self {
            app: Self::create_router(state),
            host,
            port,
        }
    }

    fn create_router(state: AppState) -> Router {
        let upload_limit = state.config.web.max_upload_size_mb.saturating_mul(1024 * 1024);
        let request_timeout = state.config.web.request_timeout;

        let mut router = Router::new()
            .route("/avatar", get(handlers::avatar::avatar_from_query))
            .route("/avatar/{text}", get(handlers::avatar::avatar_from_path))
            .route(
                "/resize",
                post(handlers::resize::resize).layer(DefaultBodyLimit::max(upload_limit)),
            )
            .route("/health", get(handlers::health::health_check))
            .route("/cache/flush", post(handlers::health::flush_cache))
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http());

        if !request_timeout.is_zero() {
            router = router.layer(TimeoutLayer::new(request_timeout));
        }

        router.with_state(state)
    }

    /// Router without a bound listener
    pub fn router(&self) -> Router {
        self.app.clone()
    }

    /// Bind and serve until `cancel` fires; in-flight requests are drained
    pub async fn serve_with_cancellation(self, cancel: CancellationToken) -> Result<()> {
        let listener = TcpListener::bind((self.host.as_str(), self.port))
            .await
            .with_context(|| format!("Failed to bind to {}:{}", self.host, self.port))?;
        info!("Web server listening on http://{}", listener.local_addr()?);

        axum::serve(listener, self.app)
            .with_graceful_shutdown(async move {
                cancel.cancelled().await;
                info!("Web server received cancellation signal, shutting down gracefully");
            })
            .await
            .context("Web server terminated with an error")?;

        Ok(())
    }
}

/// Resolves on SIGINT, or SIGTERM on unix
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT, initiating graceful shutdown"),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown"),
    }
}
