use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use super::{analyze_handler, chat_handler, health_handler, progress_handler, SharedState};
use crate::error::{AppError, AppResult};

/// Build the HTTP router.
pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/analyze", post(analyze_handler))
        .route("/api/chat", post(chat_handler))
        .route("/api/progress", post(progress_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind the configured address and serve until the process stops.
pub async fn serve(state: SharedState) -> AppResult<()> {
    let addr = state.config.server.bind_addr.clone();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::Config {
            message: format!("Failed to bind {}: {}", addr, e),
        })?;
    serve_on(listener, state).await
}

/// Serve on an already bound listener.
pub async fn serve_on(listener: TcpListener, state: SharedState) -> AppResult<()> {
    let local_addr = listener.local_addr().ok();
    info!(addr = ?local_addr, "HTTP server listening");

    axum::serve(listener, router(state))
        .await
        .map_err(|e| AppError::Internal {
            message: format!("Server error: {}", e),
        })
}
