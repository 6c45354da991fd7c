use std::future::Future;

use axum::{routing::any, Router};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::app_state::AppState;
use crate::error::Result;
use crate::ws::ws_handler;

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/:room_id", any(ws_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind the configured address and serve until `shutdown` resolves.
pub async fn serve<F>(state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(state.config.addr()).await?;
    serve_on(listener, state, shutdown).await
}

/// Serve on an already bound listener.
pub async fn serve_on<F>(listener: TcpListener, state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    info!(%addr, instance = %state.router.instance(), "signaling relay listening");

    let bridge_listener = state.router.spawn_bridge_listener();

    let result = axum::serve(listener, app(state).into_make_service())
        .with_graceful_shutdown(shutdown)
        .await;

    if let Some(handle) = bridge_listener {
        handle.abort();
    }
    info!("signaling relay stopped");
    Ok(result?)
}

pub async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown requested");
    }
}
