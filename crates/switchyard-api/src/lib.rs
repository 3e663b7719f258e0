pub mod handlers;

use std::any::Any;
use std::future::Future;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};

use switchyard_core::config::{normalize_base_path, NetworkConfig};

pub use handlers::ApiState;

/// Build the gateway router, mounted under `base_path` ("" = root).
pub fn router(state: ApiState, base_path: &str) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_methods(AnyOrigin)
        .allow_headers(AnyOrigin);

    let api_routes = Router::new()
        .route("/supported", get(handlers::handle_supported))
        .route("/verify", post(handlers::handle_verify))
        .route("/settle", post(handlers::handle_settle))
        .route("/register", post(handlers::handle_register))
        .route("/peers", get(handlers::handle_peers))
        .route("/health", get(handlers::handle_health))
        .with_state(state);

    let base = normalize_base_path(base_path);
    let app = if base.is_empty() {
        api_routes
    } else {
        Router::new().nest(&base, api_routes)
    };

    app.layer(CatchPanicLayer::custom(handle_panic)).layer(cors)
}

/// Bind `network.listen_addr:network.port` and serve until `shutdown` resolves.
pub async fn serve<F>(state: ApiState, network: &NetworkConfig, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind((network.listen_addr.as_str(), network.port)).await?;
    serve_with_listener(listener, state, &network.base_path, shutdown).await
}

pub async fn serve_with_listener<F>(
    listener: TcpListener,
    state: ApiState,
    base_path: &str,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = router(state, base_path);
    let addr = listener.local_addr()?;
    tracing::info!(%addr, base_path = %normalize_base_path(base_path), "gateway listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

/// A panicking handler still answers with the documented 500 shape.
fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    tracing::error!(%message, "request handler panicked");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"error": "Internal error", "message": message})),
    )
        .into_response()
}
