pub mod auth;
pub mod buffer;
pub mod codec;
pub mod config;
pub mod error;
pub mod http;
pub mod identity;
pub mod presence;
pub mod registry;
pub mod router;
pub mod state;
pub mod ws;

pub use config::RelayConfig;
pub use http::rest_router;
pub use state::AppState;

use axum::{response::IntoResponse, routing::get, Router};
use tower_http::trace::TraceLayer;

/// Builds the WS relay's router: the single `/ws` upgrade endpoint plus a
/// health check.
pub fn ws_router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> impl IntoResponse {
    "ok"
}
