pub mod disconnect;
pub mod messages;
pub mod peers;
pub mod register;
pub mod rest_auth;
pub mod response;
pub mod send;

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Builds the REST session layer's router, wrapped in a `TraceLayer` for
/// per-request structured logs.
pub fn rest_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/register", post(register::register))
        .route("/v1/send", post(send::send))
        .route("/v1/peers", get(peers::peers))
        .route("/v1/messages", get(messages::messages))
        .route("/v1/disconnect", delete(disconnect::disconnect))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
