use relay::{rest_router, ws_router, AppState};
use std::env;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_owned());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(log_level))
        .init();

    let config = relay::config::load_from_env();
    info!(
        ws_addr = %config.ws_bind_addr,
        rest_addr = %config.rest_bind_addr,
        stored_for = config.stored_for.len(),
        "starting relay",
    );

    let state = AppState::new(config);
    let ws_listener = tokio::net::TcpListener::bind(&state.config.ws_bind_addr)
        .await
        .expect("failed to bind WS listener");
    let rest_listener = tokio::net::TcpListener::bind(&state.config.rest_bind_addr)
        .await
        .expect("failed to bind REST listener");

    info!(addr = %ws_listener.local_addr().unwrap(), "WS relay listening");
    info!(addr = %rest_listener.local_addr().unwrap(), "REST relay listening");

    let ws_server = axum::serve(ws_listener, ws_router(state.clone()))
        .with_graceful_shutdown(shutdown_signal());
    let rest_server =
        axum::serve(rest_listener, rest_router(state)).with_graceful_shutdown(shutdown_signal());

    let (ws_result, rest_result) = tokio::join!(ws_server, rest_server);
    ws_result.expect("WS server error");
    rest_result.expect("REST server error");
    info!("relay shut down gracefully");
}

/// Waits for SIGTERM or Ctrl-C (SIGINT) and returns to trigger graceful
/// shutdown. Closes WS sockets, stops the REST listener, and drops the
/// coordinator state without attempting to flush buffers to disk --
/// buffers are in-memory only by design.
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => { info!("received Ctrl+C, shutting down"); },
        _ = terminate => { info!("received SIGTERM, shutting down"); },
    }
}
