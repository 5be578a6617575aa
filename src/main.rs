use std::sync::Arc;

use courier_dispatch::api::rest::router;
use courier_dispatch::config::Config;
use courier_dispatch::engine::notify::run_notification_dispatcher;
use courier_dispatch::error::AppError;
use courier_dispatch::payments::simulator::spawn_payment_simulator;
use courier_dispatch::state::AppState;
use courier_dispatch::store::DocumentStore;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .with_target(false)
        .compact()
        .init();

    let (app_state, notification_rx) = AppState::new(
        config.dispatch_settings(),
        config.notification_queue_size,
        config.event_buffer_size,
    );
    let shared_state = Arc::new(app_state);

    tokio::spawn(run_notification_dispatcher(notification_rx));

    if config.payment_simulator {
        let store = Arc::clone(&shared_state.store) as Arc<dyn DocumentStore>;
        spawn_payment_simulator(store).await?;
        tracing::warn!("payment simulator enabled, checkout sessions are answered in-process");
    }

    let app = router(shared_state.clone());

    let bind_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|err| AppError::Internal(format!("failed to bind {bind_addr}: {err}")))?;

    tracing::info!(http_port = config.http_port, "http server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::Internal(format!("server error: {err}")))?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
