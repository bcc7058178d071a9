use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use clubslot::clock::SystemClock;
use clubslot::config::Config;
use clubslot::engine::Engine;
use clubslot::notify::NotifyHub;
use clubslot::registry::Registry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    clubslot::observability::init(config.metrics_port)?;

    let registry = Registry::numbered(config.resource_count, &config.label_prefix)?;
    let engine = Arc::new(
        Engine::new(registry, Arc::new(SystemClock), Arc::new(NotifyHub::new()))
            .with_start_grace(config.start_grace_ms),
    );

    let sweeper = tokio::spawn(clubslot::sweeper::run_sweeper(
        engine.clone(),
        config.sweep_interval,
    ));

    let addr = format!("{}:{}", config.bind, config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("clubslot listening on {addr}");
    info!("  computers: {} ({}1..)", config.resource_count, config.label_prefix);
    info!("  sweep interval: {:?}", config.sweep_interval);
    info!("  start grace: {}s", config.start_grace_ms / 1000);
    info!(
        "  metrics: {}",
        config
            .metrics_port
            .map_or("disabled".to_string(), |p| format!("http://0.0.0.0:{p}/metrics"))
    );

    axum::serve(listener, clubslot::api::router(engine))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    info!("clubslot stopped");
    Ok(())
}

/// Resolves on ctrl-c or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(e) => {
                tracing::warn!("failed to register SIGTERM handler: {e}");
                ctrl_c.await.ok();
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
    }
    info!("shutdown signal received, draining requests");
}
