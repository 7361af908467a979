use fleetx_dashboard::{
    load_snapshot, router, spawn_reloader, AppState, CancelToken, Config, FleetClient, MemoryStore,
};
use std::{net::SocketAddr, sync::Arc};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let config = Config::from_env();
    let store = MemoryStore::new(load_snapshot(&config.data_path).await);
    info!("serving fleet data from {}", config.data_path.display());

    let shutdown = CancelToken::new();
    if let Some(interval) = config.reload_interval {
        spawn_reloader(
            store.clone(),
            config.data_path.clone(),
            interval,
            shutdown.clone(),
        );
    }

    let state = AppState::new(FleetClient::new(Arc::new(store)), config.view_timeout);
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    Ok(())
}

async fn shutdown_signal(shutdown: CancelToken) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {err}");
        shutdown.cancelled().await;
    }
    info!("shutting down");
    shutdown.cancel();
}
