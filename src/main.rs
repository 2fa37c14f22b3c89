//! winshot: window screenshot capture and delivery server

use std::{
    net::{Ipv4Addr, SocketAddr},
    sync::Arc,
};

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};
use winshot::{
    capture::{self, CaptureEngine},
    config::Config,
    server::{Dispatcher, FileServer, dispatch::DispatchState},
    store::ImageStore,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Respects RUST_LOG; default level: info
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("winshot=info")),
        )
        .with_target(false)
        .init();

    let config = Config::from_env();
    info!("winshot starting");
    info!(
        "Limits: max dimension {}px, max size {} bytes, expiry {:?}",
        config.max_image_dimension, config.max_file_size_bytes, config.file_expiry
    );

    let backend = capture::platform_backend();
    info!("Capture backend: {}", backend.platform());

    let engine = Arc::new(CaptureEngine::new(backend, config.attempt_timeout));
    let store = ImageStore::open(config.tmp_dir.clone()).await?;
    info!("Image store at {:?}", store.dir());

    let file_addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, config.file_server_port));
    let file_server = FileServer::bind(file_addr, store.clone(), config.sweep_interval).await?;
    tokio::spawn(async move {
        if let Err(e) = file_server.run().await {
            tracing::error!("File server exited: {}", e);
        }
    });

    let state = Arc::new(DispatchState {
        engine,
        store: store.clone(),
        config: config.clone(),
    });
    let ws_addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, config.protocol_port));
    let dispatcher = Dispatcher::bind(ws_addr, state).await?;

    let result = tokio::select! {
        r = dispatcher.run() => r.map_err(Into::into),
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
            Ok(())
        }
    };

    store.cleanup_all().await;
    info!("winshot shut down");
    result
}

async fn shutdown_signal() {
    // A failed signal hook would mean we never shut down cleanly; surface it.
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install ctrl-c handler: {}", e);
        // Without a signal hook there is nothing to wait for.
        std::future::pending::<()>().await;
    }
}
