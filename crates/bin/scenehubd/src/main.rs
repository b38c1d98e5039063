//! # scenehubd: scenehub daemon
//!
//! Composition root that wires the scene engine to its adapters and starts
//! the server.
//!
//! ## Responsibilities
//! - Parse configuration (env vars, config file)
//! - Install the `tracing` subscriber
//! - Build the virtual backend and fill it from the seed file
//! - Spawn the scene engine and the tasks feeding it notifications
//! - Build the axum router, bind to a TCP port and serve
//! - Handle graceful shutdown (SIGTERM/SIGINT), stopping the engine last
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer; no domain logic belongs here.

mod config;

use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

use scenehub_adapter_http_axum::router;
use scenehub_adapter_http_axum::state::AppState;
use scenehub_adapter_virtual::{
    MemoryDetector, MemoryObjectStore, MemoryStateStore, Seed, forward_changes,
    forward_notifications,
};
use scenehub_app::engine::SceneEngine;
use scenehub_app::event_bus::InProcessEventBus;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;

    let filter = EnvFilter::try_new(&config.logging.filter).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Virtual backend
    let states = Arc::new(MemoryStateStore::default());
    let objects = Arc::new(MemoryObjectStore::default());
    let detector = Arc::new(MemoryDetector::new(Arc::clone(&states)));
    if let Some(path) = &config.seed.path {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read seed file {path}"))?;
        Seed::from_json(&json)
            .with_context(|| format!("invalid seed file {path}"))?
            .apply(&states, &objects, &detector);
    }

    // Engine
    let event_bus = Arc::new(InProcessEventBus::new(256));
    let (engine, handle, events) = SceneEngine::new(
        Arc::clone(&states),
        Arc::clone(&objects),
        Arc::clone(&objects),
        detector,
        Arc::clone(&event_bus),
        config.engine_settings(),
    );
    forward_changes(&states, handle.clone());
    forward_notifications(&objects, handle.clone());
    let engine_task = tokio::spawn(engine.run(events));

    // HTTP
    let app = router::build(AppState::new(handle.clone(), event_bus));
    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    info!(addr = %bind_addr, instance = %config.engine.instance, "scenehubd listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("stopping scene engine");
    handle.shutdown().await?;
    engine_task.await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
