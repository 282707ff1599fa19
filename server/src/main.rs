//! Composition root. Parses config, wires the singletons together, and
//! spawns the tick loop, UDP transport, and health server as independent
//! tokio tasks — the same top-level shape as the teacher's `main`
//! (`env_logger::init`, `clap::Parser`, spawn-then-select), generalized
//! from one TCP/WebSocket pair to a UDP game transport plus a separate
//! HTTP health port.

use std::sync::Arc;
use std::time::Duration;

use log::info;
use tokio::sync::watch;

use server::config::Config;
use server::health;
use server::hub::Hub;
use server::input_cache::InputCache;
use server::match_queue::RedisMatchQueue;
use server::network::{self, ConnectionTracker, UdpTransport};
use server::scheduler;
use server::session_store::SessionStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Warning: RUST_LOG not set. Try RUST_LOG=info cargo run --bin server");
    }

    let config = Config::parse_args()?;
    info!("starting pong server on {}:{} (health on :{})", config.host, config.port, config.health_port);

    let session_store = Arc::new(SessionStore::new());
    let input_cache = Arc::new(InputCache::new());
    let match_queue = Arc::new(RedisMatchQueue::connect(&config.coord_store_url).await?);
    let transport = Arc::new(UdpTransport::bind(&format!("{}:{}", config.host, config.port)).await?);
    let hub = Arc::new(Hub::new(
        session_store.clone(),
        input_cache.clone(),
        match_queue.clone(),
        transport.clone(),
    ));
    let tracker = Arc::new(ConnectionTracker::new());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let scheduler_handle = tokio::spawn(scheduler::run(
        session_store.clone(),
        input_cache.clone(),
        transport.clone(),
        (1000 / config.tick_rate_hz().max(1)) as u64,
        Duration::from_millis(config.client_sync_ms()),
        shutdown_rx,
    ));

    let receive_handle = tokio::spawn(network::run_receive_loop(transport.socket(), tracker.clone(), hub.clone()));
    let timeout_handle = tokio::spawn(network::run_timeout_checker(tracker.clone(), hub.clone()));

    let health_state = health::HealthState::new(session_store.clone(), match_queue.clone());
    let health_addr = format!("{}:{}", config.host, config.health_port);
    let health_listener = tokio::net::TcpListener::bind(&health_addr).await?;
    info!("health endpoint listening on {health_addr}");
    let cors_allow_origins = config.cors_allow_origins.clone();
    let health_handle = tokio::spawn(async move {
        axum::serve(health_listener, health::router(health_state, &cors_allow_origins)).await
    });

    tokio::signal::ctrl_c().await?;
    info!("shutdown requested, draining active sessions");
    shutdown_tx.send(true)?;

    scheduler_handle.await?;
    receive_handle.abort();
    timeout_handle.abort();
    health_handle.abort();

    info!("shutdown complete");
    Ok(())
}
