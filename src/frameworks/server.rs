// Framework bootstrap for the survival server runtime.

use crate::domain::tuning::Tuning;
use crate::frameworks::config;
use crate::interface_adapters::net::{start_session_handler, ws_handler};
use crate::interface_adapters::state::AppState;
use crate::use_cases::{SessionRegistry, SessionSettings};

use axum::{
    Router,
    routing::{get, post},
};
use std::net::SocketAddr;
use std::{io::Result, sync::Arc};

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

pub async fn run(listener: tokio::net::TcpListener) -> Result<()> {
    let address = listener.local_addr()?;
    let state = build_state();
    let registry = state.session_registry.clone();

    let app = Router::new()
        .route("/ws", get(ws_handler))
        .route("/sessions", post(start_session_handler))
        .with_state(state);

    tracing::info!(%address, "listening");

    let served = axum::serve(listener, app).await.inspect_err(|e| {
        tracing::error!(error = %e, "server error");
    });
    registry.shutdown().await;
    served
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let address = SocketAddr::from(([127, 0, 0, 1], config::http_port()));

    let listener = tokio::net::TcpListener::bind(address)
        .await
        .inspect_err(|e| {
            tracing::error!(%address, error = %e, "failed to bind");
        })?;

    run(listener).await
}

fn build_state() -> Arc<AppState> {
    let settings = SessionSettings {
        input_channel_capacity: config::INPUT_CHANNEL_CAPACITY,
        world_broadcast_capacity: config::WORLD_BROADCAST_CAPACITY,
        event_broadcast_capacity: config::EVENT_BROADCAST_CAPACITY,
        tick_interval: config::TICK_INTERVAL,
        snapshot_every: config::SNAPSHOT_EVERY_TICKS,
        teardown_grace: config::teardown_grace(),
        seed: config::session_seed(),
        tuning: Tuning::default(),
    };
    tracing::debug!(
        tick_ms = settings.tick_interval.as_millis(),
        snapshot_every = settings.snapshot_every,
        teardown_grace_ms = settings.teardown_grace.as_millis(),
        fixed_seed = settings.seed.is_some(),
        "session settings"
    );

    Arc::new(AppState {
        session_registry: Arc::new(SessionRegistry::new(settings)),
    })
}
