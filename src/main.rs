//! Party Rooms Back binary entrypoint wiring REST, WebSocket, track provider and room store layers.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod dao;
mod dto;
mod error;
mod provider;
mod routes;
mod services;
mod state;

use config::AppConfig;
use provider::DeezerProvider;
use state::{AppState, SharedState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = Arc::new(AppConfig::load());
    let provider =
        DeezerProvider::new(&config.provider).context("building track provider client")?;
    let app_state = AppState::new(Arc::new(provider), config);

    start_room_store(app_state.clone()).await;
    // Build the HTTP router once the shared state is ready.
    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Supervise MongoDB in the background when `MONGO_URI` is set; otherwise keep rooms in memory.
#[cfg(feature = "mongo-store")]
async fn start_room_store(state: SharedState) {
    use dao::room_store::{
        RoomStore,
        mongodb::{MongoConfig, MongoRoomStore},
    };
    use dao::storage::StorageError;

    let Ok(uri) = env::var("MONGO_URI") else {
        use_memory_store(state).await;
        return;
    };
    let db_name = env::var("MONGO_DB").ok();
    info!("room store backed by MongoDB");

    tokio::spawn(services::storage_supervisor::run(state, move || {
        let uri = uri.clone();
        let db_name = db_name.clone();
        async move {
            let config = MongoConfig::from_uri(&uri, db_name.as_deref()).await?;
            let store = MongoRoomStore::connect(config).await?;
            Ok::<_, StorageError>(Arc::new(store) as Arc<dyn RoomStore>)
        }
    }));
}

#[cfg(not(feature = "mongo-store"))]
async fn start_room_store(state: SharedState) {
    use_memory_store(state).await;
}

async fn use_memory_store(state: SharedState) {
    info!("MONGO_URI not set; keeping rooms in memory");
    state
        .set_room_store(Arc::new(dao::room_store::InMemoryRoomStore::new()))
        .await;
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
