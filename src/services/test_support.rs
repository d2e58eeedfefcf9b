use std::sync::Arc;

use crate::{
    config::AppConfig,
    dao::room_store::InMemoryRoomStore,
    provider::{
        Track,
        testing::{StaticTrackProvider, track},
    },
    state::{AppState, SharedState},
};

/// State without a room store, as right after boot.
pub fn degraded_state() -> SharedState {
    AppState::new(
        Arc::new(StaticTrackProvider::new(default_tracks())),
        Arc::new(AppConfig::default()),
    )
}

/// State backed by the in-memory store and a small static track pool.
pub async fn test_state() -> SharedState {
    test_state_with_tracks(default_tracks()).await
}

pub async fn test_state_with_tracks(tracks: Vec<Track>) -> SharedState {
    let state = AppState::new(
        Arc::new(StaticTrackProvider::new(tracks)),
        Arc::new(AppConfig::default()),
    );
    state
        .set_room_store(Arc::new(InMemoryRoomStore::new()))
        .await;
    state
}

fn default_tracks() -> Vec<Track> {
    vec![
        track(1, "Bohemian Rhapsody", "Queen"),
        track(2, "Smells Like Teen Spirit", "Nirvana"),
    ]
}
