/// Blind-test round engine.
pub mod blindtest;
/// Per-room broadcast hubs.
pub mod hub;
/// Free-text answer normalization.
pub mod normalize;
/// Petit-bac round engine.
pub mod petitbac;
/// Room to engine registry.
pub mod registry;
/// Generation-keyed deadline timer.
pub mod timer;

#[cfg(test)]
pub(crate) mod test_support;

use std::sync::Arc;

use tokio::sync::{RwLock, watch};

use crate::{
    config::AppConfig, dao::models::RoomId, dao::room_store::RoomStore, error::ServiceError,
    provider::TrackProvider,
};

use self::{
    hub::{HubRegistry, RoomHub},
    registry::GameRegistry,
};

pub type SharedState = Arc<AppState>;

/// Central application state: storage handle, track provider, room hubs and active engines.
pub struct AppState {
    room_store: RwLock<Option<Arc<dyn RoomStore>>>,
    degraded: watch::Sender<bool>,
    provider: Arc<dyn TrackProvider>,
    hubs: HubRegistry,
    games: GameRegistry,
    config: Arc<AppConfig>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(provider: Arc<dyn TrackProvider>, config: Arc<AppConfig>) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            room_store: RwLock::new(None),
            degraded: degraded_tx,
            provider,
            hubs: HubRegistry::new(config.hub_client_capacity),
            games: GameRegistry::new(),
            config,
        })
    }

    /// Obtain a handle to the current room store, if one is installed.
    pub async fn room_store(&self) -> Option<Arc<dyn RoomStore>> {
        let guard = self.room_store.read().await;
        guard.as_ref().cloned()
    }

    /// Current room store, or [`ServiceError::Degraded`] while none is installed.
    pub async fn require_room_store(&self) -> Result<Arc<dyn RoomStore>, ServiceError> {
        self.room_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new room store implementation and leave degraded mode.
    pub async fn set_room_store(&self, store: Arc<dyn RoomStore>) {
        {
            let mut guard = self.room_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false).await;
    }

    /// Current degraded flag.
    pub async fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub async fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                return false;
            }
            *current = value;
            true
        });
    }

    /// Broadcast hub of a room, started on first use.
    pub fn hub(&self, room_id: RoomId) -> RoomHub {
        self.hubs.obtain(room_id)
    }

    pub fn games(&self) -> &GameRegistry {
        &self.games
    }

    pub fn provider(&self) -> Arc<dyn TrackProvider> {
        self.provider.clone()
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use crate::{dao::room_store::InMemoryRoomStore, provider::testing::StaticTrackProvider};

    use super::*;

    #[tokio::test]
    async fn state_is_degraded_until_a_store_is_installed() {
        let state = AppState::new(
            Arc::new(StaticTrackProvider::new(Vec::new())),
            Arc::new(AppConfig::default()),
        );
        let mut watcher = state.degraded_watcher();
        assert!(state.is_degraded().await);
        assert!(matches!(
            state.require_room_store().await,
            Err(ServiceError::Degraded)
        ));

        state
            .set_room_store(Arc::new(InMemoryRoomStore::new()))
            .await;
        assert!(!state.is_degraded().await);
        assert!(watcher.has_changed().unwrap());
        assert!(!*watcher.borrow_and_update());
        assert!(state.require_room_store().await.is_ok());
    }
}
