use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::Value;

use crate::{
    dao::{
        models::{
            CategoryEntity, CategoryId, NewRoom, RoomEntity, RoomId, RoomPlayerEntity, RoomStatus,
            RoomType, UserId,
        },
        room_store::{InMemoryRoomStore, RoomStore},
        storage::{StorageError, StorageResult},
    },
    state::hub::Subscription,
};

/// Room created by user 1 ("alice", admin) with the extra members listed in `players`.
pub async fn seeded_room(
    room_type: RoomType,
    time_per_round_secs: u32,
    rounds: u32,
    players: &[(UserId, &str)],
) -> (Arc<dyn RoomStore>, RoomEntity) {
    seeded_room_with_categories(room_type, time_per_round_secs, rounds, players, &[]).await
}

pub async fn seeded_room_with_categories(
    room_type: RoomType,
    time_per_round_secs: u32,
    rounds: u32,
    players: &[(UserId, &str)],
    categories: &[&str],
) -> (Arc<dyn RoomStore>, RoomEntity) {
    let store: Arc<dyn RoomStore> = Arc::new(InMemoryRoomStore::new());
    let room = store
        .create_room(NewRoom {
            room_type,
            creator_id: 1,
            creator_pseudo: "alice".into(),
            max_players: 10,
            time_per_round_secs,
            rounds,
            categories: categories.iter().map(|c| c.to_string()).collect(),
        })
        .await
        .unwrap();
    for (user_id, pseudo) in players {
        store
            .add_player(room.id, *user_id, pseudo.to_string())
            .await
            .unwrap();
    }
    (store, room)
}

/// Next hub message decoded as JSON. With a paused clock this lets pending timers fire.
pub async fn next_message(subscription: &mut Subscription) -> Value {
    let payload = subscription
        .receiver
        .recv()
        .await
        .expect("hub closed the viewer channel");
    serde_json::from_str(&payload).unwrap()
}

/// Store whose score writes always fail; every other call goes to `inner`.
pub struct ScoreWriteFailingStore {
    inner: Arc<dyn RoomStore>,
}

impl ScoreWriteFailingStore {
    pub fn wrap(inner: Arc<dyn RoomStore>) -> Arc<dyn RoomStore> {
        Arc::new(Self { inner })
    }
}

impl RoomStore for ScoreWriteFailingStore {
    fn create_room(&self, room: NewRoom) -> BoxFuture<'static, StorageResult<RoomEntity>> {
        self.inner.create_room(room)
    }
    fn find_room_by_code(
        &self,
        code: String,
    ) -> BoxFuture<'static, StorageResult<Option<RoomEntity>>> {
        self.inner.find_room_by_code(code)
    }
    fn find_room(&self, id: RoomId) -> BoxFuture<'static, StorageResult<Option<RoomEntity>>> {
        self.inner.find_room(id)
    }
    fn set_room_status(
        &self,
        id: RoomId,
        status: RoomStatus,
    ) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.set_room_status(id, status)
    }
    fn list_players(
        &self,
        room_id: RoomId,
    ) -> BoxFuture<'static, StorageResult<Vec<RoomPlayerEntity>>> {
        self.inner.list_players(room_id)
    }
    fn find_player(
        &self,
        room_id: RoomId,
        user_id: UserId,
    ) -> BoxFuture<'static, StorageResult<Option<RoomPlayerEntity>>> {
        self.inner.find_player(room_id, user_id)
    }
    fn add_player(
        &self,
        room_id: RoomId,
        user_id: UserId,
        pseudo: String,
    ) -> BoxFuture<'static, StorageResult<RoomPlayerEntity>> {
        self.inner.add_player(room_id, user_id, pseudo)
    }
    fn remove_player(
        &self,
        room_id: RoomId,
        user_id: UserId,
    ) -> BoxFuture<'static, StorageResult<Option<RoomPlayerEntity>>> {
        self.inner.remove_player(room_id, user_id)
    }
    fn set_player_ready(
        &self,
        room_id: RoomId,
        user_id: UserId,
        ready: bool,
    ) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.set_player_ready(room_id, user_id, ready)
    }
    fn add_score(
        &self,
        _room_id: RoomId,
        _user_id: UserId,
        _delta: i64,
    ) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async {
            Err(StorageError::unavailable(
                "score write rejected".into(),
                std::io::Error::other("connection reset"),
            ))
        })
    }
    fn list_categories(
        &self,
        room_id: RoomId,
    ) -> BoxFuture<'static, StorageResult<Vec<CategoryEntity>>> {
        self.inner.list_categories(room_id)
    }
    fn add_category(
        &self,
        room_id: RoomId,
        label: String,
    ) -> BoxFuture<'static, StorageResult<CategoryEntity>> {
        self.inner.add_category(room_id, label)
    }
    fn rename_category(
        &self,
        room_id: RoomId,
        category_id: CategoryId,
        label: String,
    ) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.rename_category(room_id, category_id, label)
    }
    fn delete_category(
        &self,
        room_id: RoomId,
        category_id: CategoryId,
    ) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.delete_category(room_id, category_id)
    }
    fn playlist_choice(&self, room_id: RoomId) -> BoxFuture<'static, StorageResult<Option<String>>> {
        self.inner.playlist_choice(room_id)
    }
    fn set_playlist_choice(
        &self,
        room_id: RoomId,
        choice: String,
    ) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.set_playlist_choice(room_id, choice)
    }
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.health_check()
    }
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.try_reconnect()
    }
}
