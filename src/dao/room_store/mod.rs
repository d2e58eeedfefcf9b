/// In-process backend used without MongoDB and in tests.
pub mod memory;
/// MongoDB backend.
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use futures::future::BoxFuture;

use crate::dao::{
    models::{
        CategoryEntity, CategoryId, NewRoom, RoomEntity, RoomId, RoomPlayerEntity, RoomStatus,
        UserId,
    },
    storage::StorageResult,
};

pub use memory::InMemoryRoomStore;

/// Abstraction over the persistence layer for rooms, memberships, scores and game configuration.
///
/// Every future is `'static` so callers can hold it across their own locks without borrowing
/// the store.
pub trait RoomStore: Send + Sync {
    /// Insert a room with a fresh unique code, its admin membership and seeded categories.
    fn create_room(&self, room: NewRoom) -> BoxFuture<'static, StorageResult<RoomEntity>>;
    /// Look a room up by its canonical code.
    fn find_room_by_code(&self, code: String)
    -> BoxFuture<'static, StorageResult<Option<RoomEntity>>>;
    fn find_room(&self, id: RoomId) -> BoxFuture<'static, StorageResult<Option<RoomEntity>>>;
    fn set_room_status(
        &self,
        id: RoomId,
        status: RoomStatus,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Members in join order.
    fn list_players(&self, room_id: RoomId)
    -> BoxFuture<'static, StorageResult<Vec<RoomPlayerEntity>>>;
    fn find_player(
        &self,
        room_id: RoomId,
        user_id: UserId,
    ) -> BoxFuture<'static, StorageResult<Option<RoomPlayerEntity>>>;
    /// Add a member, enforcing room capacity and (room, user) uniqueness.
    fn add_player(
        &self,
        room_id: RoomId,
        user_id: UserId,
        pseudo: String,
    ) -> BoxFuture<'static, StorageResult<RoomPlayerEntity>>;
    /// Remove a member, returning the removed record when there was one.
    fn remove_player(
        &self,
        room_id: RoomId,
        user_id: UserId,
    ) -> BoxFuture<'static, StorageResult<Option<RoomPlayerEntity>>>;
    fn set_player_ready(
        &self,
        room_id: RoomId,
        user_id: UserId,
        ready: bool,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Atomically add `delta` to a member's cumulative score.
    fn add_score(
        &self,
        room_id: RoomId,
        user_id: UserId,
        delta: i64,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Categories ordered by position.
    fn list_categories(
        &self,
        room_id: RoomId,
    ) -> BoxFuture<'static, StorageResult<Vec<CategoryEntity>>>;
    /// Append a category, rejecting case-insensitive duplicates.
    fn add_category(
        &self,
        room_id: RoomId,
        label: String,
    ) -> BoxFuture<'static, StorageResult<CategoryEntity>>;
    fn rename_category(
        &self,
        room_id: RoomId,
        category_id: CategoryId,
        label: String,
    ) -> BoxFuture<'static, StorageResult<()>>;
    fn delete_category(
        &self,
        room_id: RoomId,
        category_id: CategoryId,
    ) -> BoxFuture<'static, StorageResult<()>>;
    fn playlist_choice(&self, room_id: RoomId) -> BoxFuture<'static, StorageResult<Option<String>>>;
    fn set_playlist_choice(
        &self,
        room_id: RoomId,
        choice: String,
    ) -> BoxFuture<'static, StorageResult<()>>;
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;

    fn is_user_in_room(
        &self,
        room_id: RoomId,
        user_id: UserId,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let lookup = self.find_player(room_id, user_id);
        Box::pin(async move { Ok(lookup.await?.is_some()) })
    }

    fn is_user_admin(
        &self,
        room_id: RoomId,
        user_id: UserId,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let lookup = self.find_player(room_id, user_id);
        Box::pin(async move { Ok(lookup.await?.is_some_and(|player| player.is_admin)) })
    }
}
