use std::{collections::HashMap, sync::Arc, time::SystemTime};

use futures::future::BoxFuture;
use tokio::sync::RwLock;

use super::RoomStore;
use crate::dao::{
    models::{
        CategoryEntity, CategoryId, NewRoom, ROOM_CODE_ATTEMPTS, RoomEntity, RoomId,
        RoomPlayerEntity, RoomStatus, UserId, generate_room_code,
    },
    storage::{StorageError, StorageResult},
};

/// Process-local store used when no database is configured and by the test suite.
///
/// One write lock spans each operation, which gives the same atomicity the database backend
/// gets from single-document updates.
#[derive(Clone, Default)]
pub struct InMemoryRoomStore {
    tables: Arc<RwLock<Tables>>,
}

#[derive(Default)]
struct Tables {
    rooms: HashMap<RoomId, RoomEntity>,
    codes: HashMap<String, RoomId>,
    players: HashMap<RoomId, Vec<RoomPlayerEntity>>,
    categories: HashMap<RoomId, Vec<CategoryEntity>>,
    playlists: HashMap<RoomId, String>,
    last_room_id: RoomId,
    last_category_id: CategoryId,
}

impl Tables {
    fn require_room(&self, room_id: RoomId) -> StorageResult<&RoomEntity> {
        self.rooms
            .get(&room_id)
            .ok_or(StorageError::RoomNotFound(room_id))
    }

    fn player_mut(
        &mut self,
        room_id: RoomId,
        user_id: UserId,
    ) -> StorageResult<&mut RoomPlayerEntity> {
        self.players
            .get_mut(&room_id)
            .and_then(|players| players.iter_mut().find(|p| p.user_id == user_id))
            .ok_or(StorageError::PlayerNotFound { room_id, user_id })
    }

    fn category_mut(
        &mut self,
        room_id: RoomId,
        category_id: CategoryId,
    ) -> StorageResult<&mut CategoryEntity> {
        self.categories
            .get_mut(&room_id)
            .and_then(|categories| categories.iter_mut().find(|c| c.id == category_id))
            .ok_or(StorageError::CategoryNotFound(category_id))
    }

    fn label_taken(&self, room_id: RoomId, label: &str, except: Option<CategoryId>) -> bool {
        let wanted = label.to_lowercase();
        self.categories.get(&room_id).is_some_and(|categories| {
            categories
                .iter()
                .any(|c| Some(c.id) != except && c.label.to_lowercase() == wanted)
        })
    }

    fn push_category(&mut self, room_id: RoomId, label: String) -> CategoryEntity {
        self.last_category_id += 1;
        let categories = self.categories.entry(room_id).or_default();
        let position = categories.iter().map(|c| c.position + 1).max().unwrap_or(0);
        let category = CategoryEntity {
            id: self.last_category_id,
            label,
            position,
        };
        categories.push(category.clone());
        category
    }
}

impl InMemoryRoomStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    async fn create_room(&self, room: NewRoom) -> StorageResult<RoomEntity> {
        let mut tables = self.tables.write().await;

        let code = (0..ROOM_CODE_ATTEMPTS)
            .map(|_| generate_room_code())
            .find(|candidate| !tables.codes.contains_key(candidate))
            .ok_or(StorageError::CodeSpaceExhausted(ROOM_CODE_ATTEMPTS))?;

        tables.last_room_id += 1;
        let entity = RoomEntity {
            id: tables.last_room_id,
            code: code.clone(),
            room_type: room.room_type,
            creator_id: room.creator_id,
            max_players: room.max_players,
            time_per_round_secs: room.time_per_round_secs,
            rounds: room.rounds,
            status: RoomStatus::Lobby,
            created_at: SystemTime::now(),
        };

        tables.codes.insert(code, entity.id);
        tables.rooms.insert(entity.id, entity.clone());
        tables.players.insert(
            entity.id,
            vec![RoomPlayerEntity {
                user_id: room.creator_id,
                pseudo: room.creator_pseudo,
                is_admin: true,
                is_ready: false,
                score: 0,
            }],
        );
        for label in room.categories {
            tables.push_category(entity.id, label);
        }

        Ok(entity)
    }

    async fn add_player(
        &self,
        room_id: RoomId,
        user_id: UserId,
        pseudo: String,
    ) -> StorageResult<RoomPlayerEntity> {
        let mut tables = self.tables.write().await;
        let capacity = tables.require_room(room_id)?.max_players as usize;
        let players = tables.players.entry(room_id).or_default();

        if players.iter().any(|p| p.user_id == user_id) {
            return Err(StorageError::AlreadyInRoom { room_id, user_id });
        }
        if players.len() >= capacity {
            return Err(StorageError::RoomFull(room_id));
        }

        let player = RoomPlayerEntity {
            user_id,
            pseudo,
            is_admin: false,
            is_ready: false,
            score: 0,
        };
        players.push(player.clone());
        Ok(player)
    }

    async fn add_category(&self, room_id: RoomId, label: String) -> StorageResult<CategoryEntity> {
        let mut tables = self.tables.write().await;
        tables.require_room(room_id)?;
        if tables.label_taken(room_id, &label, None) {
            return Err(StorageError::DuplicateCategory(label));
        }
        Ok(tables.push_category(room_id, label))
    }

    async fn rename_category(
        &self,
        room_id: RoomId,
        category_id: CategoryId,
        label: String,
    ) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        if tables.label_taken(room_id, &label, Some(category_id)) {
            return Err(StorageError::DuplicateCategory(label));
        }
        tables.category_mut(room_id, category_id)?.label = label;
        Ok(())
    }

    async fn delete_category(&self, room_id: RoomId, category_id: CategoryId) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        let categories = tables
            .categories
            .get_mut(&room_id)
            .ok_or(StorageError::CategoryNotFound(category_id))?;
        let before = categories.len();
        categories.retain(|c| c.id != category_id);
        if categories.len() == before {
            return Err(StorageError::CategoryNotFound(category_id));
        }
        Ok(())
    }
}

impl RoomStore for InMemoryRoomStore {
    fn create_room(&self, room: NewRoom) -> BoxFuture<'static, StorageResult<RoomEntity>> {
        let store = self.clone();
        Box::pin(async move { store.create_room(room).await })
    }

    fn find_room_by_code(
        &self,
        code: String,
    ) -> BoxFuture<'static, StorageResult<Option<RoomEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let tables = store.tables.read().await;
            Ok(tables
                .codes
                .get(&code)
                .and_then(|id| tables.rooms.get(id))
                .cloned())
        })
    }

    fn find_room(&self, id: RoomId) -> BoxFuture<'static, StorageResult<Option<RoomEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.tables.read().await.rooms.get(&id).cloned()) })
    }

    fn set_room_status(
        &self,
        id: RoomId,
        status: RoomStatus,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let mut tables = store.tables.write().await;
            let room = tables
                .rooms
                .get_mut(&id)
                .ok_or(StorageError::RoomNotFound(id))?;
            room.status = status;
            Ok(())
        })
    }

    fn list_players(
        &self,
        room_id: RoomId,
    ) -> BoxFuture<'static, StorageResult<Vec<RoomPlayerEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let tables = store.tables.read().await;
            Ok(tables.players.get(&room_id).cloned().unwrap_or_default())
        })
    }

    fn find_player(
        &self,
        room_id: RoomId,
        user_id: UserId,
    ) -> BoxFuture<'static, StorageResult<Option<RoomPlayerEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let tables = store.tables.read().await;
            Ok(tables
                .players
                .get(&room_id)
                .and_then(|players| players.iter().find(|p| p.user_id == user_id))
                .cloned())
        })
    }

    fn add_player(
        &self,
        room_id: RoomId,
        user_id: UserId,
        pseudo: String,
    ) -> BoxFuture<'static, StorageResult<RoomPlayerEntity>> {
        let store = self.clone();
        Box::pin(async move { store.add_player(room_id, user_id, pseudo).await })
    }

    fn remove_player(
        &self,
        room_id: RoomId,
        user_id: UserId,
    ) -> BoxFuture<'static, StorageResult<Option<RoomPlayerEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let mut tables = store.tables.write().await;
            let Some(players) = tables.players.get_mut(&room_id) else {
                return Ok(None);
            };
            let removed = players
                .iter()
                .position(|p| p.user_id == user_id)
                .map(|index| players.remove(index));
            Ok(removed)
        })
    }

    fn set_player_ready(
        &self,
        room_id: RoomId,
        user_id: UserId,
        ready: bool,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let mut tables = store.tables.write().await;
            tables.player_mut(room_id, user_id)?.is_ready = ready;
            Ok(())
        })
    }

    fn add_score(
        &self,
        room_id: RoomId,
        user_id: UserId,
        delta: i64,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let mut tables = store.tables.write().await;
            tables.player_mut(room_id, user_id)?.score += delta;
            Ok(())
        })
    }

    fn list_categories(
        &self,
        room_id: RoomId,
    ) -> BoxFuture<'static, StorageResult<Vec<CategoryEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let tables = store.tables.read().await;
            let mut categories = tables.categories.get(&room_id).cloned().unwrap_or_default();
            categories.sort_by_key(|c| (c.position, c.id));
            Ok(categories)
        })
    }

    fn add_category(
        &self,
        room_id: RoomId,
        label: String,
    ) -> BoxFuture<'static, StorageResult<CategoryEntity>> {
        let store = self.clone();
        Box::pin(async move { store.add_category(room_id, label).await })
    }

    fn rename_category(
        &self,
        room_id: RoomId,
        category_id: CategoryId,
        label: String,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.rename_category(room_id, category_id, label).await })
    }

    fn delete_category(
        &self,
        room_id: RoomId,
        category_id: CategoryId,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.delete_category(room_id, category_id).await })
    }

    fn playlist_choice(&self, room_id: RoomId) -> BoxFuture<'static, StorageResult<Option<String>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.tables.read().await.playlists.get(&room_id).cloned()) })
    }

    fn set_playlist_choice(
        &self,
        room_id: RoomId,
        choice: String,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let mut tables = store.tables.write().await;
            tables.require_room(room_id)?;
            tables.playlists.insert(room_id, choice);
            Ok(())
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::models::RoomType;

    fn new_room(max_players: u32, categories: &[&str]) -> NewRoom {
        NewRoom {
            room_type: RoomType::PetitBac,
            creator_id: 1,
            creator_pseudo: "alice".into(),
            max_players,
            time_per_round_secs: 30,
            rounds: 2,
            categories: categories.iter().map(|c| c.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn create_room_seeds_admin_and_categories() {
        let store = InMemoryRoomStore::new();
        let room = RoomStore::create_room(&store, new_room(4, &["Fruit", "Pays"]))
            .await
            .unwrap();

        let found = store.find_room_by_code(room.code.clone()).await.unwrap();
        assert_eq!(found.map(|r| r.id), Some(room.id));

        let players = store.list_players(room.id).await.unwrap();
        assert_eq!(players.len(), 1);
        assert!(players[0].is_admin);
        assert!(store.is_user_admin(room.id, 1).await.unwrap());

        let labels: Vec<_> = store
            .list_categories(room.id)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.label)
            .collect();
        assert_eq!(labels, ["Fruit", "Pays"]);
    }

    #[tokio::test]
    async fn add_player_enforces_capacity_and_uniqueness() {
        let store = InMemoryRoomStore::new();
        let room = RoomStore::create_room(&store, new_room(2, &[])).await.unwrap();

        assert!(matches!(
            RoomStore::add_player(&store, room.id, 1, "again".into()).await,
            Err(StorageError::AlreadyInRoom { .. })
        ));
        RoomStore::add_player(&store, room.id, 2, "bob".into())
            .await
            .unwrap();
        assert!(matches!(
            RoomStore::add_player(&store, room.id, 3, "carol".into()).await,
            Err(StorageError::RoomFull(_))
        ));
        assert!(store.is_user_in_room(room.id, 2).await.unwrap());
        assert!(!store.is_user_admin(room.id, 2).await.unwrap());
    }

    #[tokio::test]
    async fn add_score_accumulates_deltas() {
        let store = InMemoryRoomStore::new();
        let room = RoomStore::create_room(&store, new_room(4, &[])).await.unwrap();

        store.add_score(room.id, 1, 25).await.unwrap();
        store.add_score(room.id, 1, 2).await.unwrap();
        let player = store.find_player(room.id, 1).await.unwrap().unwrap();
        assert_eq!(player.score, 27);

        assert!(matches!(
            store.add_score(room.id, 99, 1).await,
            Err(StorageError::PlayerNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn category_labels_are_unique_ignoring_case() {
        let store = InMemoryRoomStore::new();
        let room = RoomStore::create_room(&store, new_room(4, &["Fruit"]))
            .await
            .unwrap();

        assert!(matches!(
            RoomStore::add_category(&store, room.id, "fruit".into()).await,
            Err(StorageError::DuplicateCategory(_))
        ));
        let added = RoomStore::add_category(&store, room.id, "Pays".into())
            .await
            .unwrap();
        assert_eq!(added.position, 1);

        RoomStore::rename_category(&store, room.id, added.id, "PAYS".into())
            .await
            .unwrap();
        RoomStore::delete_category(&store, room.id, added.id)
            .await
            .unwrap();
        assert!(matches!(
            RoomStore::delete_category(&store, room.id, added.id).await,
            Err(StorageError::CategoryNotFound(_))
        ));
    }

    #[tokio::test]
    async fn remove_player_returns_the_record() {
        let store = InMemoryRoomStore::new();
        let room = RoomStore::create_room(&store, new_room(4, &[])).await.unwrap();
        RoomStore::add_player(&store, room.id, 2, "bob".into())
            .await
            .unwrap();

        let removed = store.remove_player(room.id, 2).await.unwrap();
        assert_eq!(removed.map(|p| p.pseudo), Some("bob".to_string()));
        assert!(store.remove_player(room.id, 2).await.unwrap().is_none());
    }
}
