use std::sync::Arc;

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Client, Collection, Database, IndexModel,
    bson::{Document, doc},
    options::{IndexOptions, ReturnDocument},
};
use tokio::sync::RwLock;
use tracing::debug;

use super::{
    config::MongoConfig,
    connection::connect_room_database,
    error::{MongoDaoError, MongoResult, is_duplicate_key},
    models::{
        CounterDocument, MongoCategoryDocument, MongoPlayerDocument, MongoRoomDocument,
        status_label,
    },
};
use crate::dao::{
    models::{
        CategoryEntity, CategoryId, NewRoom, ROOM_CODE_ATTEMPTS, RoomEntity, RoomId,
        RoomPlayerEntity, RoomStatus, UserId, generate_room_code,
    },
    room_store::RoomStore,
    storage::{StorageError, StorageResult},
};

const ROOM_COLLECTION_NAME: &str = "rooms";
const PLAYER_COLLECTION_NAME: &str = "room_players";
const CATEGORY_COLLECTION_NAME: &str = "categories";
const COUNTER_COLLECTION_NAME: &str = "counters";

const ROOM_SEQUENCE: &str = "rooms";
const CATEGORY_SEQUENCE: &str = "categories";

/// MongoDB-backed [`RoomStore`]. Score deltas are applied with `$inc` so concurrent awards
/// never overwrite each other.
#[derive(Clone)]
pub struct MongoRoomStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) =
            connect_room_database(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

fn query_error(operation: &'static str) -> impl FnOnce(mongodb::error::Error) -> MongoDaoError {
    move |source| MongoDaoError::Query { operation, source }
}

fn unique_index(keys: Document, name: &str) -> IndexModel {
    IndexModel::builder()
        .keys(keys)
        .options(
            IndexOptions::builder()
                .name(Some(name.to_owned()))
                .unique(Some(true))
                .build(),
        )
        .build()
}

impl MongoRoomStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) =
            connect_room_database(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        self.rooms()
            .await
            .create_index(unique_index(doc! {"code": 1}, "room_code_idx"))
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: ROOM_COLLECTION_NAME,
                index: "code",
                source,
            })?;

        self.players()
            .await
            .create_index(unique_index(
                doc! {"room_id": 1, "user_id": 1},
                "room_player_idx",
            ))
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: PLAYER_COLLECTION_NAME,
                index: "room_id,user_id",
                source,
            })?;

        self.categories()
            .await
            .create_index(unique_index(
                doc! {"room_id": 1, "label_key": 1},
                "room_category_label_idx",
            ))
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: CATEGORY_COLLECTION_NAME,
                index: "room_id,label_key",
                source,
            })?;

        Ok(())
    }

    async fn database(&self) -> Database {
        let guard = self.inner.state.read().await;
        guard.database.clone()
    }

    async fn rooms(&self) -> Collection<MongoRoomDocument> {
        self.database().await.collection(ROOM_COLLECTION_NAME)
    }

    async fn players(&self) -> Collection<MongoPlayerDocument> {
        self.database().await.collection(PLAYER_COLLECTION_NAME)
    }

    async fn categories(&self) -> Collection<MongoCategoryDocument> {
        self.database().await.collection(CATEGORY_COLLECTION_NAME)
    }

    async fn counters(&self) -> Collection<CounterDocument> {
        self.database().await.collection(COUNTER_COLLECTION_NAME)
    }

    async fn next_id(&self, sequence: &'static str) -> MongoResult<i64> {
        let counter = self
            .counters()
            .await
            .find_one_and_update(doc! {"_id": sequence}, doc! {"$inc": {"seq": 1_i64}})
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await
            .map_err(query_error("next_id"))?
            .ok_or(MongoDaoError::MissingCounter(sequence))?;
        Ok(counter.seq)
    }

    async fn create_room(&self, room: NewRoom) -> StorageResult<RoomEntity> {
        let rooms = self.rooms().await;
        let mut inserted = None;

        for attempt in 0..ROOM_CODE_ATTEMPTS {
            let entity = RoomEntity {
                id: self.next_id(ROOM_SEQUENCE).await?,
                code: generate_room_code(),
                room_type: room.room_type,
                creator_id: room.creator_id,
                max_players: room.max_players,
                time_per_round_secs: room.time_per_round_secs,
                rounds: room.rounds,
                status: RoomStatus::Lobby,
                created_at: std::time::SystemTime::now(),
            };
            let document = MongoRoomDocument::from(entity.clone());
            match rooms.insert_one(&document).await {
                Ok(_) => {
                    inserted = Some(entity);
                    break;
                }
                Err(err) if is_duplicate_key(&err) => {
                    debug!(attempt, code = %entity.code, "room code collision; drawing another");
                }
                Err(source) => return Err(query_error("create_room")(source).into()),
            }
        }

        let entity = inserted.ok_or(StorageError::CodeSpaceExhausted(ROOM_CODE_ATTEMPTS))?;

        self.players()
            .await
            .insert_one(MongoPlayerDocument::joining(
                entity.id,
                room.creator_id,
                room.creator_pseudo,
                true,
            ))
            .await
            .map_err(query_error("create_room"))?;

        for label in room.categories {
            self.add_category(entity.id, label).await?;
        }

        Ok(entity)
    }

    async fn find_room_where(&self, filter: Document) -> StorageResult<Option<RoomEntity>> {
        let document = self
            .rooms()
            .await
            .find_one(filter)
            .await
            .map_err(query_error("find_room"))?;
        Ok(document.map(Into::into))
    }

    async fn require_room(&self, room_id: RoomId) -> StorageResult<MongoRoomDocument> {
        self.rooms()
            .await
            .find_one(doc! {"_id": room_id})
            .await
            .map_err(query_error("find_room"))?
            .ok_or(StorageError::RoomNotFound(room_id))
    }

    async fn set_room_status(&self, id: RoomId, status: RoomStatus) -> StorageResult<()> {
        let result = self
            .rooms()
            .await
            .update_one(
                doc! {"_id": id},
                doc! {"$set": {"status": status_label(status)}},
            )
            .await
            .map_err(query_error("set_room_status"))?;
        if result.matched_count == 0 {
            return Err(StorageError::RoomNotFound(id));
        }
        Ok(())
    }

    async fn list_players(&self, room_id: RoomId) -> StorageResult<Vec<RoomPlayerEntity>> {
        let documents: Vec<MongoPlayerDocument> = self
            .players()
            .await
            .find(doc! {"room_id": room_id})
            .sort(doc! {"joined_at": 1})
            .await
            .map_err(query_error("list_players"))?
            .try_collect()
            .await
            .map_err(query_error("list_players"))?;
        Ok(documents.into_iter().map(Into::into).collect())
    }

    async fn find_player(
        &self,
        room_id: RoomId,
        user_id: UserId,
    ) -> StorageResult<Option<RoomPlayerEntity>> {
        let document = self
            .players()
            .await
            .find_one(doc! {"room_id": room_id, "user_id": user_id})
            .await
            .map_err(query_error("find_player"))?;
        Ok(document.map(Into::into))
    }

    async fn add_player(
        &self,
        room_id: RoomId,
        user_id: UserId,
        pseudo: String,
    ) -> StorageResult<RoomPlayerEntity> {
        let room = self.require_room(room_id).await?;
        let players = self.players().await;
        let count = players
            .count_documents(doc! {"room_id": room_id})
            .await
            .map_err(query_error("add_player"))?;
        if count >= u64::from(room.max_players) {
            return Err(StorageError::RoomFull(room_id));
        }

        let document = MongoPlayerDocument::joining(room_id, user_id, pseudo, false);
        match players.insert_one(&document).await {
            Ok(_) => Ok(document.into()),
            Err(err) if is_duplicate_key(&err) => {
                Err(StorageError::AlreadyInRoom { room_id, user_id })
            }
            Err(source) => Err(query_error("add_player")(source).into()),
        }
    }

    async fn remove_player(
        &self,
        room_id: RoomId,
        user_id: UserId,
    ) -> StorageResult<Option<RoomPlayerEntity>> {
        let removed = self
            .players()
            .await
            .find_one_and_delete(doc! {"room_id": room_id, "user_id": user_id})
            .await
            .map_err(query_error("remove_player"))?;
        Ok(removed.map(Into::into))
    }

    async fn update_player(
        &self,
        room_id: RoomId,
        user_id: UserId,
        update: Document,
        operation: &'static str,
    ) -> StorageResult<()> {
        let result = self
            .players()
            .await
            .update_one(doc! {"room_id": room_id, "user_id": user_id}, update)
            .await
            .map_err(query_error(operation))?;
        if result.matched_count == 0 {
            return Err(StorageError::PlayerNotFound { room_id, user_id });
        }
        Ok(())
    }

    async fn list_categories(&self, room_id: RoomId) -> StorageResult<Vec<CategoryEntity>> {
        let documents: Vec<MongoCategoryDocument> = self
            .categories()
            .await
            .find(doc! {"room_id": room_id})
            .sort(doc! {"position": 1, "_id": 1})
            .await
            .map_err(query_error("list_categories"))?
            .try_collect()
            .await
            .map_err(query_error("list_categories"))?;
        Ok(documents.into_iter().map(Into::into).collect())
    }

    async fn add_category(&self, room_id: RoomId, label: String) -> StorageResult<CategoryEntity> {
        let position = self
            .list_categories(room_id)
            .await?
            .iter()
            .map(|c| c.position + 1)
            .max()
            .unwrap_or(0);

        let document = MongoCategoryDocument {
            id: self.next_id(CATEGORY_SEQUENCE).await?,
            room_id,
            label_key: label.to_lowercase(),
            label,
            position,
        };

        match self.categories().await.insert_one(&document).await {
            Ok(_) => Ok(document.into()),
            Err(err) if is_duplicate_key(&err) => Err(StorageError::DuplicateCategory(document.label)),
            Err(source) => Err(query_error("add_category")(source).into()),
        }
    }

    async fn rename_category(
        &self,
        room_id: RoomId,
        category_id: CategoryId,
        label: String,
    ) -> StorageResult<()> {
        let update = doc! {"$set": {"label": label.as_str(), "label_key": label.to_lowercase()}};
        match self
            .categories()
            .await
            .update_one(doc! {"_id": category_id, "room_id": room_id}, update)
            .await
        {
            Ok(result) if result.matched_count == 0 => {
                Err(StorageError::CategoryNotFound(category_id))
            }
            Ok(_) => Ok(()),
            Err(err) if is_duplicate_key(&err) => Err(StorageError::DuplicateCategory(label)),
            Err(source) => Err(query_error("rename_category")(source).into()),
        }
    }

    async fn delete_category(&self, room_id: RoomId, category_id: CategoryId) -> StorageResult<()> {
        let result = self
            .categories()
            .await
            .delete_one(doc! {"_id": category_id, "room_id": room_id})
            .await
            .map_err(query_error("delete_category"))?;
        if result.deleted_count == 0 {
            return Err(StorageError::CategoryNotFound(category_id));
        }
        Ok(())
    }

    async fn set_playlist_choice(&self, room_id: RoomId, choice: String) -> StorageResult<()> {
        let result = self
            .rooms()
            .await
            .update_one(
                doc! {"_id": room_id},
                doc! {"$set": {"playlist_choice": choice}},
            )
            .await
            .map_err(query_error("set_playlist_choice"))?;
        if result.matched_count == 0 {
            return Err(StorageError::RoomNotFound(room_id));
        }
        Ok(())
    }
}

impl RoomStore for MongoRoomStore {
    fn create_room(&self, room: NewRoom) -> BoxFuture<'static, StorageResult<RoomEntity>> {
        let store = self.clone();
        Box::pin(async move { store.create_room(room).await })
    }

    fn find_room_by_code(
        &self,
        code: String,
    ) -> BoxFuture<'static, StorageResult<Option<RoomEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_room_where(doc! {"code": code}).await })
    }

    fn find_room(&self, id: RoomId) -> BoxFuture<'static, StorageResult<Option<RoomEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_room_where(doc! {"_id": id}).await })
    }

    fn set_room_status(
        &self,
        id: RoomId,
        status: RoomStatus,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.set_room_status(id, status).await })
    }

    fn list_players(
        &self,
        room_id: RoomId,
    ) -> BoxFuture<'static, StorageResult<Vec<RoomPlayerEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_players(room_id).await })
    }

    fn find_player(
        &self,
        room_id: RoomId,
        user_id: UserId,
    ) -> BoxFuture<'static, StorageResult<Option<RoomPlayerEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_player(room_id, user_id).await })
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
        Box::pin(async move { store.remove_player(room_id, user_id).await })
    }

    fn set_player_ready(
        &self,
        room_id: RoomId,
        user_id: UserId,
        ready: bool,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .update_player(
                    room_id,
                    user_id,
                    doc! {"$set": {"is_ready": ready}},
                    "set_player_ready",
                )
                .await
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
            store
                .update_player(room_id, user_id, doc! {"$inc": {"score": delta}}, "add_score")
                .await
        })
    }

    fn list_categories(
        &self,
        room_id: RoomId,
    ) -> BoxFuture<'static, StorageResult<Vec<CategoryEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_categories(room_id).await })
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
        Box::pin(async move { Ok(store.require_room(room_id).await?.playlist_choice) })
    }

    fn set_playlist_choice(
        &self,
        room_id: RoomId,
        choice: String,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.set_playlist_choice(room_id, choice).await })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
