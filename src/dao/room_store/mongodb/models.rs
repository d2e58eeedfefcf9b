use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};

use crate::dao::models::{
    CategoryEntity, CategoryId, RoomEntity, RoomId, RoomPlayerEntity, RoomStatus, RoomType, UserId,
};

/// Stored room, keyed by its numeric id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoRoomDocument {
    #[serde(rename = "_id")]
    pub id: RoomId,
    pub code: String,
    pub room_type: RoomType,
    pub creator_id: UserId,
    pub max_players: u32,
    pub time_per_round_secs: u32,
    pub rounds: u32,
    pub status: RoomStatus,
    pub created_at: DateTime,
    #[serde(default)]
    pub playlist_choice: Option<String>,
}

impl From<RoomEntity> for MongoRoomDocument {
    fn from(value: RoomEntity) -> Self {
        Self {
            id: value.id,
            code: value.code,
            room_type: value.room_type,
            creator_id: value.creator_id,
            max_players: value.max_players,
            time_per_round_secs: value.time_per_round_secs,
            rounds: value.rounds,
            status: value.status,
            created_at: DateTime::from_system_time(value.created_at),
            playlist_choice: None,
        }
    }
}

impl From<MongoRoomDocument> for RoomEntity {
    fn from(value: MongoRoomDocument) -> Self {
        Self {
            id: value.id,
            code: value.code,
            room_type: value.room_type,
            creator_id: value.creator_id,
            max_players: value.max_players,
            time_per_round_secs: value.time_per_round_secs,
            rounds: value.rounds,
            status: value.status,
            created_at: value.created_at.to_system_time(),
        }
    }
}

/// One membership per document; `(room_id, user_id)` carries a unique index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoPlayerDocument {
    pub room_id: RoomId,
    pub user_id: UserId,
    pub pseudo: String,
    pub is_admin: bool,
    pub is_ready: bool,
    pub score: i64,
    pub joined_at: DateTime,
}

impl MongoPlayerDocument {
    /// Membership document for a player joining with a zero score.
    pub fn joining(room_id: RoomId, user_id: UserId, pseudo: String, is_admin: bool) -> Self {
        Self {
            room_id,
            user_id,
            pseudo,
            is_admin,
            is_ready: false,
            score: 0,
            joined_at: DateTime::now(),
        }
    }
}

impl From<MongoPlayerDocument> for RoomPlayerEntity {
    fn from(value: MongoPlayerDocument) -> Self {
        Self {
            user_id: value.user_id,
            pseudo: value.pseudo,
            is_admin: value.is_admin,
            is_ready: value.is_ready,
            score: value.score,
        }
    }
}

/// `label_key` is the lower-cased label; `(room_id, label_key)` carries a unique index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoCategoryDocument {
    #[serde(rename = "_id")]
    pub id: CategoryId,
    pub room_id: RoomId,
    pub label: String,
    pub label_key: String,
    pub position: u32,
}

impl From<MongoCategoryDocument> for CategoryEntity {
    fn from(value: MongoCategoryDocument) -> Self {
        Self {
            id: value.id,
            label: value.label,
            position: value.position,
        }
    }
}

/// Sequence counter handing out numeric ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CounterDocument {
    #[serde(rename = "_id")]
    pub name: String,
    pub seq: i64,
}

/// Stored string form of a room status.
pub fn status_label(status: RoomStatus) -> &'static str {
    match status {
        RoomStatus::Lobby => "lobby",
        RoomStatus::InGame => "in_game",
        RoomStatus::Finished => "finished",
    }
}
