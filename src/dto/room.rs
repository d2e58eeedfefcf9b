use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::dao::models::{RoomEntity, RoomId, RoomPlayerEntity, RoomStatus, RoomType, UserId};
use crate::dto::{format_system_time, validation::validate_not_blank};

/// Payload used to open a new room; the caller becomes its admin.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateRoomRequest {
    #[validate(length(min = 1, max = 32), custom(function = "validate_not_blank"))]
    pub pseudo: String,
    pub room_type: RoomType,
    #[validate(range(min = 2, max = 10))]
    pub max_players: u32,
    /// Seconds per round.
    #[validate(range(min = 20, max = 120))]
    pub time_per_round: u32,
    #[validate(range(min = 1, max = 20))]
    pub rounds: u32,
}

/// Payload used to join a room by code.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct JoinRoomRequest {
    #[validate(length(min = 1, max = 32), custom(function = "validate_not_blank"))]
    pub pseudo: String,
}

/// Body of the ready toggle.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ReadyRequest {
    pub ready: bool,
}

/// Public room description.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RoomSummary {
    pub id: RoomId,
    pub code: String,
    pub room_type: RoomType,
    pub creator_id: UserId,
    pub max_players: u32,
    pub time_per_round: u32,
    pub rounds: u32,
    pub status: RoomStatus,
    pub created_at: String,
}

impl From<RoomEntity> for RoomSummary {
    fn from(room: RoomEntity) -> Self {
        Self {
            id: room.id,
            code: room.code,
            room_type: room.room_type,
            creator_id: room.creator_id,
            max_players: room.max_players,
            time_per_round: room.time_per_round_secs,
            rounds: room.rounds,
            status: room.status,
            created_at: format_system_time(room.created_at),
        }
    }
}

/// Scoreboard entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct PlayerSummary {
    pub user_id: UserId,
    pub pseudo: String,
    pub is_admin: bool,
    pub is_ready: bool,
    pub score: i64,
}

impl From<RoomPlayerEntity> for PlayerSummary {
    fn from(player: RoomPlayerEntity) -> Self {
        Self {
            user_id: player.user_id,
            pseudo: player.pseudo,
            is_admin: player.is_admin,
            is_ready: player.is_ready,
            score: player.score,
        }
    }
}

/// Generic acknowledgement for mutations without a richer payload.
#[derive(Debug, Serialize, ToSchema)]
pub struct ActionResponse {
    pub status: String,
}

impl ActionResponse {
    /// Plain success acknowledgement.
    pub fn ok() -> Self {
        Self {
            status: "ok".into(),
        }
    }
}
