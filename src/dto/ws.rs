use serde::Serialize;

use crate::dao::models::RoomId;
use crate::dto::room::{PlayerSummary, RoomSummary};

/// Every event a room hub can deliver to its viewers, encoded as `{"type": ..., "payload": ...}`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum RoomMessage {
    /// A blind-test round began; carries the audio only.
    RoundStarted(RoundStartedPayload),
    RoundReveal(RoundRevealPayload),
    BlindtestFinished,
    PetitbacRoundStarted(PetitBacRoundStartedPayload),
    /// Viewers should refetch room state.
    RoomUpdated(RoomRefPayload),
    PlayerLeft(PlayerLeftPayload),
    /// First message on a fresh viewer connection.
    RoomSnapshot(RoomSnapshotPayload),
}

/// A blind-test round opened; the answer is withheld until the reveal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoundStartedPayload {
    pub room_id: RoomId,
    pub round: u32,
    pub total_rounds: u32,
    /// Deadline, in Unix seconds.
    pub ends_at_unix: i64,
    /// Audio clip to play.
    pub preview_url: String,
}

/// Answer of the round that just closed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoundRevealPayload {
    pub title: String,
    pub artist: String,
}

/// A petit-bac round opened with `letter`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PetitBacRoundStartedPayload {
    pub room_id: RoomId,
    pub round: u32,
    pub total_rounds: u32,
    pub ends_at_unix: i64,
    pub letter: String,
}

/// Payload naming a room only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoomRefPayload {
    pub room_id: RoomId,
}

/// A member left the room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerLeftPayload {
    pub room_id: RoomId,
    pub pseudo: String,
}

/// Full room view sent to a viewer right after it connects.
#[derive(Debug, Clone, Serialize)]
pub struct RoomSnapshotPayload {
    pub room: RoomSummary,
    pub players: Vec<PlayerSummary>,
}

impl RoomMessage {
    /// Signal viewers to refetch the room.
    pub fn room_updated(room_id: RoomId) -> Self {
        Self::RoomUpdated(RoomRefPayload { room_id })
    }

    /// A member left the room.
    pub fn player_left(room_id: RoomId, pseudo: String) -> Self {
        Self::PlayerLeft(PlayerLeftPayload { room_id, pseudo })
    }
}
