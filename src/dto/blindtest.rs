use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    dao::models::{RoomId, RoomType},
    dto::phase::VisibleBlindTestPhase,
};

/// Playlists a blind-test room can be configured with.
pub const PLAYLIST_OPTIONS: [&str; 3] = ["Rock", "Rap", "Pop"];

/// Canonical playlist name for a case-insensitive choice.
pub fn canonical_playlist(choice: &str) -> Option<&'static str> {
    let choice = choice.trim();
    PLAYLIST_OPTIONS
        .iter()
        .copied()
        .find(|option| option.eq_ignore_ascii_case(choice))
}

/// A player's guess for the current track.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct GuessRequest {
    #[validate(length(min = 1, max = 200))]
    pub guess: String,
}

/// Result of a guess submission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct GuessResponse {
    pub correct: bool,
    pub points_awarded: u32,
    /// The round is not accepting guesses.
    pub locked: bool,
    /// The player has used this round's attempt.
    pub already_tried: bool,
}

impl GuessResponse {
    /// Response for a guess that arrived outside an open round.
    pub fn locked() -> Self {
        Self {
            locked: true,
            ..Self::default()
        }
    }

    /// Response for a second attempt in the same round.
    pub fn already_tried() -> Self {
        Self {
            already_tried: true,
            ..Self::default()
        }
    }
}

/// Per-user view of a blind-test. The answer is only present once revealed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct BlindTestStateResponse {
    pub phase: VisibleBlindTestPhase,
    pub round: u32,
    pub total_rounds: u32,
    pub ends_at_unix: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_url: Option<String>,
    pub already_tried: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
}

impl BlindTestStateResponse {
    /// View returned when the room has no running engine.
    pub fn idle(total_rounds: u32) -> Self {
        Self {
            phase: VisibleBlindTestPhase::Idle,
            round: 0,
            total_rounds,
            ends_at_unix: 0,
            preview_url: None,
            already_tried: false,
            title: None,
            artist: None,
        }
    }
}

/// Admin choice of playlist for a blind-test room.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct PlaylistRequest {
    #[validate(length(min = 1, max = 32))]
    pub playlist: String,
}

/// Current playlist choice and the allowed values.
#[derive(Debug, Serialize, ToSchema)]
pub struct PlaylistResponse {
    pub playlist: Option<String>,
    pub options: Vec<String>,
}

impl PlaylistResponse {
    /// Wrap the stored choice together with the allowed values.
    pub fn new(playlist: Option<String>) -> Self {
        Self {
            playlist,
            options: PLAYLIST_OPTIONS.iter().map(|p| p.to_string()).collect(),
        }
    }
}

/// Acknowledgement returned once an engine has been installed and started.
#[derive(Debug, Serialize, ToSchema)]
pub struct GameStartedResponse {
    pub room_id: RoomId,
    pub room_type: RoomType,
    pub total_rounds: u32,
}
