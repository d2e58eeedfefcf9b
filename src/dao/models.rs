use std::time::SystemTime;

use rand::Rng;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Identifier of a room, allocated by the store.
pub type RoomId = i64;
/// Identifier of a user, supplied by the session layer.
pub type UserId = i64;
/// Identifier of a petit-bac category, allocated by the store.
pub type CategoryId = i64;

/// Characters allowed in room codes; ambiguous glyphs (0/O, 1/I) are left out.
pub const ROOM_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
/// Length of a room code.
pub const ROOM_CODE_LENGTH: usize = 6;
/// How many fresh codes a store tries before giving up on a collision streak.
pub const ROOM_CODE_ATTEMPTS: usize = 20;

/// Categories seeded into every new petit-bac room.
pub const DEFAULT_PETIT_BAC_CATEGORIES: [&str; 5] = [
    "Artiste",
    "Album",
    "Groupe de musique",
    "Instrument de musique",
    "Featuring",
];

/// Game mode hosted by a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum RoomType {
    /// Music guessing rounds.
    #[serde(rename = "blindtest")]
    BlindTest,
    /// Word-category rounds with peer validation.
    #[serde(rename = "petit_bac")]
    PetitBac,
}

/// Lifecycle status of a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    /// Players are gathering.
    #[default]
    Lobby,
    /// An engine is running rounds.
    InGame,
    /// The last engine reached its terminal phase.
    Finished,
}

/// Persisted room definition. Everything but `status` is immutable after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomEntity {
    pub id: RoomId,
    pub code: String,
    pub room_type: RoomType,
    pub creator_id: UserId,
    pub max_players: u32,
    pub time_per_round_secs: u32,
    pub rounds: u32,
    pub status: RoomStatus,
    pub created_at: SystemTime,
}

/// Input for [`RoomStore::create_room`](crate::dao::room_store::RoomStore::create_room).
///
/// The creator is inserted as the room admin and `categories` are seeded in order, both in the
/// same store operation as the room itself.
#[derive(Debug, Clone)]
pub struct NewRoom {
    pub room_type: RoomType,
    pub creator_id: UserId,
    pub creator_pseudo: String,
    pub max_players: u32,
    pub time_per_round_secs: u32,
    pub rounds: u32,
    pub categories: Vec<String>,
}

/// Membership record for a user inside a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomPlayerEntity {
    pub user_id: UserId,
    pub pseudo: String,
    pub is_admin: bool,
    pub is_ready: bool,
    pub score: i64,
}

/// Petit-bac category configured for a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryEntity {
    pub id: CategoryId,
    pub label: String,
    pub position: u32,
}

/// Draw a random room code. Uniqueness is the caller's concern.
pub fn generate_room_code() -> String {
    let mut rng = rand::rng();
    (0..ROOM_CODE_LENGTH)
        .map(|_| char::from(ROOM_CODE_ALPHABET[rng.random_range(0..ROOM_CODE_ALPHABET.len())]))
        .collect()
}

/// Canonical form used for code lookups (trimmed, upper-cased).
pub fn canonical_room_code(input: &str) -> String {
    input.trim().to_uppercase()
}

/// Scoreboard order: score descending, then pseudo ascending.
pub fn sort_scoreboard(players: &mut [RoomPlayerEntity]) {
    players.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.pseudo.cmp(&b.pseudo)));
}
