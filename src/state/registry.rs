use std::sync::Arc;

use dashmap::{DashMap, mapref::entry::Entry};
use tracing::info;

use crate::{
    dao::models::{RoomId, RoomType},
    state::{blindtest::BlindTestGame, petitbac::PetitBacGame},
};

/// Engine installed for a room.
#[derive(Clone)]
pub enum ActiveGame {
    /// Music guessing engine.
    BlindTest(Arc<BlindTestGame>),
    /// Category word game engine.
    PetitBac(Arc<PetitBacGame>),
}

impl ActiveGame {
    /// Shut the engine down so it can never advance, score or publish again.
    pub fn stop(&self) {
        match self {
            ActiveGame::BlindTest(game) => game.stop(),
            ActiveGame::PetitBac(game) => game.stop(),
        }
    }

    /// Game mode the engine plays.
    pub fn room_type(&self) -> RoomType {
        match self {
            ActiveGame::BlindTest(_) => RoomType::BlindTest,
            ActiveGame::PetitBac(_) => RoomType::PetitBac,
        }
    }
}

/// At most one engine per room. Structural changes lock a single map shard; each engine
/// guards its own state.
#[derive(Default)]
pub struct GameRegistry {
    games: DashMap<RoomId, ActiveGame>,
}

impl GameRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine installed for `room_id`; lookup only.
    pub fn get(&self, room_id: RoomId) -> Option<ActiveGame> {
        self.games.get(&room_id).map(|entry| entry.value().clone())
    }

    /// Stop the room's current engine, if any, and install `game` in its place.
    ///
    /// The room's slot stays locked only for the swap; fetching, starting and broadcasting
    /// belong before or after this call.
    pub fn start_or_replace(&self, room_id: RoomId, game: ActiveGame) {
        match self.games.entry(room_id) {
            Entry::Occupied(mut slot) => {
                slot.get().stop();
                info!(room_id, room_type = ?game.room_type(), "replacing active game");
                slot.insert(game);
            }
            Entry::Vacant(slot) => {
                info!(room_id, room_type = ?game.room_type(), "installing game");
                slot.insert(game);
            }
        }
    }

    /// Installed engine when it is a blind-test.
    pub fn blindtest(&self, room_id: RoomId) -> Option<Arc<BlindTestGame>> {
        match self.get(room_id)? {
            ActiveGame::BlindTest(game) => Some(game),
            ActiveGame::PetitBac(_) => None,
        }
    }

    /// Installed engine when it is a petit-bac.
    pub fn petitbac(&self, room_id: RoomId) -> Option<Arc<PetitBacGame>> {
        match self.get(room_id)? {
            ActiveGame::PetitBac(game) => Some(game),
            ActiveGame::BlindTest(_) => None,
        }
    }
}
