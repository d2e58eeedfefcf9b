use serde::Serialize;
use utoipa::ToSchema;

use crate::state::{blindtest::BlindTestPhase, petitbac::PetitBacPhase};

/// Blind-test phase as exposed to clients.
#[derive(Debug, Serialize, ToSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VisibleBlindTestPhase {
    /// No round started yet, or no engine for the room.
    Idle,
    /// A track is playing and guesses are accepted.
    Playing,
    /// Title and artist are shown before the next round.
    Reveal,
    /// Every round has been played.
    Finished,
}

impl From<BlindTestPhase> for VisibleBlindTestPhase {
    fn from(value: BlindTestPhase) -> Self {
        match value {
            BlindTestPhase::Idle => VisibleBlindTestPhase::Idle,
            BlindTestPhase::Playing => VisibleBlindTestPhase::Playing,
            BlindTestPhase::Reveal => VisibleBlindTestPhase::Reveal,
            BlindTestPhase::Finished => VisibleBlindTestPhase::Finished,
        }
    }
}

/// Petit-bac phase as exposed to clients.
#[derive(Debug, Serialize, ToSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VisiblePetitBacPhase {
    /// No round started yet, or no engine for the room.
    Idle,
    /// Players fill in their answer sheets.
    Playing,
    /// Players vote on each other's answers.
    Validation,
    /// Every round has been tallied.
    Finished,
}

impl From<PetitBacPhase> for VisiblePetitBacPhase {
    fn from(value: PetitBacPhase) -> Self {
        match value {
            PetitBacPhase::Idle => VisiblePetitBacPhase::Idle,
            PetitBacPhase::Playing => VisiblePetitBacPhase::Playing,
            PetitBacPhase::Validation => VisiblePetitBacPhase::Validation,
            PetitBacPhase::Finished => VisiblePetitBacPhase::Finished,
        }
    }
}
