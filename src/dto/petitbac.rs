use std::collections::HashMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationErrors};

use crate::{
    dao::models::{CategoryEntity, CategoryId, RoomPlayerEntity, UserId},
    dto::{
        phase::VisiblePetitBacPhase,
        room::PlayerSummary,
        validation::{validate_answer_text, validate_not_blank},
    },
};

/// One player's answers for a round, keyed by category.
pub type AnswerSheet = HashMap<CategoryId, String>;
/// One voter's decisions: category, then target player, then accept/reject.
pub type VoteSheet = HashMap<CategoryId, HashMap<UserId, bool>>;
/// Every vote of a round: category, then target player, then voter.
pub type VoteGrid = HashMap<CategoryId, HashMap<UserId, HashMap<UserId, bool>>>;

/// Full answer sheet; replaces any previous submission for the round.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitAnswersRequest {
    #[schema(value_type = Object)]
    pub answers: AnswerSheet,
}

impl Validate for SubmitAnswersRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        for text in self.answers.values() {
            if let Err(e) = validate_answer_text(text) {
                errors.add("answers", e);
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Accept/reject decisions merged into the round's vote grid.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitVotesRequest {
    #[schema(value_type = Object)]
    pub votes: VoteSheet,
}

/// Admin payload to add or rename a category.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CategoryRequest {
    #[validate(length(min = 1, max = 64), custom(function = "validate_not_blank"))]
    pub label: String,
}

/// A category as listed to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct CategorySummary {
    pub id: CategoryId,
    pub label: String,
    pub position: u32,
}

impl From<CategoryEntity> for CategorySummary {
    fn from(category: CategoryEntity) -> Self {
        Self {
            id: category.id,
            label: category.label,
            position: category.position,
        }
    }
}

/// Per-user view of a petit-bac. While playing, `answers` holds only the caller's sheet.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PetitBacStateResponse {
    pub phase: VisiblePetitBacPhase,
    pub round: u32,
    pub total_rounds: u32,
    /// Unix seconds at which the current phase closes.
    pub ends_at: i64,
    pub letter: String,
    pub categories: Vec<CategorySummary>,
    #[schema(value_type = Object)]
    pub answers: HashMap<UserId, AnswerSheet>,
    #[schema(value_type = Object)]
    pub votes: VoteGrid,
    /// Scores in scoreboard order.
    #[schema(value_type = Object)]
    pub scores: IndexMap<UserId, i64>,
    pub players: Vec<PlayerSummary>,
}

impl PetitBacStateResponse {
    /// View of a room whose game has not started. `players` must already be in scoreboard order.
    pub fn idle(
        total_rounds: u32,
        categories: Vec<CategoryEntity>,
        players: Vec<RoomPlayerEntity>,
    ) -> Self {
        Self {
            phase: VisiblePetitBacPhase::Idle,
            round: 0,
            total_rounds,
            ends_at: 0,
            letter: String::new(),
            categories: categories.into_iter().map(CategorySummary::from).collect(),
            answers: HashMap::new(),
            votes: HashMap::new(),
            scores: scoreboard(&players),
            players: players.into_iter().map(PlayerSummary::from).collect(),
        }
    }
}

/// Scores keyed by user, preserving the order of `players`.
pub fn scoreboard(players: &[RoomPlayerEntity]) -> IndexMap<UserId, i64> {
    players
        .iter()
        .map(|player| (player.user_id, player.score))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answer_sheet_keys_decode_from_json_strings() {
        let request: SubmitAnswersRequest =
            serde_json::from_str(r#"{"answers":{"3":"Banane","4":""}}"#).unwrap();
        assert_eq!(request.answers.get(&3).map(String::as_str), Some("Banane"));
        assert!(request.validate().is_ok());
    }

    #[test]
    fn oversized_answers_are_rejected() {
        let request = SubmitAnswersRequest {
            answers: HashMap::from([(1, "x".repeat(500))]),
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn votes_decode_nested_maps() {
        let request: SubmitVotesRequest =
            serde_json::from_str(r#"{"votes":{"3":{"2":true,"4":false}}}"#).unwrap();
        assert!(!request.votes[&3][&4]);
        assert!(request.votes[&3][&2]);
    }

    #[test]
    fn snapshot_uses_camel_case_fields() {
        let snapshot = PetitBacStateResponse {
            phase: VisiblePetitBacPhase::Playing,
            round: 1,
            total_rounds: 2,
            ends_at: 10,
            letter: "B".into(),
            categories: Vec::new(),
            answers: HashMap::new(),
            votes: HashMap::new(),
            scores: IndexMap::new(),
            players: Vec::new(),
        };
        let value = serde_json::to_value(snapshot).unwrap();
        assert_eq!(value["totalRounds"], 2);
        assert_eq!(value["endsAt"], 10);
    }

    #[test]
    fn idle_view_keeps_scoreboard_order() {
        let player = |user_id, pseudo: &str, score| RoomPlayerEntity {
            user_id,
            pseudo: pseudo.into(),
            is_admin: false,
            is_ready: false,
            score,
        };
        let idle = PetitBacStateResponse::idle(
            3,
            vec![CategoryEntity {
                id: 1,
                label: "Fruit".into(),
                position: 0,
            }],
            vec![player(2, "bob", 5), player(1, "alice", 2)],
        );
        assert_eq!(idle.phase, VisiblePetitBacPhase::Idle);
        assert_eq!(idle.scores.keys().copied().collect::<Vec<_>>(), [2, 1]);
        assert_eq!(idle.categories[0].label, "Fruit");
    }
}
