//! Room lifecycle: creation, membership and readiness.

use std::sync::Arc;

use tracing::info;

use crate::{
    dao::{
        models::{
            DEFAULT_PETIT_BAC_CATEGORIES, NewRoom, RoomEntity, RoomPlayerEntity, RoomType, UserId,
            canonical_room_code, sort_scoreboard,
        },
        room_store::RoomStore,
    },
    dto::{
        room::{ActionResponse, CreateRoomRequest, PlayerSummary, RoomSummary},
        ws::RoomMessage,
    },
    error::ServiceError,
    state::SharedState,
};

/// Open a room with the caller as its admin.
pub async fn create_room(
    state: &SharedState,
    user_id: UserId,
    request: CreateRoomRequest,
) -> Result<RoomSummary, ServiceError> {
    let store = state.require_room_store().await?;
    let categories = match request.room_type {
        RoomType::PetitBac => DEFAULT_PETIT_BAC_CATEGORIES
            .iter()
            .map(|label| label.to_string())
            .collect(),
        RoomType::BlindTest => Vec::new(),
    };

    let room = store
        .create_room(NewRoom {
            room_type: request.room_type,
            creator_id: user_id,
            creator_pseudo: request.pseudo.trim().to_string(),
            max_players: request.max_players,
            time_per_round_secs: request.time_per_round,
            rounds: request.rounds,
            categories,
        })
        .await?;

    info!(room_id = room.id, code = %room.code, user_id, room_type = ?room.room_type, "room created");
    Ok(room.into())
}

/// Look a room up by code.
pub async fn get_room(state: &SharedState, code: &str) -> Result<RoomSummary, ServiceError> {
    let store = state.require_room_store().await?;
    Ok(require_room(&store, code).await?.into())
}

/// Add the caller to the room and tell viewers to refresh.
pub async fn join_room(
    state: &SharedState,
    code: &str,
    user_id: UserId,
    pseudo: String,
) -> Result<RoomSummary, ServiceError> {
    let store = state.require_room_store().await?;
    let room = require_room(&store, code).await?;
    store
        .add_player(room.id, user_id, pseudo.trim().to_string())
        .await?;

    info!(room_id = room.id, user_id, "player joined room");
    state.hub(room.id).publish(&RoomMessage::room_updated(room.id));
    Ok(room.into())
}

/// Remove the caller from the room, announcing who left.
pub async fn leave_room(
    state: &SharedState,
    code: &str,
    user_id: UserId,
) -> Result<ActionResponse, ServiceError> {
    let store = state.require_room_store().await?;
    let room = require_room(&store, code).await?;
    let removed = store
        .remove_player(room.id, user_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound("you are not a member of this room".into()))?;

    info!(room_id = room.id, user_id, "player left room");
    let hub = state.hub(room.id);
    hub.publish(&RoomMessage::room_updated(room.id));
    hub.publish(&RoomMessage::player_left(room.id, removed.pseudo));
    Ok(ActionResponse::ok())
}

/// Toggle the caller's ready flag.
pub async fn set_ready(
    state: &SharedState,
    code: &str,
    user_id: UserId,
    ready: bool,
) -> Result<ActionResponse, ServiceError> {
    let store = state.require_room_store().await?;
    let room = require_room(&store, code).await?;
    store.set_player_ready(room.id, user_id, ready).await?;

    state.hub(room.id).publish(&RoomMessage::room_updated(room.id));
    Ok(ActionResponse::ok())
}

/// Members in scoreboard order.
pub async fn list_players(
    state: &SharedState,
    code: &str,
) -> Result<Vec<PlayerSummary>, ServiceError> {
    let store = state.require_room_store().await?;
    let room = require_room(&store, code).await?;
    let players = scoreboard(&store, &room).await?;
    Ok(players.into_iter().map(PlayerSummary::from).collect())
}

pub(crate) async fn require_room(
    store: &Arc<dyn RoomStore>,
    code: &str,
) -> Result<RoomEntity, ServiceError> {
    let code = canonical_room_code(code);
    store
        .find_room_by_code(code.clone())
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("room `{code}` not found")))
}

pub(crate) async fn require_member(
    store: &Arc<dyn RoomStore>,
    room: &RoomEntity,
    user_id: UserId,
) -> Result<RoomPlayerEntity, ServiceError> {
    store
        .find_player(room.id, user_id)
        .await?
        .ok_or_else(|| ServiceError::Forbidden("you are not a member of this room".into()))
}

pub(crate) async fn require_admin(
    store: &Arc<dyn RoomStore>,
    room: &RoomEntity,
    user_id: UserId,
) -> Result<(), ServiceError> {
    if require_member(store, room, user_id).await?.is_admin {
        Ok(())
    } else {
        Err(ServiceError::Forbidden("room admin only".into()))
    }
}

pub(crate) fn require_room_type(room: &RoomEntity, expected: RoomType) -> Result<(), ServiceError> {
    if room.room_type == expected {
        Ok(())
    } else {
        Err(ServiceError::InvalidInput(format!(
            "room `{}` is not a {expected:?} room",
            room.code
        )))
    }
}

pub(crate) async fn scoreboard(
    store: &Arc<dyn RoomStore>,
    room: &RoomEntity,
) -> Result<Vec<RoomPlayerEntity>, ServiceError> {
    let mut players = store.list_players(room.id).await?;
    sort_scoreboard(&mut players);
    Ok(players)
}

#[cfg(test)]
mod tests {
    use crate::{
        dao::models::RoomStatus,
        services::test_support::{degraded_state, test_state},
        state::test_support::next_message,
    };

    use super::*;

    fn request(room_type: RoomType) -> CreateRoomRequest {
        CreateRoomRequest {
            pseudo: " alice ".into(),
            room_type,
            max_players: 2,
            time_per_round: 30,
            rounds: 3,
        }
    }

    #[tokio::test]
    async fn creator_becomes_admin_and_petit_bac_gets_default_categories() {
        let state = test_state().await;
        let room = create_room(&state, 1, request(RoomType::PetitBac))
            .await
            .unwrap();
        assert_eq!(room.status, RoomStatus::Lobby);

        let store = state.require_room_store().await.unwrap();
        let creator = store.find_player(room.id, 1).await.unwrap().unwrap();
        assert!(creator.is_admin);
        assert_eq!(creator.pseudo, "alice");
        let categories = store.list_categories(room.id).await.unwrap();
        assert_eq!(categories.len(), DEFAULT_PETIT_BAC_CATEGORIES.len());
    }

    #[tokio::test]
    async fn codes_are_looked_up_case_insensitively() {
        let state = test_state().await;
        let room = create_room(&state, 1, request(RoomType::BlindTest))
            .await
            .unwrap();

        let lowered = format!("  {} ", room.code.to_lowercase());
        assert_eq!(get_room(&state, &lowered).await.unwrap().id, room.id);
        assert!(matches!(
            get_room(&state, "ZZZZZ1").await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn join_enforces_capacity_and_uniqueness() {
        let state = test_state().await;
        let room = create_room(&state, 1, request(RoomType::BlindTest))
            .await
            .unwrap();

        assert!(matches!(
            join_room(&state, &room.code, 1, "again".into()).await,
            Err(ServiceError::InvalidState(_))
        ));
        join_room(&state, &room.code, 2, "bob".into()).await.unwrap();
        assert!(matches!(
            join_room(&state, &room.code, 3, "carol".into()).await,
            Err(ServiceError::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn leaving_announces_the_pseudo() {
        let state = test_state().await;
        let room = create_room(&state, 1, request(RoomType::BlindTest))
            .await
            .unwrap();
        join_room(&state, &room.code, 2, "bob".into()).await.unwrap();
        let mut viewer = state.hub(room.id).subscribe();

        leave_room(&state, &room.code, 2).await.unwrap();

        assert_eq!(next_message(&mut viewer).await["type"], "room_updated");
        let left = next_message(&mut viewer).await;
        assert_eq!(left["type"], "player_left");
        assert_eq!(left["payload"]["pseudo"], "bob");
        assert!(matches!(
            leave_room(&state, &room.code, 2).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn players_are_listed_in_scoreboard_order() {
        let state = test_state().await;
        let mut wide = request(RoomType::BlindTest);
        wide.max_players = 4;
        let room = create_room(&state, 1, wide).await.unwrap();
        join_room(&state, &room.code, 2, "bob".into()).await.unwrap();
        join_room(&state, &room.code, 3, "carol".into()).await.unwrap();
        let store = state.require_room_store().await.unwrap();
        store.add_score(room.id, 3, 10).await.unwrap();
        set_ready(&state, &room.code, 2, true).await.unwrap();

        let players = list_players(&state, &room.code).await.unwrap();
        let order: Vec<&str> = players.iter().map(|p| p.pseudo.as_str()).collect();
        assert_eq!(order, ["carol", "alice", "bob"]);
        assert!(players[2].is_ready);
    }

    #[tokio::test]
    async fn degraded_state_rejects_room_operations() {
        let state = degraded_state();
        assert!(matches!(
            create_room(&state, 1, request(RoomType::BlindTest)).await,
            Err(ServiceError::Degraded)
        ));
    }
}
