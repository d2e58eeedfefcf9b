//! Game orchestration: installing engines and routing player actions to them.

use tracing::{info, warn};

use crate::{
    dao::models::{RoomStatus, RoomType, UserId},
    dto::{
        blindtest::{BlindTestStateResponse, GameStartedResponse, GuessResponse},
        petitbac::{AnswerSheet, PetitBacStateResponse, VoteSheet},
        room::ActionResponse,
    },
    error::ServiceError,
    services::room_service::{
        require_admin, require_member, require_room, require_room_type, scoreboard,
    },
    state::{
        SharedState, blindtest::BlindTestGame, petitbac::PetitBacGame, registry::ActiveGame,
    },
};

/// Fetch a track pool for the room's playlist and start a fresh blind-test, replacing any
/// running engine. Nothing is installed when the fetch fails.
pub async fn start_blindtest(
    state: &SharedState,
    code: &str,
    user_id: UserId,
) -> Result<GameStartedResponse, ServiceError> {
    let store = state.require_room_store().await?;
    let room = require_room(&store, code).await?;
    require_admin(&store, &room, user_id).await?;
    require_room_type(&room, RoomType::BlindTest)?;

    let playlist = store
        .playlist_choice(room.id)
        .await?
        .ok_or_else(|| ServiceError::Configuration("no playlist chosen for this room".into()))?;
    let tracks = state.provider().fetch_tracks(playlist.clone()).await?;
    if tracks.is_empty() {
        return Err(ServiceError::Configuration(format!(
            "no playable tracks for `{playlist}`"
        )));
    }
    info!(room_id = room.id, %playlist, tracks = tracks.len(), "track pool fetched");

    store.set_room_status(room.id, RoomStatus::InGame).await?;
    let game = BlindTestGame::new(
        &room,
        tracks,
        state.hub(room.id),
        store.clone(),
        state.config().reveal_pause,
    );
    state
        .games()
        .start_or_replace(room.id, ActiveGame::BlindTest(game.clone()));
    game.begin().await;

    Ok(GameStartedResponse {
        room_id: room.id,
        room_type: room.room_type,
        total_rounds: room.rounds,
    })
}

/// Start a fresh petit-bac, replacing any running engine.
pub async fn start_petitbac(
    state: &SharedState,
    code: &str,
    user_id: UserId,
) -> Result<GameStartedResponse, ServiceError> {
    let store = state.require_room_store().await?;
    let room = require_room(&store, code).await?;
    require_admin(&store, &room, user_id).await?;
    require_room_type(&room, RoomType::PetitBac)?;

    if store.list_categories(room.id).await?.is_empty() {
        return Err(ServiceError::Configuration(
            "add at least one category before starting".into(),
        ));
    }

    store.set_room_status(room.id, RoomStatus::InGame).await?;
    let game = PetitBacGame::new(
        &room,
        state.hub(room.id),
        store.clone(),
        state.config().validation_window,
    );
    state
        .games()
        .start_or_replace(room.id, ActiveGame::PetitBac(game.clone()));
    game.begin().await;

    Ok(GameStartedResponse {
        room_id: room.id,
        room_type: room.room_type,
        total_rounds: room.rounds,
    })
}

/// Per-user blind-test view; `idle` until a game has been started.
pub async fn blindtest_state(
    state: &SharedState,
    code: &str,
    user_id: UserId,
) -> Result<BlindTestStateResponse, ServiceError> {
    let store = state.require_room_store().await?;
    let room = require_room(&store, code).await?;
    require_member(&store, &room, user_id).await?;

    match state.games().blindtest(room.id) {
        Some(game) => Ok(game.state_for_user(user_id).await),
        None => Ok(BlindTestStateResponse::idle(room.rounds)),
    }
}

/// Forward a guess to the running engine; `locked` when there is none.
pub async fn submit_guess(
    state: &SharedState,
    code: &str,
    user_id: UserId,
    guess: &str,
) -> Result<GuessResponse, ServiceError> {
    let store = state.require_room_store().await?;
    let room = require_room(&store, code).await?;
    require_member(&store, &room, user_id).await?;

    match state.games().blindtest(room.id) {
        Some(game) => Ok(game.submit_guess(user_id, guess).await),
        None => {
            warn!(room_id = room.id, user_id, "guess received without a running blind-test");
            Ok(GuessResponse::locked())
        }
    }
}

/// Caller's petit-bac view; an idle snapshot when no engine runs.
pub async fn petitbac_state(
    state: &SharedState,
    code: &str,
    user_id: UserId,
) -> Result<PetitBacStateResponse, ServiceError> {
    let store = state.require_room_store().await?;
    let room = require_room(&store, code).await?;
    require_member(&store, &room, user_id).await?;

    match state.games().petitbac(room.id) {
        Some(game) => Ok(game.state_for_user(user_id).await?),
        None => {
            let categories = store.list_categories(room.id).await?;
            let players = scoreboard(&store, &room).await?;
            Ok(PetitBacStateResponse::idle(room.rounds, categories, players))
        }
    }
}

/// Replace the caller's answer sheet on the running petit-bac.
pub async fn submit_answers(
    state: &SharedState,
    code: &str,
    user_id: UserId,
    answers: AnswerSheet,
) -> Result<ActionResponse, ServiceError> {
    let store = state.require_room_store().await?;
    let room = require_room(&store, code).await?;
    require_member(&store, &room, user_id).await?;

    let game = state
        .games()
        .petitbac(room.id)
        .ok_or_else(|| ServiceError::InvalidState("no petit-bac is running".into()))?;
    game.submit_answers(user_id, answers).await?;
    Ok(ActionResponse::ok())
}

/// Record the caller's votes on the running petit-bac.
pub async fn submit_votes(
    state: &SharedState,
    code: &str,
    user_id: UserId,
    votes: VoteSheet,
) -> Result<ActionResponse, ServiceError> {
    let store = state.require_room_store().await?;
    let room = require_room(&store, code).await?;
    require_member(&store, &room, user_id).await?;

    let game = state
        .games()
        .petitbac(room.id)
        .ok_or_else(|| ServiceError::InvalidState("no petit-bac is running".into()))?;
    game.submit_votes(user_id, votes).await?;
    Ok(ActionResponse::ok())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use crate::{
        dao::models::NewRoom,
        dto::phase::{VisibleBlindTestPhase, VisiblePetitBacPhase},
        services::test_support::{test_state, test_state_with_tracks},
        state::test_support::next_message,
    };

    use super::*;

    async fn room_of(state: &SharedState, room_type: RoomType, categories: &[&str]) -> String {
        let store = state.require_room_store().await.unwrap();
        let room = store
            .create_room(NewRoom {
                room_type,
                creator_id: 1,
                creator_pseudo: "alice".into(),
                max_players: 4,
                time_per_round_secs: 30,
                rounds: 2,
                categories: categories.iter().map(|c| c.to_string()).collect(),
            })
            .await
            .unwrap();
        store.add_player(room.id, 2, "bob".into()).await.unwrap();
        room.code
    }

    #[tokio::test(start_paused = true)]
    async fn blindtest_needs_a_playlist_and_an_admin() {
        let state = test_state().await;
        let code = room_of(&state, RoomType::BlindTest, &[]).await;

        assert!(matches!(
            start_blindtest(&state, &code, 1).await,
            Err(ServiceError::Configuration(_))
        ));
        let store = state.require_room_store().await.unwrap();
        let room = require_room(&store, &code).await.unwrap();
        store
            .set_playlist_choice(room.id, "Rock".into())
            .await
            .unwrap();
        assert!(matches!(
            start_blindtest(&state, &code, 2).await,
            Err(ServiceError::Forbidden(_))
        ));
        assert!(matches!(
            start_petitbac(&state, &code, 1).await,
            Err(ServiceError::InvalidInput(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_fetch_installs_nothing() {
        let state = test_state_with_tracks(Vec::new()).await;
        let code = room_of(&state, RoomType::BlindTest, &[]).await;
        let store = state.require_room_store().await.unwrap();
        let room = require_room(&store, &code).await.unwrap();
        store
            .set_playlist_choice(room.id, "Pop".into())
            .await
            .unwrap();

        assert!(matches!(
            start_blindtest(&state, &code, 1).await,
            Err(ServiceError::Configuration(_))
        ));
        assert!(state.games().get(room.id).is_none());
        let room = require_room(&store, &code).await.unwrap();
        assert_eq!(room.status, RoomStatus::Lobby);
    }

    #[tokio::test(start_paused = true)]
    async fn started_blindtest_accepts_guesses() {
        let state = test_state().await;
        let code = room_of(&state, RoomType::BlindTest, &[]).await;
        let store = state.require_room_store().await.unwrap();
        let room = require_room(&store, &code).await.unwrap();
        store
            .set_playlist_choice(room.id, "Rock".into())
            .await
            .unwrap();

        let idle = blindtest_state(&state, &code, 2).await.unwrap();
        assert_eq!(idle.phase, VisibleBlindTestPhase::Idle);
        assert!(submit_guess(&state, &code, 2, "queen").await.unwrap().locked);

        let mut viewer = state.hub(room.id).subscribe();
        let started = start_blindtest(&state, &code, 1).await.unwrap();
        assert_eq!(started.total_rounds, 2);
        assert_eq!(next_message(&mut viewer).await["type"], "round_started");

        let playing = blindtest_state(&state, &code, 2).await.unwrap();
        assert_eq!(playing.phase, VisibleBlindTestPhase::Playing);
        let room = require_room(&store, &code).await.unwrap();
        assert_eq!(room.status, RoomStatus::InGame);

        let first = submit_guess(&state, &code, 2, "nobody").await.unwrap();
        assert!(!first.locked && !first.correct);
        assert!(submit_guess(&state, &code, 2, "queen").await.unwrap().already_tried);
    }

    #[tokio::test(start_paused = true)]
    async fn petitbac_flow_goes_through_the_service() {
        let state = test_state().await;
        let code = room_of(&state, RoomType::PetitBac, &[]).await;

        assert!(matches!(
            start_petitbac(&state, &code, 1).await,
            Err(ServiceError::Configuration(_))
        ));
        assert!(matches!(
            submit_answers(&state, &code, 2, HashMap::new()).await,
            Err(ServiceError::InvalidState(_))
        ));

        let store = state.require_room_store().await.unwrap();
        let room = require_room(&store, &code).await.unwrap();
        let fruit = store.add_category(room.id, "Fruit".into()).await.unwrap();

        let idle = petitbac_state(&state, &code, 2).await.unwrap();
        assert_eq!(idle.phase, VisiblePetitBacPhase::Idle);
        assert_eq!(idle.categories.len(), 1);

        start_petitbac(&state, &code, 1).await.unwrap();
        submit_answers(&state, &code, 2, HashMap::from([(fruit.id, String::new())]))
            .await
            .unwrap();
        assert!(matches!(
            submit_votes(&state, &code, 2, HashMap::new()).await,
            Err(ServiceError::InvalidState(_))
        ));

        let playing = petitbac_state(&state, &code, 1).await.unwrap();
        assert_eq!(playing.phase, VisiblePetitBacPhase::Playing);
        assert!(playing.answers.is_empty());
        assert_eq!(playing.letter.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn restarting_replaces_the_engine() {
        let state = test_state().await;
        let code = room_of(&state, RoomType::PetitBac, &["Fruit"]).await;
        let store = state.require_room_store().await.unwrap();
        let room = require_room(&store, &code).await.unwrap();

        start_petitbac(&state, &code, 1).await.unwrap();
        let first = state.games().petitbac(room.id).unwrap();
        start_petitbac(&state, &code, 1).await.unwrap();
        let second = state.games().petitbac(room.id).unwrap();

        assert!(!std::sync::Arc::ptr_eq(&first, &second));
    }
}
