use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use axum_valid::Valid;

use crate::{
    dto::blindtest::{
        BlindTestStateResponse, GameStartedResponse, GuessRequest, GuessResponse,
        PlaylistRequest, PlaylistResponse,
    },
    error::AppError,
    routes::identity::CurrentUser,
    services::{game_service, room_config_service},
    state::SharedState,
};

/// Blind-test configuration and gameplay endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route(
            "/rooms/{code}/blindtest/playlist",
            get(get_playlist).put(set_playlist),
        )
        .route("/rooms/{code}/blindtest/start", post(start))
        .route("/rooms/{code}/blindtest/state", get(state_for_user))
        .route("/rooms/{code}/blindtest/guess", post(guess))
}

/// Current playlist choice.
#[utoipa::path(
    get,
    path = "/rooms/{code}/blindtest/playlist",
    tag = "blindtest",
    params(("code" = String, Path, description = "Room code")),
    responses((status = 200, description = "Playlist choice", body = PlaylistResponse))
)]
pub async fn get_playlist(
    State(state): State<SharedState>,
    CurrentUser(user_id): CurrentUser,
    Path(code): Path<String>,
) -> Result<Json<PlaylistResponse>, AppError> {
    let response = room_config_service::get_playlist(&state, &code, user_id).await?;
    Ok(Json(response))
}

/// Choose the playlist the next blind-test draws from (admin only).
#[utoipa::path(
    put,
    path = "/rooms/{code}/blindtest/playlist",
    tag = "blindtest",
    params(("code" = String, Path, description = "Room code")),
    request_body = PlaylistRequest,
    responses(
        (status = 200, description = "Playlist stored", body = PlaylistResponse),
        (status = 400, description = "Unknown playlist"),
        (status = 403, description = "Caller is not the room admin")
    )
)]
pub async fn set_playlist(
    State(state): State<SharedState>,
    CurrentUser(user_id): CurrentUser,
    Path(code): Path<String>,
    Valid(Json(payload)): Valid<Json<PlaylistRequest>>,
) -> Result<Json<PlaylistResponse>, AppError> {
    let response =
        room_config_service::set_playlist(&state, &code, user_id, &payload.playlist).await?;
    Ok(Json(response))
}

/// Fetch tracks and start (or restart) the room's blind-test.
#[utoipa::path(
    post,
    path = "/rooms/{code}/blindtest/start",
    tag = "blindtest",
    params(("code" = String, Path, description = "Room code")),
    responses(
        (status = 200, description = "Game started", body = GameStartedResponse),
        (status = 400, description = "No playlist or no playable tracks"),
        (status = 502, description = "Track provider failure")
    )
)]
pub async fn start(
    State(state): State<SharedState>,
    CurrentUser(user_id): CurrentUser,
    Path(code): Path<String>,
) -> Result<Json<GameStartedResponse>, AppError> {
    let response = game_service::start_blindtest(&state, &code, user_id).await?;
    Ok(Json(response))
}

/// Caller's view of the blind-test.
#[utoipa::path(
    get,
    path = "/rooms/{code}/blindtest/state",
    tag = "blindtest",
    params(("code" = String, Path, description = "Room code")),
    responses((status = 200, description = "Caller's view of the game", body = BlindTestStateResponse))
)]
pub async fn state_for_user(
    State(state): State<SharedState>,
    CurrentUser(user_id): CurrentUser,
    Path(code): Path<String>,
) -> Result<Json<BlindTestStateResponse>, AppError> {
    let response = game_service::blindtest_state(&state, &code, user_id).await?;
    Ok(Json(response))
}

/// Submit the caller's single guess for the current round.
#[utoipa::path(
    post,
    path = "/rooms/{code}/blindtest/guess",
    tag = "blindtest",
    params(("code" = String, Path, description = "Room code")),
    request_body = GuessRequest,
    responses((status = 200, description = "Guess outcome", body = GuessResponse))
)]
pub async fn guess(
    State(state): State<SharedState>,
    CurrentUser(user_id): CurrentUser,
    Path(code): Path<String>,
    Valid(Json(payload)): Valid<Json<GuessRequest>>,
) -> Result<Json<GuessResponse>, AppError> {
    let response = game_service::submit_guess(&state, &code, user_id, &payload.guess).await?;
    Ok(Json(response))
}
