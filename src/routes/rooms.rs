use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use axum_valid::Valid;

use crate::{
    dto::room::{
        ActionResponse, CreateRoomRequest, JoinRoomRequest, PlayerSummary, ReadyRequest,
        RoomSummary,
    },
    error::AppError,
    routes::identity::CurrentUser,
    services::room_service,
    state::SharedState,
};

/// Room lifecycle endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/rooms", post(create_room))
        .route("/rooms/{code}", get(get_room))
        .route("/rooms/{code}/join", post(join_room))
        .route("/rooms/{code}/leave", post(leave_room))
        .route("/rooms/{code}/ready", post(set_ready))
        .route("/rooms/{code}/players", get(list_players))
}

/// Open a room; the caller joins it as admin.
#[utoipa::path(
    post,
    path = "/rooms",
    tag = "rooms",
    request_body = CreateRoomRequest,
    responses(
        (status = 201, description = "Room created", body = RoomSummary),
        (status = 400, description = "Invalid room settings")
    )
)]
pub async fn create_room(
    State(state): State<SharedState>,
    CurrentUser(user_id): CurrentUser,
    Valid(Json(payload)): Valid<Json<CreateRoomRequest>>,
) -> Result<(StatusCode, Json<RoomSummary>), AppError> {
    let room = room_service::create_room(&state, user_id, payload).await?;
    Ok((StatusCode::CREATED, Json(room)))
}

/// Look a room up by code.
#[utoipa::path(
    get,
    path = "/rooms/{code}",
    tag = "rooms",
    params(("code" = String, Path, description = "Room code")),
    responses(
        (status = 200, description = "Room found", body = RoomSummary),
        (status = 404, description = "Unknown room code")
    )
)]
pub async fn get_room(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> Result<Json<RoomSummary>, AppError> {
    let room = room_service::get_room(&state, &code).await?;
    Ok(Json(room))
}

/// Join a room under a pseudo.
#[utoipa::path(
    post,
    path = "/rooms/{code}/join",
    tag = "rooms",
    params(("code" = String, Path, description = "Room code")),
    request_body = JoinRoomRequest,
    responses(
        (status = 200, description = "Joined", body = RoomSummary),
        (status = 409, description = "Room full or already joined")
    )
)]
pub async fn join_room(
    State(state): State<SharedState>,
    CurrentUser(user_id): CurrentUser,
    Path(code): Path<String>,
    Valid(Json(payload)): Valid<Json<JoinRoomRequest>>,
) -> Result<Json<RoomSummary>, AppError> {
    let room = room_service::join_room(&state, &code, user_id, payload.pseudo).await?;
    Ok(Json(room))
}

/// Leave a room.
#[utoipa::path(
    post,
    path = "/rooms/{code}/leave",
    tag = "rooms",
    params(("code" = String, Path, description = "Room code")),
    responses(
        (status = 200, description = "Left the room", body = ActionResponse),
        (status = 404, description = "Not a member")
    )
)]
pub async fn leave_room(
    State(state): State<SharedState>,
    CurrentUser(user_id): CurrentUser,
    Path(code): Path<String>,
) -> Result<Json<ActionResponse>, AppError> {
    let response = room_service::leave_room(&state, &code, user_id).await?;
    Ok(Json(response))
}

/// Toggle the caller's ready flag.
#[utoipa::path(
    post,
    path = "/rooms/{code}/ready",
    tag = "rooms",
    params(("code" = String, Path, description = "Room code")),
    request_body = ReadyRequest,
    responses((status = 200, description = "Ready flag updated", body = ActionResponse))
)]
pub async fn set_ready(
    State(state): State<SharedState>,
    CurrentUser(user_id): CurrentUser,
    Path(code): Path<String>,
    Json(payload): Json<ReadyRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    let response = room_service::set_ready(&state, &code, user_id, payload.ready).await?;
    Ok(Json(response))
}

/// Members in scoreboard order.
#[utoipa::path(
    get,
    path = "/rooms/{code}/players",
    tag = "rooms",
    params(("code" = String, Path, description = "Room code")),
    responses((status = 200, description = "Scoreboard", body = [PlayerSummary]))
)]
pub async fn list_players(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> Result<Json<Vec<PlayerSummary>>, AppError> {
    let players = room_service::list_players(&state, &code).await?;
    Ok(Json(players))
}
