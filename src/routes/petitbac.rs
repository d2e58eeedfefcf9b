use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post, put},
};
use axum_valid::Valid;

use crate::{
    dao::models::CategoryId,
    dto::{
        blindtest::GameStartedResponse,
        petitbac::{
            CategoryRequest, CategorySummary, PetitBacStateResponse, SubmitAnswersRequest,
            SubmitVotesRequest,
        },
        room::ActionResponse,
    },
    error::AppError,
    routes::identity::CurrentUser,
    services::{game_service, room_config_service},
    state::SharedState,
};

/// Petit-bac configuration and gameplay endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route(
            "/rooms/{code}/petitbac/categories",
            get(list_categories).post(add_category),
        )
        .route(
            "/rooms/{code}/petitbac/categories/{id}",
            put(rename_category).delete(delete_category),
        )
        .route("/rooms/{code}/petitbac/start", post(start))
        .route("/rooms/{code}/petitbac/state", get(state_for_user))
        .route("/rooms/{code}/petitbac/answers", post(submit_answers))
        .route("/rooms/{code}/petitbac/votes", post(submit_votes))
}

/// List the room's categories.
#[utoipa::path(
    get,
    path = "/rooms/{code}/petitbac/categories",
    tag = "petitbac",
    params(("code" = String, Path, description = "Room code")),
    responses((status = 200, description = "Categories by position", body = [CategorySummary]))
)]
pub async fn list_categories(
    State(state): State<SharedState>,
    CurrentUser(user_id): CurrentUser,
    Path(code): Path<String>,
) -> Result<Json<Vec<CategorySummary>>, AppError> {
    let categories = room_config_service::list_categories(&state, &code, user_id).await?;
    Ok(Json(categories))
}

/// Append a category (admin only).
#[utoipa::path(
    post,
    path = "/rooms/{code}/petitbac/categories",
    tag = "petitbac",
    params(("code" = String, Path, description = "Room code")),
    request_body = CategoryRequest,
    responses(
        (status = 200, description = "Category appended", body = CategorySummary),
        (status = 400, description = "Blank or duplicate label")
    )
)]
pub async fn add_category(
    State(state): State<SharedState>,
    CurrentUser(user_id): CurrentUser,
    Path(code): Path<String>,
    Valid(Json(payload)): Valid<Json<CategoryRequest>>,
) -> Result<Json<CategorySummary>, AppError> {
    let category =
        room_config_service::add_category(&state, &code, user_id, &payload.label).await?;
    Ok(Json(category))
}

/// Rename a category (admin only).
#[utoipa::path(
    put,
    path = "/rooms/{code}/petitbac/categories/{id}",
    tag = "petitbac",
    params(
        ("code" = String, Path, description = "Room code"),
        ("id" = i64, Path, description = "Category identifier")
    ),
    request_body = CategoryRequest,
    responses((status = 200, description = "Category renamed", body = ActionResponse))
)]
pub async fn rename_category(
    State(state): State<SharedState>,
    CurrentUser(user_id): CurrentUser,
    Path((code, id)): Path<(String, CategoryId)>,
    Valid(Json(payload)): Valid<Json<CategoryRequest>>,
) -> Result<Json<ActionResponse>, AppError> {
    let response =
        room_config_service::rename_category(&state, &code, user_id, id, &payload.label).await?;
    Ok(Json(response))
}

/// Delete a category (admin only).
#[utoipa::path(
    delete,
    path = "/rooms/{code}/petitbac/categories/{id}",
    tag = "petitbac",
    params(
        ("code" = String, Path, description = "Room code"),
        ("id" = i64, Path, description = "Category identifier")
    ),
    responses((status = 200, description = "Category deleted", body = ActionResponse))
)]
pub async fn delete_category(
    State(state): State<SharedState>,
    CurrentUser(user_id): CurrentUser,
    Path((code, id)): Path<(String, CategoryId)>,
) -> Result<Json<ActionResponse>, AppError> {
    let response = room_config_service::delete_category(&state, &code, user_id, id).await?;
    Ok(Json(response))
}

/// Start (or restart) the room's petit-bac.
#[utoipa::path(
    post,
    path = "/rooms/{code}/petitbac/start",
    tag = "petitbac",
    params(("code" = String, Path, description = "Room code")),
    responses(
        (status = 200, description = "Game started", body = GameStartedResponse),
        (status = 400, description = "No category configured")
    )
)]
pub async fn start(
    State(state): State<SharedState>,
    CurrentUser(user_id): CurrentUser,
    Path(code): Path<String>,
) -> Result<Json<GameStartedResponse>, AppError> {
    let response = game_service::start_petitbac(&state, &code, user_id).await?;
    Ok(Json(response))
}

/// Caller's view of the petit-bac.
#[utoipa::path(
    get,
    path = "/rooms/{code}/petitbac/state",
    tag = "petitbac",
    params(("code" = String, Path, description = "Room code")),
    responses((status = 200, description = "Caller's view of the game", body = PetitBacStateResponse))
)]
pub async fn state_for_user(
    State(state): State<SharedState>,
    CurrentUser(user_id): CurrentUser,
    Path(code): Path<String>,
) -> Result<Json<PetitBacStateResponse>, AppError> {
    let response = game_service::petitbac_state(&state, &code, user_id).await?;
    Ok(Json(response))
}

/// Replace the caller's answer sheet for the current round.
#[utoipa::path(
    post,
    path = "/rooms/{code}/petitbac/answers",
    tag = "petitbac",
    params(("code" = String, Path, description = "Room code")),
    request_body = SubmitAnswersRequest,
    responses(
        (status = 200, description = "Answers stored", body = ActionResponse),
        (status = 409, description = "Round is not accepting answers")
    )
)]
pub async fn submit_answers(
    State(state): State<SharedState>,
    CurrentUser(user_id): CurrentUser,
    Path(code): Path<String>,
    Valid(Json(payload)): Valid<Json<SubmitAnswersRequest>>,
) -> Result<Json<ActionResponse>, AppError> {
    let response = game_service::submit_answers(&state, &code, user_id, payload.answers).await?;
    Ok(Json(response))
}

/// Record the caller's validation votes.
#[utoipa::path(
    post,
    path = "/rooms/{code}/petitbac/votes",
    tag = "petitbac",
    params(("code" = String, Path, description = "Room code")),
    request_body = SubmitVotesRequest,
    responses(
        (status = 200, description = "Votes recorded", body = ActionResponse),
        (status = 409, description = "Round is not in validation")
    )
)]
pub async fn submit_votes(
    State(state): State<SharedState>,
    CurrentUser(user_id): CurrentUser,
    Path(code): Path<String>,
    Json(payload): Json<SubmitVotesRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    let response = game_service::submit_votes(&state, &code, user_id, payload.votes).await?;
    Ok(Json(response))
}
