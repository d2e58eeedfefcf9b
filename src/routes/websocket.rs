use axum::{
    Router,
    extract::{Path, State, WebSocketUpgrade},
    response::IntoResponse,
    routing::get,
};

use crate::{
    error::AppError, routes::identity::CurrentUser, services::websocket_service,
    state::SharedState,
};

#[utoipa::path(
    get,
    path = "/ws/rooms/{code}",
    tag = "rooms",
    params(("code" = String, Path, description = "Room code")),
    responses(
        (status = 101, description = "Switching protocols to WebSocket"),
        (status = 403, description = "Caller is not a member of the room")
    )
)]
/// Upgrade the HTTP connection into a room viewer WebSocket session.
pub async fn ws_handler(
    State(state): State<SharedState>,
    CurrentUser(user_id): CurrentUser,
    Path(code): Path<String>,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, AppError> {
    let session = websocket_service::prepare_viewer(&state, &code, user_id).await?;
    Ok(ws.on_upgrade(move |socket| websocket_service::handle_socket(session, socket)))
}

/// Configure the WebSocket endpoint.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/ws/rooms/{code}", get(ws_handler))
}
