use axum::Router;

use crate::state::SharedState;

/// Blind-test endpoints.
pub mod blindtest;
/// Swagger UI.
pub mod docs;
/// Health check.
pub mod health;
/// Caller identity extractor.
pub mod identity;
/// Petit-bac endpoints.
pub mod petitbac;
/// Room endpoints.
pub mod rooms;
/// Viewer WebSocket endpoint.
pub mod websocket;

/// Every API route plus the Swagger UI, bound to the shared state.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(rooms::router())
        .merge(blindtest::router())
        .merge(petitbac::router())
        .merge(websocket::router());

    api_router.merge(docs::router()).with_state(state)
}
