/// OpenAPI documentation generation.
pub mod documentation;
/// Engine installation and player actions.
pub mod game_service;
/// Health check service.
pub mod health_service;
/// Playlist and category configuration.
pub mod room_config_service;
/// Room creation and membership.
pub mod room_service;
/// Room store connection and health supervision.
pub mod storage_supervisor;
/// Room viewer WebSocket lifecycle.
pub mod websocket_service;

#[cfg(test)]
pub(crate) mod test_support;
