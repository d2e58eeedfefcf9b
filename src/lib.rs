//! Library crate for party-rooms-back, exposing modules for binaries and integration tests.

/// Runtime configuration.
pub mod config;
/// Persistence layer.
pub mod dao;
mod dto;
mod error;
/// Track catalogue.
pub mod provider;
/// HTTP and WebSocket routes.
pub mod routes;
/// Service layer behind the routes.
pub mod services;
/// Shared state, hubs and game engines.
pub mod state;
