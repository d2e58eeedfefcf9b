/// Database model definitions.
pub mod models;
/// Room, membership and configuration persistence.
pub mod room_store;
/// Storage abstraction layer for database operations.
pub mod storage;
