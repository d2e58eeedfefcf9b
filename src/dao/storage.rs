use std::error::Error;
use thiserror::Error;

use crate::dao::models::{CategoryId, RoomId, UserId};

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by storage backends regardless of the underlying database.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage unavailable: {message}")]
    Unavailable {
        message: String,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    #[error("room `{0}` not found")]
    RoomNotFound(RoomId),
    #[error("room `{0}` is full")]
    RoomFull(RoomId),
    #[error("user `{user_id}` already joined room `{room_id}`")]
    AlreadyInRoom { room_id: RoomId, user_id: UserId },
    #[error("user `{user_id}` is not a member of room `{room_id}`")]
    PlayerNotFound { room_id: RoomId, user_id: UserId },
    #[error("category `{0}` not found")]
    CategoryNotFound(CategoryId),
    #[error("category `{0}` already exists")]
    DuplicateCategory(String),
    #[error("no free room code after {0} attempts")]
    CodeSpaceExhausted(usize),
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }
}
