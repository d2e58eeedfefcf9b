use mongodb::error::{Error as MongoError, ErrorKind, WriteFailure};
use thiserror::Error;

/// Result alias for MongoDB operations.
pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

const DUPLICATE_KEY_CODE: i32 = 11000;

/// Failures of the MongoDB room store backend.
#[derive(Debug, Error)]
pub enum MongoDaoError {
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        uri: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to build the room store client for database `{database}`")]
    ClientConstruction {
        database: String,
        #[source]
        source: MongoError,
    },
    #[error("room store database `{database}` did not answer a ping after {attempts} attempt(s)")]
    InitialPing {
        database: String,
        attempts: u32,
        #[source]
        source: MongoError,
    },
    #[error("room store health ping failed")]
    HealthPing {
        #[source]
        source: MongoError,
    },
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        collection: &'static str,
        index: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("MongoDB `{operation}` failed")]
    Query {
        operation: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("sequence counter `{0}` returned no document")]
    MissingCounter(&'static str),
}

/// Whether the driver rejected a write because of a unique index.
pub fn is_duplicate_key(err: &MongoError) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write)) if write.code == DUPLICATE_KEY_CODE
    )
}
