//! Track catalogue used by blind-test games.

/// Deezer-backed track provider.
pub mod deezer;

use futures::future::BoxFuture;
use reqwest::StatusCode;
use thiserror::Error;

pub use deezer::DeezerProvider;

/// Identifier of a track in the upstream catalogue.
pub type TrackId = i64;

/// Playable track held in engine memory for the duration of a game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub id: TrackId,
    pub title: String,
    pub artist: String,
    pub preview_url: String,
}

/// Result alias for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Failures raised while fetching a track pool.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("failed to build track provider HTTP client")]
    ClientBuilder {
        #[source]
        source: reqwest::Error,
    },
    #[error("track provider request `{path}` failed")]
    Request {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("track provider returned status {status} for `{path}`")]
    Status { path: String, status: StatusCode },
    #[error("failed to decode track provider response for `{path}`")]
    Decode {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("track provider timed out")]
    Timeout,
    #[error("no playlist found for `{0}`")]
    NoPlaylist(String),
    #[error("no playable tracks for `{0}`")]
    NoPlayableTracks(String),
}

/// Source of playable tracks for a genre token (`Rock`, `Rap`, `Pop`, ...).
///
/// Implementations return a deduplicated, non-empty pool or an error.
pub trait TrackProvider: Send + Sync {
    fn fetch_tracks(&self, genre: String) -> BoxFuture<'static, ProviderResult<Vec<Track>>>;
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Provider returning a fixed pool, or failing when the pool is empty.
    pub struct StaticTrackProvider {
        tracks: Vec<Track>,
    }

    impl StaticTrackProvider {
        pub fn new(tracks: Vec<Track>) -> Self {
            Self { tracks }
        }
    }

    impl TrackProvider for StaticTrackProvider {
        fn fetch_tracks(&self, genre: String) -> BoxFuture<'static, ProviderResult<Vec<Track>>> {
            let tracks = self.tracks.clone();
            Box::pin(async move {
                if tracks.is_empty() {
                    Err(ProviderError::NoPlayableTracks(genre))
                } else {
                    Ok(tracks)
                }
            })
        }
    }

    pub fn track(id: TrackId, title: &str, artist: &str) -> Track {
        Track {
            id,
            title: title.into(),
            artist: artist.into(),
            preview_url: format!("https://cdn.example/preview/{id}.mp3"),
        }
    }
}
