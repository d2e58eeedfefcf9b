use std::{collections::HashSet, sync::Arc, time::Duration};

use futures::future::BoxFuture;
use rand::{Rng, seq::SliceRandom};
use reqwest::Client;
use serde::{Deserialize, de::DeserializeOwned};
use tracing::{debug, info};

use super::{ProviderError, ProviderResult, Track, TrackProvider};
use crate::config::ProviderConfig;

/// Deezer public API client: resolves a genre to its best-rated playlist and samples it.
#[derive(Clone)]
pub struct DeezerProvider {
    client: Client,
    base_url: Arc<str>,
    timeout: Duration,
    fetch_limit: usize,
    pool_limit: usize,
}

#[derive(Debug, Deserialize)]
struct DeezerPage<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct DeezerPlaylist {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct DeezerTrack {
    id: i64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    preview: String,
    #[serde(default)]
    artist: DeezerArtist,
}

#[derive(Debug, Default, Deserialize)]
struct DeezerArtist {
    #[serde(default)]
    name: String,
}

impl From<DeezerTrack> for Track {
    fn from(value: DeezerTrack) -> Self {
        Self {
            id: value.id,
            title: value.title,
            artist: value.artist.name,
            preview_url: value.preview,
        }
    }
}

/// Search phrase used to find a playlist for a genre token.
pub fn search_query(genre: &str) -> String {
    match genre.trim().to_lowercase().as_str() {
        "rock" => "Best of Rock".into(),
        "rap" => "Rap Hits".into(),
        "pop" => "Pop Hits".into(),
        _ => format!("Top {}", genre.trim()),
    }
}

/// Keep tracks with a preview, drop duplicate ids, shuffle and cap the pool.
pub fn curate_tracks<R: Rng + ?Sized>(tracks: Vec<Track>, limit: usize, rng: &mut R) -> Vec<Track> {
    let mut seen = HashSet::new();
    let mut pool: Vec<Track> = tracks
        .into_iter()
        .filter(|track| !track.preview_url.trim().is_empty())
        .filter(|track| seen.insert(track.id))
        .collect();
    pool.shuffle(rng);
    pool.truncate(limit);
    pool
}

impl DeezerProvider {
    /// Build a provider from configuration. Every request is bounded by the configured timeout.
    pub fn new(config: &ProviderConfig) -> ProviderResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|source| ProviderError::ClientBuilder { source })?;

        Ok(Self {
            client,
            base_url: Arc::<str>::from(config.base_url.trim_end_matches('/')),
            timeout: config.timeout,
            fetch_limit: config.fetch_limit,
            pool_limit: config.pool_limit,
        })
    }

    async fn get_json<T>(&self, path: String, query: &[(&str, String)]) -> ProviderResult<T>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|source| ProviderError::Request {
                path: path.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status { path, status });
        }

        response
            .json::<T>()
            .await
            .map_err(|source| ProviderError::Decode { path, source })
    }

    async fn fetch(&self, genre: String) -> ProviderResult<Vec<Track>> {
        let query = search_query(&genre);
        let playlists: DeezerPage<DeezerPlaylist> = self
            .get_json(
                "/search/playlist".into(),
                &[
                    ("q", query.clone()),
                    ("order", "RATING_DESC".into()),
                    ("limit", "1".into()),
                ],
            )
            .await?;

        let playlist = playlists
            .data
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::NoPlaylist(query.clone()))?;
        debug!(genre = %genre, playlist_id = playlist.id, "resolved playlist for genre");

        let tracks: DeezerPage<DeezerTrack> = self
            .get_json(
                format!("/playlist/{}/tracks", playlist.id),
                &[("limit", self.fetch_limit.to_string())],
            )
            .await?;

        let fetched = tracks.data.len();
        let pool = curate_tracks(
            tracks.data.into_iter().map(Track::from).collect(),
            self.pool_limit,
            &mut rand::rng(),
        );
        if pool.is_empty() {
            return Err(ProviderError::NoPlayableTracks(genre));
        }

        info!(genre = %genre, fetched, kept = pool.len(), "fetched blind-test track pool");
        Ok(pool)
    }
}

impl TrackProvider for DeezerProvider {
    fn fetch_tracks(&self, genre: String) -> BoxFuture<'static, ProviderResult<Vec<Track>>> {
        let provider = self.clone();
        Box::pin(async move {
            tokio::time::timeout(provider.timeout, provider.fetch(genre))
                .await
                .map_err(|_| ProviderError::Timeout)?
        })
    }
}
