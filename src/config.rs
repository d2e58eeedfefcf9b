//! Application-level configuration loading: gameplay pauses, hub sizing and track provider settings.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "PARTY_ROOMS_CONFIG_PATH";

const DEFAULT_REVEAL_PAUSE_SECS: u64 = 3;
const DEFAULT_VALIDATION_WINDOW_SECS: u64 = 30;
const DEFAULT_HUB_CLIENT_CAPACITY: usize = 32;
const DEFAULT_PROVIDER_BASE_URL: &str = "https://api.deezer.com";
const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 5;
const DEFAULT_PROVIDER_FETCH_LIMIT: usize = 500;
const DEFAULT_TRACK_POOL_LIMIT: usize = 100;

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Pause between a blind-test reveal and the next round.
    pub reveal_pause: Duration,
    /// Length of the petit-bac peer validation phase.
    pub validation_window: Duration,
    /// Outbound queue depth per hub viewer before it is dropped as stalled.
    pub hub_client_capacity: usize,
    /// Track provider settings.
    pub provider: ProviderConfig,
}

#[derive(Debug, Clone)]
/// Settings for the HTTP track provider.
pub struct ProviderConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub fetch_limit: usize,
    pub pool_limit: usize,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        reveal_pause_secs = app_config.reveal_pause.as_secs(),
                        validation_window_secs = app_config.validation_window.as_secs(),
                        "loaded configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        RawConfig::default().into()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
/// Every field is optional; absent ones keep their default.
struct RawConfig {
    reveal_pause_secs: Option<u64>,
    validation_window_secs: Option<u64>,
    hub_client_capacity: Option<usize>,
    provider_base_url: Option<String>,
    provider_timeout_secs: Option<u64>,
    provider_fetch_limit: Option<usize>,
    track_pool_limit: Option<usize>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        Self {
            reveal_pause: Duration::from_secs(
                value.reveal_pause_secs.unwrap_or(DEFAULT_REVEAL_PAUSE_SECS),
            ),
            validation_window: Duration::from_secs(
                value
                    .validation_window_secs
                    .unwrap_or(DEFAULT_VALIDATION_WINDOW_SECS),
            ),
            hub_client_capacity: value
                .hub_client_capacity
                .filter(|capacity| *capacity > 0)
                .unwrap_or(DEFAULT_HUB_CLIENT_CAPACITY),
            provider: ProviderConfig {
                base_url: value
                    .provider_base_url
                    .unwrap_or_else(|| DEFAULT_PROVIDER_BASE_URL.into()),
                timeout: Duration::from_secs(
                    value
                        .provider_timeout_secs
                        .unwrap_or(DEFAULT_PROVIDER_TIMEOUT_SECS),
                ),
                fetch_limit: value
                    .provider_fetch_limit
                    .unwrap_or(DEFAULT_PROVIDER_FETCH_LIMIT),
                pool_limit: value.track_pool_limit.unwrap_or(DEFAULT_TRACK_POOL_LIMIT),
            },
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = AppConfig::default();
        assert_eq!(config.reveal_pause, Duration::from_secs(3));
        assert_eq!(config.validation_window, Duration::from_secs(30));
        assert_eq!(config.hub_client_capacity, 32);
        assert_eq!(config.provider.base_url, "https://api.deezer.com");
        assert_eq!(config.provider.pool_limit, 100);
    }

    #[test]
    fn partial_file_overrides_only_listed_fields() {
        let raw: RawConfig =
            serde_json::from_str(r#"{"reveal_pause_secs": 5, "hub_client_capacity": 0}"#).unwrap();
        let config = AppConfig::from(raw);
        assert_eq!(config.reveal_pause, Duration::from_secs(5));
        assert_eq!(config.hub_client_capacity, 32);
        assert_eq!(config.provider.timeout, Duration::from_secs(5));
    }
}
