//! Engine configuration loading, including retry schedules and storage
//! paths.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

use crate::puzzle::DisplayFormat;
use crate::retry::RetryPolicy;

/// Default location on disk where the engine looks for the JSON
/// configuration.
const DEFAULT_CONFIG_PATH: &str = "config/engine.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "CHRONLE_ENGINE_CONFIG_PATH";

/// Default backoff before re-checking for puzzle metadata (3 waits).
const DEFAULT_METADATA_BACKOFF_MS: [u64; 3] = [500, 1_000, 2_000];
/// Default backoff between attempt-resolution retries (2 retries).
const DEFAULT_RESOLVE_BACKOFF_MS: [u64; 2] = [1_000, 2_000];
/// Default backoff between guess-persistence retries (2 retries).
const DEFAULT_PERSIST_BACKOFF_MS: [u64; 2] = [500, 1_000];

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the engine.
pub struct EngineConfig {
    /// Maximum number of guesses before the attempt is lost.
    pub max_guesses: u8,
    /// Display format used when a puzzle does not dictate one.
    pub default_format: DisplayFormat,
    /// Backoff schedule while waiting for the puzzle identifier.
    pub metadata_backoff: Vec<Duration>,
    /// Backoff schedule for attempt resolution retries.
    pub resolve_backoff: Vec<Duration>,
    /// Backoff schedule for guess persistence retries.
    pub persist_backoff: Vec<Duration>,
    /// Path of the anonymous device store document.
    pub device_store_path: PathBuf,
    /// Path of the durable cache document.
    pub cache_path: PathBuf,
}

impl EngineConfig {
    /// Load the engine configuration from disk, falling back to baked-in
    /// defaults when the file is missing or malformed.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        max_guesses = config.max_guesses,
                        "loaded engine configuration"
                    );
                    config
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

    /// Retry policy for waiting on the puzzle identifier.
    pub fn metadata_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.metadata_backoff.clone())
    }

    /// Retry policy for attempt resolution.
    pub fn resolve_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.resolve_backoff.clone())
    }

    /// Retry policy for guess persistence.
    pub fn persist_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.persist_backoff.clone())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_guesses: 5,
            default_format: DisplayFormat::default(),
            metadata_backoff: millis(&DEFAULT_METADATA_BACKOFF_MS),
            resolve_backoff: millis(&DEFAULT_RESOLVE_BACKOFF_MS),
            persist_backoff: millis(&DEFAULT_PERSIST_BACKOFF_MS),
            device_store_path: PathBuf::from("data/device-progress.json"),
            cache_path: PathBuf::from("data/progress-cache.json"),
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at
/// [`DEFAULT_CONFIG_PATH`]. Every field is optional; omitted fields keep
/// their defaults.
struct RawConfig {
    max_guesses: Option<u8>,
    default_format: Option<DisplayFormat>,
    metadata_backoff_ms: Option<Vec<u64>>,
    resolve_backoff_ms: Option<Vec<u64>>,
    persist_backoff_ms: Option<Vec<u64>>,
    device_store_path: Option<PathBuf>,
    cache_path: Option<PathBuf>,
}

impl From<RawConfig> for EngineConfig {
    fn from(raw: RawConfig) -> Self {
        let defaults = EngineConfig::default();
        Self {
            max_guesses: raw.max_guesses.unwrap_or(defaults.max_guesses),
            default_format: raw.default_format.unwrap_or(defaults.default_format),
            metadata_backoff: raw
                .metadata_backoff_ms
                .map(|ms| millis(&ms))
                .unwrap_or(defaults.metadata_backoff),
            resolve_backoff: raw
                .resolve_backoff_ms
                .map(|ms| millis(&ms))
                .unwrap_or(defaults.resolve_backoff),
            persist_backoff: raw
                .persist_backoff_ms
                .map(|ms| millis(&ms))
                .unwrap_or(defaults.persist_backoff),
            device_store_path: raw.device_store_path.unwrap_or(defaults.device_store_path),
            cache_path: raw.cache_path.unwrap_or(defaults.cache_path),
        }
    }
}

/// Resolve the configuration path taking the environment override into
/// account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

fn millis(values: &[u64]) -> Vec<Duration> {
    values.iter().map(|ms| Duration::from_millis(*ms)).collect()
}
