//! Configuration management for the taste clustering server.
//!
//! All settings are read once at startup into an immutable [`Config`] that is
//! handed to every component by reference. Values come from:
//! 1. Environment variables (highest priority)
//! 2. `.env` file in the local data directory, then `./.env`
//! 3. Application defaults (where applicable)

use std::{net::SocketAddr, path::PathBuf, str::FromStr, time::Duration};

use crate::error::ConfigError;

pub const DEFAULT_SERVER_ADDRESS: &str = "127.0.0.1:5000";
pub const DEFAULT_REDIRECT_URI: &str = "http://127.0.0.1:5000/callback";
pub const DEFAULT_AUTH_URL: &str = "https://accounts.spotify.com/authorize";
pub const DEFAULT_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
pub const DEFAULT_API_URL: &str = "https://api.spotify.com/v1";
pub const DEFAULT_SCOPE: &str = "user-read-playback-state playlist-read-private user-follow-read user-top-read user-read-recently-played user-library-read";

pub const DEFAULT_WAREHOUSE_API_URL: &str = "https://bigquery.googleapis.com/bigquery/v2";
pub const DEFAULT_DATASET: &str = "spotify_project_dataset";
pub const DEFAULT_TABLE: &str = "audio_features";
pub const DEFAULT_MODEL: &str = "genre_clustering";
pub const DEFAULT_LOCATION: &str = "US";
pub const DEFAULT_NUM_CLUSTERS: u32 = 4;

pub const DEFAULT_REQUEST_INTERVAL_MS: u64 = 1000;
pub const TOP_TRACKS_LIMIT: u32 = 50;
pub const SAVED_TRACKS_PAGES: u32 = 5;
pub const SAVED_TRACKS_PAGE_SIZE: u32 = 50;

/// Loads environment variables from `.env` files.
///
/// Looks for `tastecluster/.env` in the platform-specific local data directory
/// (creating the directory if needed) and then for `.env` in the working
/// directory. Missing files are skipped; variables already present in the
/// process environment are never overridden.
///
/// # Directory Structure
///
/// - Linux: `~/.local/share/tastecluster/.env`
/// - macOS: `~/Library/Application Support/tastecluster/.env`
/// - Windows: `%LOCALAPPDATA%/tastecluster/.env`
///
/// # Errors
///
/// Returns an error if the data directory cannot be created or an existing
/// `.env` file cannot be parsed.
pub async fn load_env() -> Result<(), String> {
    let path = data_dir().join(".env");
    if let Some(parent) = path.parent() {
        async_fs::create_dir_all(parent)
            .await
            .map_err(|e| e.to_string())?;
    }

    if path.is_file() {
        dotenv::from_path(&path).map_err(|e| e.to_string())?;
    }

    match dotenv::dotenv() {
        Ok(_) => Ok(()),
        Err(e) if e.not_found() => Ok(()),
        Err(e) => Err(e.to_string()),
    }
}

/// Returns the application's directory inside the local data directory.
pub fn data_dir() -> PathBuf {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("tastecluster");
    path
}

/// OAuth client settings and Spotify endpoints.
#[derive(Debug, Clone)]
pub struct SpotifyConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub scope: String,
    pub auth_url: String,
    pub token_url: String,
    pub api_url: String,
}

/// Warehouse location, naming and credential settings.
#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    /// Raw service-account blob, as supplied out-of-band.
    pub credentials_blob: Option<String>,
    /// Where the blob is materialized once per process lifetime.
    pub credentials_path: PathBuf,
    /// Overrides the service account's own project.
    pub project_id: Option<String>,
    pub dataset: String,
    pub table: String,
    pub model: String,
    pub location: String,
    pub num_clusters: u32,
    pub api_url: String,
}

/// Shape of one ingestion run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub top_tracks_limit: u32,
    pub saved_tracks_pages: u32,
    pub saved_tracks_page_size: u32,
    /// Fixed pause between consecutive audio-feature requests.
    pub request_interval: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            top_tracks_limit: TOP_TRACKS_LIMIT,
            saved_tracks_pages: SAVED_TRACKS_PAGES,
            saved_tracks_page_size: SAVED_TRACKS_PAGE_SIZE,
            request_interval: Duration::from_millis(DEFAULT_REQUEST_INTERVAL_MS),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_addr: SocketAddr,
    pub spotify: SpotifyConfig,
    pub warehouse: WarehouseConfig,
    pub pipeline: PipelineConfig,
}

impl Config {
    /// Builds the configuration from the process environment.
    ///
    /// Call [`load_env`] first so `.env` values are visible.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));
        let or_default = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let server_addr = parse_value(
            "SERVER_ADDRESS",
            &or_default("SERVER_ADDRESS", DEFAULT_SERVER_ADDRESS),
        )?;

        let spotify = SpotifyConfig {
            client_id: required("SPOTIFY_API_AUTH_CLIENT_ID")?,
            client_secret: required("SPOTIFY_API_AUTH_CLIENT_SECRET")?,
            redirect_uri: or_default("SPOTIFY_API_REDIRECT_URI", DEFAULT_REDIRECT_URI),
            scope: or_default("SPOTIFY_API_AUTH_SCOPE", DEFAULT_SCOPE),
            auth_url: or_default("SPOTIFY_API_AUTH_URL", DEFAULT_AUTH_URL),
            token_url: or_default("SPOTIFY_API_TOKEN_URL", DEFAULT_TOKEN_URL),
            api_url: trim_base(or_default("SPOTIFY_API_URL", DEFAULT_API_URL)),
        };

        let num_clusters = match get("WAREHOUSE_NUM_CLUSTERS") {
            Some(raw) => parse_value("WAREHOUSE_NUM_CLUSTERS", &raw)?,
            None => DEFAULT_NUM_CLUSTERS,
        };
        if num_clusters < 2 {
            return Err(ConfigError::Invalid {
                key: "WAREHOUSE_NUM_CLUSTERS",
                value: num_clusters.to_string(),
            });
        }

        let warehouse = WarehouseConfig {
            credentials_blob: get("CREDENTIALS"),
            credentials_path: get("WAREHOUSE_CREDENTIALS_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| data_dir().join("credentials.json")),
            project_id: get("WAREHOUSE_PROJECT_ID"),
            dataset: or_default("WAREHOUSE_DATASET", DEFAULT_DATASET),
            table: or_default("WAREHOUSE_TABLE", DEFAULT_TABLE),
            model: or_default("WAREHOUSE_MODEL", DEFAULT_MODEL),
            location: or_default("WAREHOUSE_LOCATION", DEFAULT_LOCATION),
            num_clusters,
            api_url: trim_base(or_default("WAREHOUSE_API_URL", DEFAULT_WAREHOUSE_API_URL)),
        };

        let interval_ms = match get("FEATURE_REQUEST_INTERVAL_MS") {
            Some(raw) => parse_value("FEATURE_REQUEST_INTERVAL_MS", &raw)?,
            None => DEFAULT_REQUEST_INTERVAL_MS,
        };

        let pipeline = PipelineConfig {
            request_interval: Duration::from_millis(interval_ms),
            ..PipelineConfig::default()
        };

        Ok(Self {
            server_addr,
            spotify,
            warehouse,
            pipeline,
        })
    }
}

fn parse_value<T: FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse::<T>().map_err(|_| ConfigError::Invalid {
        key,
        value: raw.to_string(),
    })
}

fn trim_base(url: String) -> String {
    url.trim_end_matches('/').to_string()
}
