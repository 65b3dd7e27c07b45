//! # Spotify Integration Module
//!
//! Interface to the parts of the Spotify Web API the ingestion pipeline needs.
//!
//! ```text
//! Session Coordinator (api, pipeline)
//!          ↓
//! Spotify Integration Layer
//!     ├── OAuth client (authorization URL, code exchange, refresh)
//!     ├── Profile fetcher (profile, top tracks, saved tracks)
//!     └── Feature enricher (per-track audio features)
//!          ↓
//! HTTP Layer (reqwest, JSON)
//! ```
//!
//! ## Error Handling
//!
//! No call is retried. A non-success status becomes [`HttpError::Status`]
//! carrying the upstream status and the message from the error body, or
//! "No error message returned." when the body has none. Network and decoding
//! failures become [`HttpError::Transport`].
//!
//! ## API Coverage
//!
//! - `GET /me` - current user's profile
//! - `GET /me/top/tracks` - user's top tracks (single page)
//! - `GET /me/tracks` - user's saved tracks (offset pagination)
//! - `GET /audio-features/{id}` - audio features of one track
//! - `POST /api/token` - code exchange and token refresh

pub mod auth;
pub mod features;
pub mod profile;

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;

use crate::{config::SpotifyConfig, error::HttpError, types::ApiErrorBody};

pub const NO_ERROR_MESSAGE: &str = "No error message returned.";

/// Bearer-authenticated client for the Web API.
#[derive(Debug, Clone)]
pub struct SpotifyClient {
    http: Client,
    api_url: String,
}

impl SpotifyClient {
    pub fn new(config: &SpotifyConfig) -> Self {
        Self::with_base_url(&config.api_url)
    }

    pub fn with_base_url(api_url: &str) -> Self {
        Self {
            http: Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// GETs `path` below the API base and decodes a JSON body.
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        access_token: &str,
    ) -> Result<T, HttpError> {
        let url = format!("{}{}", self.api_url, path);
        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .query(query)
            .send()
            .await?;

        let response = check_status(response).await?;
        Ok(response.json::<T>().await?)
    }
}

/// Passes successful responses through and turns the rest into [`HttpError::Status`].
pub(crate) async fn check_status(response: Response) -> Result<Response, HttpError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(HttpError::Status {
        status: status.as_u16(),
        message: error_message(&body),
    })
}

/// Extracts the upstream message from a Web API error body.
pub fn error_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .and_then(|b| b.error.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| NO_ERROR_MESSAGE.to_string())
}
