//! Mock Spotify provider for integration tests.
//!
//! Serves the token endpoint and the four Web API endpoints the pipeline
//! calls, on a random local port. Every test gets its own instance; the
//! server shuts down when the handle is dropped.

#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use axum::{
    Form, Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
};
use serde_json::{Value, json};
use tastecluster::{
    config::{PipelineConfig, SpotifyConfig},
    spotify::{SpotifyClient, auth::OAuthClient},
};
use tokio::{net::TcpListener, sync::oneshot};

pub const CLIENT_ID: &str = "test-client";
pub const CLIENT_SECRET: &str = "test-secret";
pub const REDIRECT_URI: &str = "http://127.0.0.1:5000/callback";
pub const GOOD_CODE: &str = "good-code";
pub const CODE_WITHOUT_REFRESH: &str = "no-refresh-code";
pub const FIRST_ACCESS_TOKEN: &str = "access-1";
pub const REFRESHED_ACCESS_TOKEN: &str = "access-2";
pub const REFRESH_TOKEN: &str = "refresh-1";
pub const USER_ID: &str = "listener-42";

/// Audio features response of one track, including the fields the client drops.
pub fn features_json(id: &str, base: f64) -> Value {
    json!({
        "id": id,
        "uri": format!("spotify:track:{id}"),
        "track_href": format!("https://api.spotify.com/v1/tracks/{id}"),
        "analysis_url": format!("https://api.spotify.com/v1/audio-analysis/{id}"),
        "type": "audio_features",
        "key": 5,
        "mode": 1,
        "time_signature": 4,
        "acousticness": 0.1 * base,
        "danceability": 0.2 * base,
        "duration_ms": 180_000.0 + 1_000.0 * base,
        "energy": 0.3 * base,
        "instrumentalness": 0.01 * base,
        "liveness": 0.05 * base,
        "loudness": -10.0 + base,
        "speechiness": 0.04 * base,
        "tempo": 100.0 + 10.0 * base,
        "valence": 0.15 * base,
    })
}

/// What the mock provider answers.
#[derive(Debug, Clone, Default)]
pub struct MockData {
    pub top: Vec<(String, String)>,
    pub saved: Vec<(String, String)>,
    pub features: HashMap<String, Value>,
    /// Track id whose feature request fails with the given status and message.
    pub feature_failure: Option<(String, u16, String)>,
    /// Status and optional message for `GET /me`.
    pub profile_failure: Option<(u16, Option<String>)>,
    /// Status and message for `GET /me/top/tracks`.
    pub top_failure: Option<(u16, String)>,
    /// Saved-tracks offset whose page fails with the given status and message.
    pub saved_failure: Option<(u32, u16, String)>,
}

impl MockData {
    /// `top` and `saved` tracks named after their id, each with distinct features.
    pub fn with_tracks(top: &[&str], saved: &[&str]) -> Self {
        let mut data = Self::default();
        for (i, id) in top.iter().chain(saved.iter()).enumerate() {
            data.features
                .insert(id.to_string(), features_json(id, (i + 1) as f64));
        }
        data.top = top
            .iter()
            .map(|id| (id.to_string(), format!("Track {id}")))
            .collect();
        data.saved = saved
            .iter()
            .map(|id| (id.to_string(), format!("Track {id}")))
            .collect();
        data
    }
}

/// Request counters and captured parameters.
#[derive(Debug, Default)]
pub struct Hits {
    pub token: AtomicUsize,
    pub profile: AtomicUsize,
    pub top: AtomicUsize,
    pub saved: AtomicUsize,
    pub features: AtomicUsize,
    pub token_forms: Mutex<Vec<HashMap<String, String>>>,
    pub top_queries: Mutex<Vec<HashMap<String, String>>>,
    pub saved_offsets: Mutex<Vec<u32>>,
    pub feature_ids: Mutex<Vec<String>>,
    pub authorization: Mutex<Vec<String>>,
}

impl Hits {
    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    pub fn web_api_calls(&self) -> usize {
        Self::count(&self.profile)
            + Self::count(&self.top)
            + Self::count(&self.saved)
            + Self::count(&self.features)
    }
}

struct MockState {
    data: MockData,
    hits: Arc<Hits>,
}

type Shared = State<Arc<MockState>>;

pub struct MockProvider {
    /// Base URL, e.g. "http://127.0.0.1:12345"
    pub base_url: String,
    pub hits: Arc<Hits>,
    _shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockProvider {
    pub async fn spawn(data: MockData) -> Self {
        let hits = Arc::new(Hits::default());
        let state = Arc::new(MockState {
            data,
            hits: hits.clone(),
        });

        let app = Router::new()
            .route("/api/token", post(token))
            .route("/me", get(profile))
            .route("/me/top/tracks", get(top_tracks))
            .route("/me/tracks", get(saved_tracks))
            .route("/audio-features/{id}", get(audio_features))
            .with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Mock provider failed");
        });

        Self {
            base_url: format!("http://127.0.0.1:{port}"),
            hits,
            _shutdown_tx: Some(shutdown_tx),
        }
    }

    pub fn spotify_config(&self) -> SpotifyConfig {
        SpotifyConfig {
            client_id: CLIENT_ID.to_string(),
            client_secret: CLIENT_SECRET.to_string(),
            redirect_uri: REDIRECT_URI.to_string(),
            scope: "user-top-read user-library-read".to_string(),
            auth_url: format!("{}/authorize", self.base_url),
            token_url: format!("{}/api/token", self.base_url),
            api_url: self.base_url.clone(),
        }
    }

    pub fn oauth_client(&self) -> OAuthClient {
        OAuthClient::new(&self.spotify_config())
    }

    pub fn spotify_client(&self) -> SpotifyClient {
        SpotifyClient::with_base_url(&self.base_url)
    }

    /// Environment the server would read, pointed at this provider.
    pub fn env(&self) -> HashMap<String, String> {
        let mut env = HashMap::new();
        env.insert("SPOTIFY_API_AUTH_CLIENT_ID".into(), CLIENT_ID.into());
        env.insert("SPOTIFY_API_AUTH_CLIENT_SECRET".into(), CLIENT_SECRET.into());
        env.insert("SPOTIFY_API_REDIRECT_URI".into(), REDIRECT_URI.into());
        env.insert("SPOTIFY_API_AUTH_URL".into(), format!("{}/authorize", self.base_url));
        env.insert("SPOTIFY_API_TOKEN_URL".into(), format!("{}/api/token", self.base_url));
        env.insert("SPOTIFY_API_URL".into(), self.base_url.clone());
        env.insert("FEATURE_REQUEST_INTERVAL_MS".into(), "0".into());
        env
    }
}

/// Pipeline shape used by the tests: the real page layout, no pauses.
pub fn test_pipeline_config() -> PipelineConfig {
    PipelineConfig {
        request_interval: std::time::Duration::ZERO,
        ..PipelineConfig::default()
    }
}

fn api_error(status: u16, message: &str) -> (StatusCode, Json<Value>) {
    (
        StatusCode::from_u16(status).expect("valid status"),
        Json(json!({ "error": { "status": status, "message": message } })),
    )
}

fn record_authorization(hits: &Hits, headers: &HeaderMap) {
    let value = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    hits.authorization.lock().unwrap().push(value);
}

fn track_items(tracks: &[(String, String)]) -> Vec<Value> {
    tracks
        .iter()
        .map(|(id, name)| json!({ "id": id, "name": name, "popularity": 50 }))
        .collect()
}

async fn token(
    State(state): Shared,
    Form(form): Form<HashMap<String, String>>,
) -> (StatusCode, Json<Value>) {
    state.hits.token.fetch_add(1, Ordering::SeqCst);
    state.hits.token_forms.lock().unwrap().push(form.clone());

    let grant = form.get("grant_type").map(String::as_str);
    let code = form.get("code").map(String::as_str);
    let refresh = form.get("refresh_token").map(String::as_str);

    match (grant, code, refresh) {
        (Some("authorization_code"), Some(GOOD_CODE), _) => (
            StatusCode::OK,
            Json(json!({
                "access_token": FIRST_ACCESS_TOKEN,
                "refresh_token": REFRESH_TOKEN,
                "token_type": "Bearer",
                "scope": "user-top-read user-library-read",
                "expires_in": 3600,
            })),
        ),
        (Some("authorization_code"), Some(CODE_WITHOUT_REFRESH), _) => (
            StatusCode::OK,
            Json(json!({
                "access_token": FIRST_ACCESS_TOKEN,
                "token_type": "Bearer",
                "expires_in": 3600,
            })),
        ),
        (Some("refresh_token"), _, Some(REFRESH_TOKEN)) => (
            StatusCode::OK,
            Json(json!({
                "access_token": REFRESHED_ACCESS_TOKEN,
                "refresh_token": "rotated-refresh",
                "token_type": "Bearer",
                "expires_in": 3600,
            })),
        ),
        (Some("refresh_token"), _, _) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "invalid_grant", "error_description": "Invalid refresh token" })),
        ),
        _ => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "invalid_grant", "error_description": "Invalid authorization code" })),
        ),
    }
}

async fn profile(State(state): Shared, headers: HeaderMap) -> (StatusCode, Json<Value>) {
    state.hits.profile.fetch_add(1, Ordering::SeqCst);
    record_authorization(&state.hits, &headers);

    if let Some((status, message)) = &state.data.profile_failure {
        return match message {
            Some(message) => api_error(*status, message),
            None => (
                StatusCode::from_u16(*status).expect("valid status"),
                Json(json!({})),
            ),
        };
    }

    (
        StatusCode::OK,
        Json(json!({ "id": USER_ID, "display_name": "Test Listener", "country": "DE" })),
    )
}

async fn top_tracks(
    State(state): Shared,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> (StatusCode, Json<Value>) {
    state.hits.top.fetch_add(1, Ordering::SeqCst);
    record_authorization(&state.hits, &headers);
    state.hits.top_queries.lock().unwrap().push(query);

    if let Some((status, message)) = &state.data.top_failure {
        return api_error(*status, message);
    }

    (
        StatusCode::OK,
        Json(json!({ "items": track_items(&state.data.top), "total": state.data.top.len() })),
    )
}

async fn saved_tracks(
    State(state): Shared,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> (StatusCode, Json<Value>) {
    state.hits.saved.fetch_add(1, Ordering::SeqCst);
    record_authorization(&state.hits, &headers);

    let limit: usize = query.get("limit").and_then(|v| v.parse().ok()).unwrap_or(20);
    let offset: usize = query.get("offset").and_then(|v| v.parse().ok()).unwrap_or(0);
    state.hits.saved_offsets.lock().unwrap().push(offset as u32);

    if let Some((failing, status, message)) = &state.data.saved_failure {
        if *failing as usize == offset {
            return api_error(*status, message);
        }
    }

    let page = state
        .data
        .saved
        .iter()
        .skip(offset)
        .take(limit)
        .cloned()
        .collect::<Vec<_>>();

    let items = track_items(&page)
        .into_iter()
        .map(|track| json!({ "added_at": "2024-01-01T00:00:00Z", "track": track }))
        .collect::<Vec<_>>();

    (StatusCode::OK, Json(json!({ "items": items, "offset": offset, "limit": limit })))
}

async fn audio_features(
    State(state): Shared,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> (StatusCode, Json<Value>) {
    state.hits.features.fetch_add(1, Ordering::SeqCst);
    record_authorization(&state.hits, &headers);
    state.hits.feature_ids.lock().unwrap().push(id.clone());

    if let Some((failing, status, message)) = &state.data.feature_failure {
        if *failing == id {
            return api_error(*status, message);
        }
    }

    match state.data.features.get(&id) {
        Some(features) => (StatusCode::OK, Json(features.clone())),
        None => api_error(404, "analysis not found"),
    }
}
