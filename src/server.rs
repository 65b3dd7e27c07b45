use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tokio::net::TcpListener;

use crate::{
    Res, api,
    config::Config,
    management::{SharedSession, shared_session},
    spotify::{SpotifyClient, auth::OAuthClient},
    warehouse::Warehouse,
};

/// Collaborators shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub oauth: Arc<OAuthClient>,
    pub spotify: Arc<SpotifyClient>,
    pub warehouse: Arc<dyn Warehouse>,
    pub session: SharedSession,
}

impl AppState {
    /// Builds the Spotify clients from `config` with a fresh, unauthenticated session.
    pub fn new(config: Config, warehouse: Arc<dyn Warehouse>) -> Self {
        Self {
            oauth: Arc::new(OAuthClient::new(&config.spotify)),
            spotify: Arc::new(SpotifyClient::new(&config.spotify)),
            config: Arc::new(config),
            warehouse,
            session: shared_session(),
        }
    }
}

pub fn make_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(api::index))
        .route("/callback", get(api::callback))
        .route("/refresh", get(api::refresh))
        .route("/profile", get(api::profile))
        .route("/logout", get(api::logout))
        .route("/health", get(api::health))
        .layer(Extension(state))
}

/// Serves the app on an already bound listener until the process stops.
pub async fn serve(listener: TcpListener, state: AppState) -> Res<()> {
    axum::serve(listener, make_app(state)).await?;
    Ok(())
}
