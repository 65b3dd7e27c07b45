use reqwest::Client;

use crate::{
    config::SpotifyConfig,
    error::AuthError,
    types::{OAuthErrorBody, TokenPair, TokenResponse},
    warning,
};

/// Builds the authorization URL the user is redirected to.
///
/// Parameters are appended in a fixed order (`client_id`, `response_type`,
/// `redirect_uri`, `scope`, `state`) and percent-encoded, so equal inputs
/// always produce the same URL.
///
/// # Example
///
/// ```
/// let url = build_authorization_url(
///     "https://accounts.spotify.com/authorize",
///     "abc123",
///     "http://127.0.0.1:5000/callback",
///     "user-top-read user-library-read",
///     "xyz",
/// );
/// // https://accounts.spotify.com/authorize?client_id=abc123&response_type=code&redirect_uri=http%3A%2F%2F127.0.0.1%3A5000%2Fcallback&scope=user-top-read%20user-library-read&state=xyz
/// ```
pub fn build_authorization_url(
    auth_url: &str,
    client_id: &str,
    redirect_uri: &str,
    scope: &str,
    state: &str,
) -> String {
    format!(
        "{auth_url}?client_id={client_id}&response_type=code&redirect_uri={redirect_uri}&scope={scope}&state={state}",
        auth_url = auth_url,
        client_id = urlencoding::encode(client_id),
        redirect_uri = urlencoding::encode(redirect_uri),
        scope = urlencoding::encode(scope),
        state = urlencoding::encode(state),
    )
}

/// OAuth 2.0 authorization-code client with a confidential client secret.
///
/// State machine of a session:
/// Unauthenticated → (authorize) → PendingCode → (exchange) → Authenticated
/// → (refresh) → Authenticated ... → Unauthenticated on logout.
/// Refresh is always caller-triggered; nothing reacts to 401 responses.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    http: Client,
    config: SpotifyConfig,
}

impl OAuthClient {
    pub fn new(config: &SpotifyConfig) -> Self {
        Self {
            http: Client::new(),
            config: config.clone(),
        }
    }

    /// Authorization URL for this client's settings.
    pub fn authorization_url(&self, state: &str) -> String {
        build_authorization_url(
            &self.config.auth_url,
            &self.config.client_id,
            &self.config.redirect_uri,
            &self.config.scope,
            state,
        )
    }

    /// Exchanges an authorization code for a token pair.
    ///
    /// Issues a single POST with `grant_type=authorization_code`. Fails when
    /// the token endpoint answers with a non-success status or omits the
    /// access token. A missing refresh token is tolerated and stored empty;
    /// refreshing such a session fails with [`AuthError::MissingRefreshToken`].
    pub async fn exchange_code(&self, code: &str) -> Result<TokenPair, AuthError> {
        let response = self
            .request_token(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
            ])
            .await?;

        let access_token = non_empty(response.access_token).ok_or(AuthError::MissingAccessToken)?;
        let refresh_token = non_empty(response.refresh_token).unwrap_or_else(|| {
            warning!("Token endpoint did not return a refresh token.");
            String::new()
        });

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Requests a fresh access token with `grant_type=refresh_token`.
    ///
    /// Only the access token is returned: a rotated refresh token in the
    /// response is ignored and the session keeps its original one.
    pub async fn refresh(&self, refresh_token: &str) -> Result<String, AuthError> {
        if refresh_token.is_empty() {
            return Err(AuthError::MissingRefreshToken);
        }

        let response = self
            .request_token(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
            ])
            .await?;

        non_empty(response.access_token).ok_or(AuthError::MissingAccessToken)
    }

    async fn request_token(&self, form: &[(&str, &str)]) -> Result<TokenResponse, AuthError> {
        let res = self
            .http
            .post(&self.config.token_url)
            .form(form)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            let message = serde_json::from_str::<OAuthErrorBody>(&body)
                .map(|b| match b.error_description {
                    Some(description) => format!("{}: {}", b.error, description),
                    None => b.error,
                })
                .unwrap_or_else(|_| crate::spotify::NO_ERROR_MESSAGE.to_string());
            warning!("Token request failed with {}: {}", status, message);
            return Err(AuthError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        Ok(res.json::<TokenResponse>().await?)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
