use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::Query,
    response::{Html, Redirect},
};

use crate::{
    error::{AuthError, PipelineError},
    management::Session,
    server::AppState,
    success,
    types::TokenPair,
    utils, warning,
};

/// Starts the flow: stores a fresh `state` and redirects to the provider.
pub async fn index(Extension(app): Extension<AppState>) -> Redirect {
    let state = utils::generate_state();
    let url = app.oauth.authorization_url(&state);

    *app.session.lock().await = Session::PendingCode { state };
    Redirect::to(&url)
}

pub async fn callback(
    Query(params): Query<HashMap<String, String>>,
    Extension(app): Extension<AppState>,
) -> Result<Redirect, PipelineError> {
    if let Some(error) = params.get("error") {
        warning!("Authorization was denied: {}", error);
        return Err(AuthError::Denied(error.clone()).into());
    }

    let Some(code) = params.get("code") else {
        return Err(AuthError::MissingCode.into());
    };

    let mut session = app.session.lock().await;
    let Some(pending) = session.pending_state() else {
        warning!("Callback arrived without a pending authorization request");
        return Err(AuthError::StateMismatch.into());
    };
    if params.get("state").map(String::as_str) != Some(pending) {
        warning!("Callback state does not match the pending request");
        return Err(AuthError::StateMismatch.into());
    }

    let tokens = app.oauth.exchange_code(code).await?;
    *session = Session::Authenticated { tokens };

    success!("Authentication successful!");
    Ok(Redirect::to("/profile"))
}

/// Refreshes the access token in place and returns the session's token pair.
pub async fn refresh(Extension(app): Extension<AppState>) -> Result<Json<TokenPair>, PipelineError> {
    let mut session = app.session.lock().await;
    let Some(tokens) = session.tokens_mut() else {
        return Err(PipelineError::NoSession);
    };

    let access_token = app.oauth.refresh(&tokens.refresh_token).await?;
    tokens.apply_refresh(access_token);

    Ok(Json(tokens.clone()))
}

pub async fn logout(Extension(app): Extension<AppState>) -> Html<&'static str> {
    *app.session.lock().await = Session::Unauthenticated;
    Html("<h4>Logged out.</h4>")
}
