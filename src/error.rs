//! Error taxonomy.
//!
//! Each component returns its own error type; [`PipelineError`] gathers them
//! for the request handlers and decides the HTTP status the caller sees.
//! Nothing in the pipeline retries: the first failure aborts the request.

use std::fmt;

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

use crate::utils;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),
    #[error("invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
}

/// Token exchange or refresh failures.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token endpoint answered {status}: {message}")]
    Rejected { status: u16, message: String },
    #[error("token endpoint response did not contain an access token")]
    MissingAccessToken,
    #[error("no refresh token available for this session")]
    MissingRefreshToken,
    #[error("callback did not carry an authorization code")]
    MissingCode,
    #[error("authorization state does not match the pending request")]
    StateMismatch,
    #[error("authorization was denied: {0}")]
    Denied(String),
    #[error("token request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Upstream REST failures, carrying the original status and message.
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("upstream answered {status}: {message}")]
    Status { status: u16, message: String },
    #[error("upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl HttpError {
    /// Status to surface to the caller.
    pub fn status(&self) -> StatusCode {
        match self {
            HttpError::Status { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            HttpError::Transport(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

/// One row the warehouse refused.
#[derive(Debug, Clone, PartialEq)]
pub struct RowInsertError {
    pub index: usize,
    pub reason: String,
    pub message: String,
}

/// Every row-level error of a rejected bulk insert.
#[derive(Debug, Clone, PartialEq, Error)]
pub struct InsertErrors(pub Vec<RowInsertError>);

impl fmt::Display for InsertErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} row(s) rejected", self.0.len())?;
        for err in &self.0 {
            write!(f, "; row {} ({}): {}", err.index, err.reason, err.message)?;
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum WarehouseError {
    #[error("warehouse answered {status}: {message}")]
    Api { status: u16, message: String },
    #[error("{0} does not exist")]
    NotFound(String),
    #[error("errors during insertion of rows: {0}")]
    Insert(#[from] InsertErrors),
    #[error("warehouse credentials unusable: {0}")]
    Credentials(String),
    #[error("query did not complete in time")]
    QueryIncomplete,
    #[error("warehouse request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("no credential blob supplied and {0} does not exist")]
    Missing(String),
    #[error("credential blob is neither JSON nor base64-encoded JSON")]
    Malformed,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Everything that can abort a request of the session coordinator.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no tokens in session")]
    NoSession,
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Http(#[from] HttpError),
    #[error(transparent)]
    Warehouse(#[from] WarehouseError),
}

impl PipelineError {
    pub fn status(&self) -> StatusCode {
        match self {
            PipelineError::NoSession => StatusCode::BAD_REQUEST,
            PipelineError::Auth(AuthError::Rejected { status, .. }) => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            PipelineError::Auth(
                AuthError::MissingCode
                | AuthError::StateMismatch
                | AuthError::Denied(_)
                | AuthError::MissingRefreshToken,
            ) => StatusCode::BAD_REQUEST,
            PipelineError::Auth(_) => StatusCode::BAD_GATEWAY,
            PipelineError::Http(err) => err.status(),
            PipelineError::Warehouse(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = format!(
            "<h4>{} {}</h4><p>{}</p>",
            status.as_u16(),
            status.canonical_reason().unwrap_or("Error"),
            utils::escape_html(&self.to_string())
        );
        (status, Html(body)).into_response()
    }
}
