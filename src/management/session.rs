use std::sync::Arc;

use tokio::sync::Mutex;

use crate::types::TokenPair;

/// Server-side state of the single browser session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Session {
    #[default]
    Unauthenticated,
    /// Redirected to the provider, waiting for the callback carrying `state`.
    PendingCode { state: String },
    Authenticated { tokens: TokenPair },
}

pub type SharedSession = Arc<Mutex<Session>>;

pub fn shared_session() -> SharedSession {
    Arc::new(Mutex::new(Session::Unauthenticated))
}

impl Session {
    /// Snapshot handed to the pipeline, if the session holds tokens.
    pub fn context(&self) -> Option<SessionContext> {
        match self {
            Session::Authenticated { tokens } => Some(SessionContext {
                tokens: tokens.clone(),
            }),
            _ => None,
        }
    }

    pub fn tokens_mut(&mut self) -> Option<&mut TokenPair> {
        match self {
            Session::Authenticated { tokens } => Some(tokens),
            _ => None,
        }
    }

    pub fn pending_state(&self) -> Option<&str> {
        match self {
            Session::PendingCode { state } => Some(state),
            _ => None,
        }
    }
}

/// Explicit session data passed into every pipeline call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub tokens: TokenPair,
}

impl SessionContext {
    pub fn new(tokens: TokenPair) -> Self {
        Self { tokens }
    }

    pub fn access_token(&self) -> &str {
        &self.tokens.access_token
    }
}
