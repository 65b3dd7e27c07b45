//! # API Module
//!
//! HTTP endpoints of the local web server. They drive the session through the
//! authorization-code flow and trigger ingestion runs.
//!
//! ## Endpoints
//!
//! ### Authentication
//!
//! - [`index`] - starts the flow: fresh `state`, redirect to the provider
//! - [`callback`] - exchanges the returned code and stores the token pair
//! - [`refresh`] - replaces the session's access token
//! - [`logout`] - drops the session
//!
//! ### Ingestion
//!
//! - [`profile`] - runs the ingestion pipeline for the signed-in user
//!
//! ### Monitoring
//!
//! - [`health`] - application status and version
//!
//! Failures are returned as [`crate::error::PipelineError`], whose response
//! carries the upstream status or 400 when the session holds no tokens.

mod auth;
mod health;
mod profile;

pub use auth::callback;
pub use auth::index;
pub use auth::logout;
pub use auth::refresh;
pub use health::health;
pub use profile::profile;
