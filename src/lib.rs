//! Spotify Taste Clustering Library
//!
//! This library authenticates a Spotify user through the OAuth 2.0 authorization
//! code flow, collects the audio features of their top and saved tracks,
//! standardizes them and stores them in a warehouse table on which a k-means
//! model is (re)trained.
//!
//! # Modules
//!
//! - `api` - HTTP handlers of the local web server
//! - `cli` - Command-line interface implementations
//! - `config` - Configuration loading into an immutable [`config::Config`]
//! - `error` - Error taxonomy shared by all components
//! - `management` - Session state and credential file management
//! - `pipeline` - Ingestion coordinator, normalizer and rate limiting
//! - `server` - Router construction and server startup
//! - `spotify` - Spotify Web API and OAuth client
//! - `types` - Data structures and type definitions
//! - `utils` - Utility functions and helpers
//! - `warehouse` - Warehouse sink trait, BigQuery and in-memory implementations
//!
//! # Example
//!
//! ```
//! use tastecluster::config;
//!
//! #[tokio::main]
//! async fn main() -> tastecluster::Res<()> {
//!     config::load_env().await?;
//!     let config = config::Config::from_env()?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod management;
pub mod pipeline;
pub mod server;
pub mod spotify;
pub mod types;
pub mod utils;
pub mod warehouse;

/// A convenient Result type alias for top-level plumbing.
///
/// Components return their own typed errors from [`error`]; this alias is used
/// where those are funneled together (startup, CLI commands).
pub type Res<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Prints an informational message with a blue bullet point.
///
/// # Example
///
/// ```
/// info!("Starting server on {}", addr);
/// ```
#[macro_export]
macro_rules! info {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "o".blue().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a success message with a green checkmark.
///
/// # Example
///
/// ```
/// success!("Inserted {} rows", count);
/// ```
#[macro_export]
macro_rules! success {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "✓".green().bold(), std::format_args!($($arg)*));
  })
}

/// Prints an error message with a red exclamation mark and exits the program.
///
/// Only meant for fatal startup failures. Request handlers never call it; they
/// turn failures into HTTP statuses instead.
///
/// # Example
///
/// ```
/// error!("Cannot load configuration: {}", e);
/// // Program exits here - code after this will not execute
/// ```
#[macro_export]
macro_rules! error {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".red().bold(), std::format_args!($($arg)*));
    std::process::exit(1);
  })
}

/// Prints a warning message with a yellow exclamation mark.
///
/// Every upstream failure is reported through this macro before it is
/// propagated to the caller.
///
/// # Example
///
/// ```
/// warning!("Failed to get profile info: {}", message);
/// ```
#[macro_export]
macro_rules! warning {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".yellow().bold(), std::format_args!($($arg)*));
  })
}
