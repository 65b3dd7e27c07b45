//! # CLI Module
//!
//! User-facing commands of the `tastecluster` binary.
//!
//! - [`serve`] - runs the local web server that drives authorization and ingestion
//! - [`auth_url`] - prints the authorization URL without starting the server
//!
//! Fatal setup problems (bad configuration, unusable credentials) end the
//! process through the `error!` macro; everything after startup reports
//! failures as HTTP responses instead.
//!
//! ```bash
//! tastecluster serve --open          # sign in from the browser
//! tastecluster serve --in-memory     # no warehouse credentials needed
//! tastecluster auth-url
//! ```

mod auth_url;
mod serve;

pub use auth_url::auth_url;
pub use serve::serve;

use crate::{config::Config, error};

/// Reads the configuration from the environment or exits.
fn load_config() -> Config {
    match Config::from_env() {
        Ok(config) => config,
        Err(e) => error!("Invalid configuration: {}", e),
    }
}
