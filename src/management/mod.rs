mod credentials;
mod session;

pub use credentials::CredentialStore;
pub use credentials::DEFAULT_GOOGLE_TOKEN_URI;
pub use credentials::Materialized;
pub use credentials::ServiceAccountKey;
pub use credentials::decode_blob;
pub use session::Session;
pub use session::SessionContext;
pub use session::SharedSession;
pub use session::shared_session;
