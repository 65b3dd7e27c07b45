use std::path::{Path, PathBuf};

use base64::{Engine, engine::general_purpose::STANDARD};
use serde::Deserialize;

use crate::{error::CredentialError, info};

pub const DEFAULT_GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Result of [`CredentialStore::materialize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Materialized {
    /// The file existed and was left untouched.
    AlreadyPresent,
    Written,
}

/// Writes the out-of-band service-account blob to a well-known file once.
///
/// Only an existence check guards the write, so concurrent process starts may
/// race; a single running instance is assumed.
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Materializes `blob` at the store's path unless a file is already there.
    ///
    /// The blob may be raw JSON or base64 of JSON. Parent directories are
    /// created as needed. An existing file is never overwritten, so a blob
    /// only matters on the first start.
    ///
    /// # Arguments
    ///
    /// * `blob` - The `CREDENTIALS` value, if set
    ///
    /// # Returns
    ///
    /// [`Materialized::Written`] when the file was created from the blob, or
    /// [`Materialized::AlreadyPresent`] when a file was found at the path.
    ///
    /// # Errors
    ///
    /// - [`CredentialError::Missing`] when there is neither a file nor a blob
    /// - [`CredentialError::Malformed`] when the blob does not decode to a JSON
    ///   object; nothing is written in that case
    /// - [`CredentialError::Io`] when the file or its directory cannot be written
    pub async fn materialize(&self, blob: Option<&str>) -> Result<Materialized, CredentialError> {
        if self.exists() {
            info!("Credentials file {} already exists.", self.path.display());
            return Ok(Materialized::AlreadyPresent);
        }

        let Some(blob) = blob else {
            return Err(CredentialError::Missing(self.path.display().to_string()));
        };

        let json = decode_blob(blob)?;

        if let Some(parent) = self.path.parent() {
            async_fs::create_dir_all(parent).await?;
        }
        async_fs::write(&self.path, json).await?;

        info!("Credentials written to {}.", self.path.display());
        Ok(Materialized::Written)
    }

    pub async fn load_service_account(&self) -> Result<ServiceAccountKey, CredentialError> {
        ServiceAccountKey::load(&self.path).await
    }
}

/// Normalizes a credential blob to pretty JSON text.
pub fn decode_blob(blob: &str) -> Result<String, CredentialError> {
    let trimmed = blob.trim();

    let value: serde_json::Value = match serde_json::from_str(trimmed) {
        Ok(value) => value,
        Err(_) => {
            let bytes = STANDARD
                .decode(trimmed)
                .map_err(|_| CredentialError::Malformed)?;
            serde_json::from_slice(&bytes).map_err(|_| CredentialError::Malformed)?
        }
    };

    if !value.is_object() {
        return Err(CredentialError::Malformed);
    }

    serde_json::to_string_pretty(&value).map_err(|_| CredentialError::Malformed)
}

/// The fields of a Google service-account key file the warehouse needs.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    pub project_id: Option<String>,
}

impl ServiceAccountKey {
    pub async fn load(path: &Path) -> Result<Self, CredentialError> {
        let content = async_fs::read_to_string(path).await?;
        serde_json::from_str(&content).map_err(|_| CredentialError::Malformed)
    }
}

fn default_token_uri() -> String {
    DEFAULT_GOOGLE_TOKEN_URI.to_string()
}
