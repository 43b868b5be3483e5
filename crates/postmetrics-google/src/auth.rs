//! Bearer tokens for the Drive and Sheets APIs.

use async_trait::async_trait;
use gcp_auth::{CustomServiceAccount, TokenProvider as _};

use crate::error::GoogleError;

/// OAuth scopes requested for every token: read/write spreadsheets and
/// full Drive access (folders are shared with the service account).
pub const SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/spreadsheets",
    "https://www.googleapis.com/auth/drive",
];

/// Supplies an access token for each outgoing request.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// # Errors
    ///
    /// Returns [`GoogleError::Auth`] when no token can be obtained.
    async fn access_token(&self) -> Result<String, GoogleError>;
}

/// Tokens minted from a service-account JSON key. `gcp_auth` caches each
/// token until shortly before it expires.
pub struct ServiceAccountTokens {
    account: CustomServiceAccount,
}

impl ServiceAccountTokens {
    /// Parses the key JSON (the full contents of the downloaded key file).
    ///
    /// # Errors
    ///
    /// Returns [`GoogleError::Auth`] if the JSON is not a service-account key.
    pub fn from_json(json: &str) -> Result<Self, GoogleError> {
        let account = CustomServiceAccount::from_json(json)
            .map_err(|e| GoogleError::Auth(format!("invalid service-account key: {e}")))?;
        Ok(Self { account })
    }
}

#[async_trait]
impl TokenSource for ServiceAccountTokens {
    async fn access_token(&self) -> Result<String, GoogleError> {
        let token = self
            .account
            .token(SCOPES)
            .await
            .map_err(|e| GoogleError::Auth(e.to_string()))?;
        Ok(token.as_str().to_owned())
    }
}

/// A fixed token, e.g. one printed by `gcloud auth print-access-token`.
#[derive(Clone)]
pub struct StaticToken(String);

impl StaticToken {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl std::fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StaticToken([redacted])")
    }
}

#[async_trait]
impl TokenSource for StaticToken {
    async fn access_token(&self) -> Result<String, GoogleError> {
        Ok(self.0.clone())
    }
}
