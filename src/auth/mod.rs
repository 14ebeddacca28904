//! Bearer tokens for the Firestore REST API.
//!
//! A [`TokenSource`] performs one round trip to an identity provider. The [`TokenProvider`]
//! wraps a source with caching and collapses concurrent refreshes into a single request.

pub mod provider;
pub mod service_account;


pub use self::provider::TokenProvider;
pub use self::service_account::ServiceAccountTokenSource;

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

/// Scopes requested for service account tokens.
pub const FIRESTORE_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/cloud-platform",
    "https://www.googleapis.com/auth/datastore",
];

/// Errors that can occur while obtaining a bearer token.
///
/// `Clone` so that a shared refresh can hand the same failure to every waiting caller.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AuthError {
    /// The private key could not be parsed or used for signing.
    #[error("Invalid private key: {0}")]
    InvalidKey(String),
    /// The identity provider could not be reached.
    #[error("Token request failed: {0}")]
    RequestError(String),
    /// The identity provider rejected the credentials.
    #[error("Token request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },
    /// The identity provider answered with something that is not a token.
    #[error("Malformed token response: {0}")]
    MalformedResponse(String),
}

/// A bearer token and the moment it stops being valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    token: String,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    /// Tokens are treated as expired this many seconds before their real expiry.
    pub const EXPIRY_MARGIN_SECS: i64 = 60;

    pub fn new(token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            token: token.into(),
            expires_at,
        }
    }

    /// A token valid for `expires_in_secs` from now.
    pub fn expiring_in(token: impl Into<String>, expires_in_secs: i64) -> Self {
        Self::new(token, Utc::now() + Duration::seconds(expires_in_secs))
    }

    pub fn as_str(&self) -> &str {
        &self.token
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Whether the token can still be sent at `now`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(Self::EXPIRY_MARGIN_SECS) < self.expires_at
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }
}

/// One round trip to an identity provider.
#[async_trait::async_trait]
pub trait TokenSource: Send + Sync {
    async fn fetch_token(&self) -> Result<AccessToken, AuthError>;
}
