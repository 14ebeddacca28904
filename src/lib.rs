//! Typed access to Cloud Firestore over its REST API, authenticated as a service account.
//!
//! ```rust,no_run
//! use firestore_rest::{FirestoreApp, FirestoreConfig};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! #[serde(rename_all = "camelCase")]
//! struct Post {
//!     title: String,
//!     sub_title: String,
//! }
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let app = FirestoreApp::new(FirestoreConfig::from_env()?);
//! let firestore = app.firestore();
//!
//! let post = Post { title: "A title".into(), sub_title: "A subtitle".into() };
//! let created = firestore.create_document("posts", Some("first"), &post).await?;
//! let read = firestore.get_document::<Post>(created.path()).await?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod core;
pub mod firestore;

pub use auth::{AccessToken, AuthError, TokenProvider, TokenSource};
pub use config::{ConfigError, FirestoreConfig};
pub use firestore::codec::{from_fields, to_fields, DecodeError, EncodeError, FieldMask};
pub use firestore::models::{Document, DocumentPage, Fields, Value};
pub use firestore::types::{timestamp, GeoPoint, Reference, Timestamp};
pub use firestore::{FirestoreClient, FirestoreError};

/// Shared state of an application talking to one Firestore project.
///
/// Holds the configuration and a single [`TokenProvider`]; every client handed out shares
/// that provider, so the whole application refreshes one token.
#[derive(Clone)]
pub struct FirestoreApp {
    config: FirestoreConfig,
    tokens: TokenProvider,
}

impl FirestoreApp {
    pub fn new(config: FirestoreConfig) -> Self {
        let tokens = TokenProvider::from_config(&config);
        Self { config, tokens }
    }

    /// Uses a custom token provider, e.g. one backed by a metadata server.
    pub fn with_token_provider(config: FirestoreConfig, tokens: TokenProvider) -> Self {
        Self { config, tokens }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self::new(FirestoreConfig::from_env()?))
    }

    pub fn config(&self) -> &FirestoreConfig {
        &self.config
    }

    pub fn token_provider(&self) -> &TokenProvider {
        &self.tokens
    }

    pub async fn token(&self) -> Result<String, AuthError> {
        self.tokens.token().await
    }

    pub fn firestore(&self) -> FirestoreClient {
        FirestoreClient::new(&self.config, self.tokens.clone())
    }
}
