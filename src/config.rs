//! Service account identity and connection settings.

use std::fmt;
use std::path::Path;
use thiserror::Error;
use yup_oauth2::ServiceAccountKey;

/// OAuth2 token endpoint used when the key does not name one.
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Transient failures are retried this many times unless configured otherwise.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

pub const ENV_PROJECT_ID: &str = "FIRESTORE_PROJECT_ID";
pub const ENV_CLIENT_EMAIL: &str = "FIRESTORE_CLIENT_EMAIL";
pub const ENV_PRIVATE_KEY: &str = "FIRESTORE_PRIVATE_KEY";
pub const ENV_PRIVATE_KEY_ID: &str = "FIRESTORE_PRIVATE_KEY_ID";
pub const ENV_TOKEN_URI: &str = "FIRESTORE_TOKEN_URI";
pub const ENV_BASE_URL: &str = "FIRESTORE_BASE_URL";
pub const ENV_MAX_RETRIES: &str = "FIRESTORE_MAX_RETRIES";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing configuration value {0}")]
    Missing(&'static str),
    #[error("Invalid configuration value {name}: {message}")]
    Invalid { name: &'static str, message: String },
    #[error("Service account key has no project_id")]
    ProjectIdMissing,
    #[error("Failed to read service account key: {0}")]
    KeyFile(#[from] std::io::Error),
    #[error("Failed to parse service account key: {0}")]
    KeyFormat(#[from] serde_json::Error),
}

/// Everything needed to talk to one project's default database.
#[derive(Clone)]
pub struct FirestoreConfig {
    pub project_id: String,
    pub client_email: String,
    pub private_key: String,
    pub private_key_id: Option<String>,
    pub token_uri: String,
    /// Overrides the documents endpoint, e.g. for an emulator.
    pub base_url: Option<String>,
    pub max_retries: u32,
}

impl fmt::Debug for FirestoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FirestoreConfig")
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .field("private_key_id", &self.private_key_id)
            .field("token_uri", &self.token_uri)
            .field("base_url", &self.base_url)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

impl FirestoreConfig {
    pub fn new(
        project_id: impl Into<String>,
        client_email: impl Into<String>,
        private_key: impl Into<String>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            client_email: client_email.into(),
            private_key: private_key.into(),
            private_key_id: None,
            token_uri: DEFAULT_TOKEN_URI.to_string(),
            base_url: None,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    pub fn with_private_key_id(mut self, private_key_id: impl Into<String>) -> Self {
        self.private_key_id = Some(private_key_id.into());
        self
    }

    pub fn with_token_uri(mut self, token_uri: impl Into<String>) -> Self {
        self.token_uri = token_uri.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn from_service_account_key(key: ServiceAccountKey) -> Result<Self, ConfigError> {
        let project_id = key.project_id.ok_or(ConfigError::ProjectIdMissing)?;
        let token_uri = if key.token_uri.is_empty() {
            DEFAULT_TOKEN_URI.to_string()
        } else {
            key.token_uri
        };

        Ok(Self {
            project_id,
            client_email: key.client_email,
            private_key: key.private_key,
            private_key_id: key.private_key_id,
            token_uri,
            base_url: None,
            max_retries: DEFAULT_MAX_RETRIES,
        })
    }

    /// Parses the JSON key downloaded from the cloud console.
    pub fn from_service_account_json(json: &str) -> Result<Self, ConfigError> {
        let key: ServiceAccountKey = serde_json::from_str(json)?;
        Self::from_service_account_key(key)
    }

    pub async fn from_service_account_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let key = yup_oauth2::read_service_account_key(path).await?;
        Self::from_service_account_key(key)
    }

    /// Reads the `FIRESTORE_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|value| !value.trim().is_empty())
                .ok_or(ConfigError::Missing(name))
        };

        let mut config = Self::new(
            required(ENV_PROJECT_ID)?,
            required(ENV_CLIENT_EMAIL)?,
            // Keys pasted into a single line keep their newlines escaped
            required(ENV_PRIVATE_KEY)?.replace("\\n", "\n"),
        );

        config.private_key_id = lookup(ENV_PRIVATE_KEY_ID).filter(|s| !s.is_empty());
        config.base_url = lookup(ENV_BASE_URL).filter(|s| !s.is_empty());
        if let Some(token_uri) = lookup(ENV_TOKEN_URI).filter(|s| !s.is_empty()) {
            config.token_uri = token_uri;
        }
        if let Some(retries) = lookup(ENV_MAX_RETRIES) {
            config.max_retries = retries
                .trim()
                .parse()
                .map_err(|e: std::num::ParseIntError| ConfigError::Invalid {
                    name: ENV_MAX_RETRIES,
                    message: e.to_string(),
                })?;
        }

        Ok(config)
    }
}
