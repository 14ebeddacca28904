use super::{AccessToken, AuthError, TokenSource, FIRESTORE_SCOPES};
use crate::config::FirestoreConfig;
use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::header;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Lifetime requested for each signed assertion.
const ASSERTION_LIFETIME_SECS: i64 = 3600;

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Claims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
    #[serde(default)]
    token_type: Option<String>,
}

#[derive(Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Exchanges a signed service account assertion for an OAuth2 access token.
pub struct ServiceAccountTokenSource {
    client: Client,
    client_email: String,
    private_key: String,
    private_key_id: Option<String>,
    token_uri: String,
    scopes: Vec<String>,
}

impl ServiceAccountTokenSource {
    pub fn new(
        client_email: impl Into<String>,
        private_key: impl Into<String>,
        token_uri: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            client_email: client_email.into(),
            private_key: private_key.into(),
            private_key_id: None,
            token_uri: token_uri.into(),
            scopes: FIRESTORE_SCOPES.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn from_config(config: &FirestoreConfig) -> Self {
        let source = Self::new(
            config.client_email.clone(),
            config.private_key.clone(),
            config.token_uri.clone(),
        );
        match &config.private_key_id {
            Some(id) => source.with_private_key_id(id.clone()),
            None => source,
        }
    }

    /// Sets the `kid` header of signed assertions.
    pub fn with_private_key_id(mut self, private_key_id: impl Into<String>) -> Self {
        self.private_key_id = Some(private_key_id.into());
        self
    }

    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub(crate) fn claims(&self, issued_at: i64) -> Claims {
        Claims {
            iss: self.client_email.clone(),
            scope: self.scopes.join(" "),
            aud: self.token_uri.clone(),
            iat: issued_at,
            exp: issued_at + ASSERTION_LIFETIME_SECS,
        }
    }

    /// Signs an RS256 assertion issued at `issued_at` (seconds since the epoch).
    pub(crate) fn assertion(&self, issued_at: i64) -> Result<String, AuthError> {
        let key = EncodingKey::from_rsa_pem(self.private_key.as_bytes())
            .map_err(|e| AuthError::InvalidKey(e.to_string()))?;

        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.private_key_id.clone();

        encode(&header, &self.claims(issued_at), &key)
            .map_err(|e| AuthError::InvalidKey(e.to_string()))
    }
}

#[async_trait]
impl TokenSource for ServiceAccountTokenSource {
    async fn fetch_token(&self) -> Result<AccessToken, AuthError> {
        let assertion = self.assertion(Utc::now().timestamp())?;

        let body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("grant_type", JWT_BEARER_GRANT)
            .append_pair("assertion", &assertion)
            .finish();

        debug!(token_uri = %self.token_uri, "requesting access token");
        let response = self
            .client
            .post(&self.token_uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await
            .map_err(|e| AuthError::RequestError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<TokenErrorResponse>(&text) {
                Ok(err) => match err.error_description {
                    Some(description) => format!("{}: {}", err.error, description),
                    None => err.error,
                },
                Err(_) => text,
            };
            warn!(status = status.as_u16(), %message, "token request rejected");
            return Err(AuthError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::MalformedResponse(e.to_string()))?;

        if token.access_token.is_empty() {
            return Err(AuthError::MalformedResponse(
                "empty access_token".to_string(),
            ));
        }
        if let Some(kind) = &token.token_type {
            if !kind.eq_ignore_ascii_case("bearer") {
                return Err(AuthError::MalformedResponse(format!(
                    "unsupported token_type {}",
                    kind
                )));
            }
        }

        Ok(AccessToken::expiring_in(token.access_token, token.expires_in))
    }
}
