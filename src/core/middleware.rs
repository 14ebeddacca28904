use crate::auth::{AuthError, TokenProvider};
use http::Extensions;
use reqwest::{header, Request, Response};
use reqwest_middleware::{Middleware, Next};

/// Attaches `Authorization: Bearer <token>` from a shared [`TokenProvider`].
///
/// Token failures surface as [`reqwest_middleware::Error::Middleware`] wrapping the
/// [`AuthError`], which callers can downcast.
#[derive(Clone)]
pub struct AuthMiddleware {
    tokens: TokenProvider,
}

impl AuthMiddleware {
    pub fn new(tokens: TokenProvider) -> Self {
        Self { tokens }
    }
}

#[async_trait::async_trait]
impl Middleware for AuthMiddleware {
    async fn handle(
        &self,
        mut req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<Response> {
        let token = self
            .tokens
            .token()
            .await
            .map_err(|e| reqwest_middleware::Error::Middleware(anyhow::Error::new(e)))?;

        let mut value = header::HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|e| {
            reqwest_middleware::Error::Middleware(anyhow::Error::new(AuthError::MalformedResponse(
                format!("token is not a valid header value: {}", e),
            )))
        })?;
        value.set_sensitive(true);

        req.headers_mut().insert(header::AUTHORIZATION, value);

        next.run(req, extensions).await
    }
}
