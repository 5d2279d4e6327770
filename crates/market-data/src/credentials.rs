//! Injected upstream credentials
//!
//! Token acquisition and refresh happen elsewhere; this module only carries
//! what the caller hands in and attaches it to requests.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Supplies the current bearer token
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Current access token, if one is available
    async fn access_token(&self) -> Option<String>;
}

/// Fixed token, e.g. from configuration
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn access_token(&self) -> Option<String> {
        Some(self.0.clone())
    }
}

/// Credentials attached to every chain request
#[derive(Clone, Default)]
pub struct Credentials {
    api_key: Option<String>,
    tokens: Option<Arc<dyn TokenProvider>>,
}

impl Credentials {
    /// No credentials
    pub fn none() -> Self {
        Self::default()
    }

    /// Add an `apikey` query parameter
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into()).filter(|k: &String| !k.is_empty());
        self
    }

    /// Add an `Authorization: Bearer` header sourced from `provider`
    pub fn with_token_provider(mut self, provider: Arc<dyn TokenProvider>) -> Self {
        self.tokens = Some(provider);
        self
    }

    /// Shorthand for a fixed bearer token
    pub fn with_bearer(self, token: impl Into<String>) -> Self {
        self.with_token_provider(Arc::new(StaticToken::new(token)))
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    /// Request headers for the current token
    pub async fn headers(&self) -> Vec<(String, String)> {
        let mut headers = vec![("Accept".to_string(), "application/json".to_string())];
        if let Some(provider) = &self.tokens {
            if let Some(token) = provider.access_token().await {
                headers.push(("Authorization".to_string(), format!("Bearer {}", token)));
            }
        }
        headers
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("bearer", &self.tokens.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_headers_include_bearer() {
        let creds = Credentials::none().with_api_key("KEY").with_bearer("tok");
        let headers = creds.headers().await;

        assert!(headers.contains(&("Authorization".to_string(), "Bearer tok".to_string())));
        assert_eq!(creds.api_key(), Some("KEY"));
    }

    #[tokio::test]
    async fn test_no_credentials() {
        let creds = Credentials::none().with_api_key("");
        assert_eq!(creds.api_key(), None);
        assert_eq!(creds.headers().await.len(), 1);
    }

    #[test]
    fn test_debug_redacts_key() {
        let creds = Credentials::none().with_api_key("SECRET");
        let rendered = format!("{:?}", creds);
        assert!(!rendered.contains("SECRET"));
        assert!(rendered.contains("<redacted>"));
    }
}
