//! Client configuration.

use folio_core::{defaults, Credentials, Error, Result};

/// Configuration for [`crate::ApiClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend base URL.
    pub base_url: String,
    /// Default bearer token used when the caller passes none.
    pub token: Option<String>,
    /// Default language used when the caller passes none.
    pub lang: Option<String>,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::API_URL.to_string(),
            token: None,
            lang: None,
            timeout_seconds: defaults::REQUEST_TIMEOUT_SECS,
        }
    }
}

impl ClientConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `FOLIO_API_URL` | `http://localhost:8080` | Backend base URL |
    /// | `FOLIO_API_TOKEN` | (none) | Bearer token |
    /// | `FOLIO_LANG` | (none) | `Accept-Language` value |
    /// | `FOLIO_TIMEOUT_SECS` | `30` | Request timeout |
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("FOLIO_API_URL")
                .unwrap_or_else(|_| defaults::API_URL.to_string()),
            token: std::env::var("FOLIO_API_TOKEN")
                .ok()
                .filter(|t| !t.is_empty()),
            lang: std::env::var("FOLIO_LANG").ok().filter(|l| !l.is_empty()),
            timeout_seconds: std::env::var("FOLIO_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults::REQUEST_TIMEOUT_SECS),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(Error::Config(format!(
                "base_url must start with http:// or https://, got: {}",
                self.base_url
            )));
        }
        if self.timeout_seconds == 0 {
            return Err(Error::Config("timeout_seconds must be positive".to_string()));
        }
        Ok(())
    }

    /// Fill unset fields of `creds` from the configured defaults.
    pub fn resolve(&self, creds: &Credentials) -> Credentials {
        Credentials {
            token: creds.token.clone().or_else(|| self.token.clone()),
            lang: creds.lang.clone().or_else(|| self.lang.clone()),
        }
    }
}
