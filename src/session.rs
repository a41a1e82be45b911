//! Shared HTTP session
//!
//! A [`Session`] is built once and handed by reference to every
//! [`Resource`](crate::resource::Resource). It owns the connection pool and the
//! authentication header, both read-only for the lifetime of the session.
//! Credentials are rotated by building a new session between batches.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::executor::TaskExecutor;
use crate::query::RequestDescriptor;
use crate::retry::with_retry;
use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use url::Url;

/// Opaque authentication header attached to every request
#[derive(Clone, PartialEq, Eq)]
pub struct AuthHeader {
    /// Header name, e.g. `Authorization`
    pub name: String,
    /// Header value, e.g. `Bearer <token>`
    pub value: String,
}

impl AuthHeader {
    /// Arbitrary header
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// `Authorization: Bearer <token>`
    pub fn bearer(token: impl AsRef<str>) -> Self {
        Self::new("Authorization", format!("Bearer {}", token.as_ref()))
    }

    /// Header value without any `Bearer ` scheme, as form-encoded writes expect it
    pub fn token(&self) -> &str {
        self.value.strip_prefix("Bearer ").unwrap_or(&self.value)
    }
}

impl fmt::Debug for AuthHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthHeader")
            .field("name", &self.name)
            .field("value", &"<redacted>")
            .finish()
    }
}

/// Configured HTTP client shared by all resources
///
/// Cloning is cheap and shares the underlying connection pool.
#[derive(Clone)]
pub struct Session {
    config: Arc<Config>,
    client: reqwest::Client,
    auth: Option<AuthHeader>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("api_url", &self.config.api_url)
            .field("auth", &self.auth)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Build a session from `config`, sending `auth` with every request
    ///
    /// # Errors
    /// [`Error::Config`] if the configuration is invalid or the auth header
    /// is not a legal HTTP header.
    pub fn new(mut config: Config, auth: Option<AuthHeader>) -> Result<Self> {
        config.normalize();
        config.validate()?;

        let mut headers = HeaderMap::new();
        if let Some(auth) = &auth {
            let name = HeaderName::from_bytes(auth.name.as_bytes()).map_err(|e| {
                Error::config(format!("invalid auth header name: {e}"), Some("auth.name"))
            })?;
            let mut value = HeaderValue::from_str(&auth.value).map_err(|e| {
                Error::config(format!("invalid auth header value: {e}"), Some("auth.value"))
            })?;
            value.set_sensitive(true);
            headers.insert(name, value);
        }

        if !config.ssl_verify {
            tracing::warn!(api_url = %config.api_url, "TLS certificate verification disabled");
        }

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .danger_accept_invalid_certs(!config.ssl_verify)
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            config: Arc::new(config),
            client,
            auth,
        })
    }

    /// Session with default configuration
    pub fn with_auth(auth: AuthHeader) -> Result<Self> {
        Self::new(Config::default(), Some(auth))
    }

    /// Active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// API root without trailing slash
    pub fn api_url(&self) -> &str {
        &self.config.api_url
    }

    /// Authentication header, if any
    pub fn auth(&self) -> Option<&AuthHeader> {
        self.auth.as_ref()
    }

    /// Executor sized by `max_concurrency`
    pub(crate) fn executor(&self) -> Result<TaskExecutor> {
        TaskExecutor::new(self.config.max_concurrency)
    }

    /// GET `url` and decode the body as JSON
    ///
    /// Transient failures are retried per [`RetryConfig`](crate::config::RetryConfig).
    pub async fn get_json(&self, url: &str) -> Result<Value> {
        with_retry(&self.config.retry, || async {
            let response = self.send(self.client.get(url)).await?;
            let body = response.bytes().await?;
            Ok::<Value, Error>(serde_json::from_slice(&body)?)
        })
        .await
    }

    /// GET `url`, following redirects, and return the final URL with the body
    pub async fn get_media(&self, url: &str) -> Result<(Url, Vec<u8>)> {
        with_retry(&self.config.retry, || async {
            let response = self.send(self.client.get(url)).await?;
            let final_url = response.url().clone();
            let body = response.bytes().await?;
            tracing::debug!(url, final_url = %final_url, bytes = body.len(), "Fetched media");
            Ok::<_, Error>((final_url, body.to_vec()))
        })
        .await
    }

    /// Send `request` with `form` as an urlencoded body and decode the JSON reply
    ///
    /// An empty reply body decodes to [`Value::Null`]. `POST` is sent once;
    /// every other method is retried like a read.
    pub async fn submit(&self, request: &RequestDescriptor, form: &[(String, String)]) -> Result<Value> {
        let url = request.url();
        let attempt = || async {
            let mut builder = self.client.request(request.method.clone(), &url);
            if !form.is_empty() {
                builder = builder.form(form);
            }
            let body = self.send(builder).await?.bytes().await?;
            if body.is_empty() {
                return Ok::<Value, Error>(Value::Null);
            }
            Ok(serde_json::from_slice(&body)?)
        };

        if request.method == Method::POST {
            attempt().await
        } else {
            with_retry(&self.config.retry, attempt).await
        }
    }

    /// `access_token` form field for writes, when the session is authenticated
    pub(crate) fn access_token_field(&self) -> Option<(String, String)> {
        self.auth
            .as_ref()
            .map(|auth| ("access_token".to_string(), auth.token().to_string()))
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Http {
                status: status.as_u16(),
                url: response.url().to_string(),
            });
        }
        Ok(response)
    }
}
