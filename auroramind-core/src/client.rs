//! HTTP client for the AuroraMind REST API.
//!
//! Every endpoint answers with the envelope `{ code, message, data }`.
//! [`ApiClient`] attaches the bearer token, maps transport and status
//! failures onto [`ClientError`], and unwraps the envelope.

use std::sync::Arc;

use reqwest::Method;
use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::credentials::{CredentialProvider, resolve_credentials};

/// Path prefix shared by every versioned endpoint.
const API_PREFIX: &str = "/api/v1";

/// Error type for API operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Request failed due to network or connection issues.
    #[error("request failed: {0}")]
    RequestFailed(String),

    /// The server rejected the credentials (HTTP 401).
    #[error("authentication failed: {0}")]
    Unauthorized(String),

    /// The server answered with a non-success status.
    #[error("HTTP {status}: {reason}")]
    Http {
        /// Numeric status code.
        status: u16,
        /// Canonical status text, followed by the server's detail if any.
        reason: String,
    },

    /// The envelope carried a failure code.
    #[error("API error {code}: {message}")]
    Api {
        /// Application-level code from the envelope.
        code: i64,
        /// Message from the envelope.
        message: String,
    },

    /// The envelope had no `data` where one was required.
    #[error("response from {0} carried no data")]
    MissingData(String),

    /// The response body could not be decoded.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// The event stream broke off mid-response.
    #[error("stream interrupted: {0}")]
    Stream(String),
}

/// Standard response envelope.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    code: i64,
    #[serde(default)]
    message: String,
    data: Option<T>,
}

/// Whether an envelope `code` means success. The backend sends `200`;
/// older handlers sent `0`.
fn is_success_code(code: i64) -> bool {
    code == 0 || (200..300).contains(&code)
}

impl<T: DeserializeOwned> Envelope<T> {
    fn into_data(self, path: &str) -> Result<T, ClientError> {
        if !is_success_code(self.code) {
            return Err(ClientError::Api {
                code: self.code,
                message: self.message,
            });
        }
        match self.data {
            Some(data) => Ok(data),
            // Lets `()` and `Option<_>` accept a null payload.
            None => serde_json::from_value(serde_json::Value::Null)
                .map_err(|_| ClientError::MissingData(path.to_string())),
        }
    }
}

/// Authenticated client for one AuroraMind backend.
///
/// Cloning is cheap; clones share the connection pool and credentials.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use auroramind_core::client::ApiClient;
/// use auroramind_core::credentials::StaticCredentials;
///
/// let client = ApiClient::new(
///     "http://127.0.0.1:8080",
///     Arc::new(StaticCredentials::new("token")),
/// );
/// assert_eq!(client.url("/goals"), "http://127.0.0.1:8080/api/v1/goals");
/// ```
#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    credentials: Arc<dyn CredentialProvider>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a client for the backend at `base_url`.
    pub fn new(base_url: impl Into<String>, credentials: Arc<dyn CredentialProvider>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: reqwest::Client::new(),
            base_url,
            credentials,
        }
    }

    /// Create a client from configuration, resolving credentials with
    /// [`resolve_credentials`].
    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.api_base, resolve_credentials(config))
    }

    /// Absolute URL of an API path such as `/goals`.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, API_PREFIX, path)
    }

    /// `GET` a path and unwrap the envelope.
    ///
    /// # Errors
    ///
    /// See [`ClientError`].
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let response = self.send(self.request(Method::GET, path).await).await?;
        Self::decode(response, path).await
    }

    /// `POST` a JSON body and unwrap the envelope.
    ///
    /// # Errors
    ///
    /// See [`ClientError`].
    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let builder = self.request(Method::POST, path).await.json(body);
        let response = self.send(builder).await?;
        Self::decode(response, path).await
    }

    /// `PUT` a JSON body and unwrap the envelope.
    ///
    /// # Errors
    ///
    /// See [`ClientError`].
    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let builder = self.request(Method::PUT, path).await.json(body);
        let response = self.send(builder).await?;
        Self::decode(response, path).await
    }

    /// `DELETE` a path. An empty body counts as success; otherwise only the
    /// envelope code is checked.
    ///
    /// # Errors
    ///
    /// See [`ClientError`].
    pub async fn delete(&self, path: &str) -> Result<(), ClientError> {
        let response = self.send(self.request(Method::DELETE, path).await).await?;
        let body = response
            .text()
            .await
            .map_err(|e| ClientError::RequestFailed(e.to_string()))?;
        if body.trim().is_empty() {
            return Ok(());
        }
        let envelope: Envelope<serde_json::Value> =
            serde_json::from_str(&body).map_err(|e| ClientError::Decode(e.to_string()))?;
        envelope.into_data(path).map(|_| ())
    }

    /// `GET` a path and return the raw body, for file downloads.
    ///
    /// # Errors
    ///
    /// See [`ClientError`].
    pub async fn get_bytes(&self, path: &str) -> Result<Vec<u8>, ClientError> {
        let response = self.send(self.request(Method::GET, path).await).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ClientError::RequestFailed(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    /// `POST` a JSON body and return the successful response unread, for
    /// streaming endpoints.
    ///
    /// # Errors
    ///
    /// Fails before any of the body is read if the status is not a success.
    pub async fn post_stream<B>(&self, path: &str, body: &B) -> Result<reqwest::Response, ClientError>
    where
        B: Serialize + ?Sized,
    {
        let builder = self.request(Method::POST, path).await.json(body);
        self.send(builder).await
    }

    /// `POST` a multipart form and unwrap the envelope.
    ///
    /// The `Content-Type` header, with its boundary, is set by the form.
    ///
    /// # Errors
    ///
    /// See [`ClientError`].
    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
    ) -> Result<T, ClientError> {
        let builder = self.authorized(Method::POST, path).await.multipart(form);
        let response = self.send(builder).await?;
        Self::decode(response, path).await
    }

    /// Start a request with the JSON content type and, when available, the
    /// bearer token.
    async fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        self.authorized(method, path)
            .await
            .header(CONTENT_TYPE, "application/json")
    }

    /// Start a request carrying only the bearer token, if any.
    async fn authorized(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = self.url(path);
        tracing::debug!(%method, url = %url, "client: request");
        let builder = self.client.request(method, url);
        match self.credentials.token().await {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send a request and map transport and status failures.
    async fn send(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Response, ClientError> {
        let response = builder
            .send()
            .await
            .map_err(|e| ClientError::RequestFailed(e.to_string()))?;

        let status = response.status();
        tracing::debug!(status = status.as_u16(), "client: response status");
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let detail = error_detail(&body);
        let status_text = status.canonical_reason().unwrap_or("Unknown Status");

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ClientError::Unauthorized(
                detail.unwrap_or_else(|| status_text.to_string()),
            ));
        }

        let reason = match detail {
            Some(detail) => format!("{status_text}: {detail}"),
            None => status_text.to_string(),
        };
        Err(ClientError::Http {
            status: status.as_u16(),
            reason,
        })
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response, path: &str) -> Result<T, ClientError> {
        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))?;
        envelope.into_data(path)
    }
}

/// Pull a human-readable message out of an error body. FastAPI sends
/// `{"detail": ...}`; the envelope sends `{"message": ...}`.
fn error_detail(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(value) => {
            let detail = value.get("detail").or_else(|| value.get("message"))?;
            Some(match detail {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            })
        }
        Err(_) => Some(body.chars().take(200).collect()),
    }
}
