//! Account endpoints: login, registration and the current user.
//!
//! The token returned by [`AuthService::login`] is not stored here. Callers
//! decide where it goes, e.g. a [`TokenFile`](crate::credentials::TokenFile).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::client::{ApiClient, ClientError};

/// Issued access token.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Lifetime in seconds.
    pub expires_in: u64,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// A user account.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RegisterRequest<'a> {
    username: &'a str,
    email: &'a str,
    password: &'a str,
}

/// Account operations.
#[derive(Debug, Clone)]
pub struct AuthService {
    client: ApiClient,
}

impl AuthService {
    /// Create a service on top of `client`.
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Exchange credentials for an access token.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Unauthorized`] for bad credentials, or another
    /// [`ClientError`] if the request fails.
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenResponse, ClientError> {
        let token: TokenResponse = self
            .client
            .post("/login", &LoginRequest { username, password })
            .await?;
        tracing::info!(username, expires_in = token.expires_in, "auth: logged in");
        Ok(token)
    }

    /// Create an account.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the backend rejects the registration.
    pub async fn register(&self, username: &str, email: &str, password: &str) -> Result<User, ClientError> {
        self.client
            .post(
                "/register",
                &RegisterRequest {
                    username,
                    email,
                    password,
                },
            )
            .await
    }

    /// The account the current token belongs to.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the request fails.
    pub async fn me(&self) -> Result<User, ClientError> {
        self.client.get("/me").await
    }
}
