//! NaijaCal backend HTTP client.
//!
//! Thin typed wrapper over the four backend calls:
//! - `GET /me` (bearer): validate a session token
//! - `POST /register`: create an account and receive a token
//! - `POST /api/token/`: log in and receive a token
//! - `POST /parse-log` (bearer): parse a free-text food log
//!
//! Every failure is classified into an [`ApiError`]; nothing here touches
//! session state.

mod errors;
mod types;

use std::time::Duration;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;

pub use errors::{ApiError, ApiErrorKind, body_message};
pub use types::{
    CredentialsRequest, FoodItem, ParseLogRequest, ParseResult, Profile, TokenResponse,
};

/// Standard User-Agent header for NaijaCal API requests.
pub const USER_AGENT: &str = concat!("naijacal/", env!("CARGO_PKG_VERSION"));

const ME_PATH: &str = "/me";
const REGISTER_PATH: &str = "/register";
const TOKEN_PATH: &str = "/api/token/";
const PARSE_LOG_PATH: &str = "/parse-log";

/// Backend client bound to one base URL.
#[derive(Debug, Clone)]
pub struct BackendClient {
    base_url: String,
    http: reqwest::Client,
}

impl BackendClient {
    /// Creates a client for `base_url` with an optional per-request timeout.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(base_url: impl Into<String>, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().context("Failed to build HTTP client")?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Fetches the profile for `token`.
    ///
    /// # Errors
    /// Returns an [`ApiError`] on non-2xx, transport failure, or a malformed body.
    pub async fn me(&self, token: &str) -> Result<Profile, ApiError> {
        tracing::debug!("GET {ME_PATH}");
        let request = self.http.get(self.url(ME_PATH)).bearer_auth(token);
        send_json(request).await
    }

    /// Creates an account.
    ///
    /// # Errors
    /// Returns an [`ApiError`] on non-2xx, transport failure, or a malformed body.
    pub async fn register(
        &self,
        username: &str,
        password: &str,
        email: Option<&str>,
    ) -> Result<TokenResponse, ApiError> {
        tracing::debug!(username, "POST {REGISTER_PATH}");
        let body = CredentialsRequest {
            username,
            password,
            email,
        };
        let request = self.http.post(self.url(REGISTER_PATH)).json(&body);
        send_json(request).await
    }

    /// Exchanges username and password for a token.
    ///
    /// # Errors
    /// Returns an [`ApiError`] on non-2xx, transport failure, or a malformed body.
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenResponse, ApiError> {
        tracing::debug!(username, "POST {TOKEN_PATH}");
        let body = CredentialsRequest {
            username,
            password,
            email: None,
        };
        let request = self.http.post(self.url(TOKEN_PATH)).json(&body);
        send_json(request).await
    }

    /// Submits a food log for parsing.
    ///
    /// # Errors
    /// Returns an [`ApiError`] on non-2xx, transport failure, or a malformed body.
    pub async fn parse_log(&self, token: &str, food_log: &str) -> Result<ParseResult, ApiError> {
        tracing::debug!(chars = food_log.len(), "POST {PARSE_LOG_PATH}");
        let request = self
            .http
            .post(self.url(PARSE_LOG_PATH))
            .bearer_auth(token)
            .json(&ParseLogRequest { food_log });
        let result: ParseResult = send_json(request).await?;
        result.validate().map_err(ApiError::decode)?;
        Ok(result)
    }
}

async fn send_json<T: DeserializeOwned>(request: reqwest::RequestBuilder) -> Result<T, ApiError> {
    let response = request
        .send()
        .await
        .map_err(|e| errors::classify_reqwest_error(&e))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        tracing::debug!(status = status.as_u16(), "backend returned error status");
        return Err(ApiError::http_status(status.as_u16(), &body));
    }

    let body = response
        .text()
        .await
        .map_err(|e| errors::classify_reqwest_error(&e))?;
    serde_json::from_str(&body).map_err(|e| ApiError::decode(format!("Invalid response body: {e}")))
}

/// Base URL of a local port with nothing listening on it.
#[cfg(test)]
pub(crate) fn unreachable_uri() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}
