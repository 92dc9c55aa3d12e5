//! Common utilities for the Brightbox API client
//!
//! Provides the authenticated HTTP wrapper shared by every resource call.

use crate::config::{ClientConfig, Credentials};
use crate::error::BrightboxError;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::{Client, Method, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use tracing::debug;

/// API version prefix for every resource path
pub const API_VERSION: &str = "1.0";

/// OAuth2 scope requested for every token
const TOKEN_SCOPE: &str = "infrastructure";

/// Refresh tokens this long before the server says they expire
const TOKEN_EXPIRY_MARGIN_SECS: i64 = 60;

/// OAuth2 token endpoint response
#[derive(Debug, Clone, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Bearer token and its expiry
#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at
            .is_none_or(|at| at - ChronoDuration::seconds(TOKEN_EXPIRY_MARGIN_SECS) > now)
    }
}

/// HTTP client wrapper with OAuth2 authentication
#[derive(Debug)]
pub struct HttpClient {
    client: Client,
    config: ClientConfig,
    token: RwLock<Option<AccessToken>>,
}

impl HttpClient {
    /// Create a new HTTP client wrapper; no request is made until first use
    pub fn new(client: Client, config: ClientConfig) -> Self {
        Self {
            client,
            config,
            token: RwLock::new(None),
        }
    }

    /// Create a wrapper around an already-issued bearer token
    pub fn with_token(client: Client, config: ClientConfig, token: String) -> Self {
        Self {
            client,
            config,
            token: RwLock::new(Some(AccessToken {
                value: token,
                expires_at: None,
            })),
        }
    }

    /// Get the API base URL
    pub fn api_url(&self) -> &str {
        &self.config.api_url
    }

    /// Build a full URL from a resource path, scoped to the configured account
    pub fn build_url(&self, path: &str) -> String {
        let mut url = format!(
            "{}/{}/{}",
            self.config.api_url.trim_end_matches('/'),
            API_VERSION,
            path.trim_start_matches('/')
        );
        if let Some(account) = &self.config.account {
            url.push_str(if url.contains('?') { "&" } else { "?" });
            url.push_str("account_id=");
            url.push_str(account);
        }
        url
    }

    /// Return a valid bearer token, fetching a new one when needed
    pub async fn bearer(&self) -> Result<String, BrightboxError> {
        let now = Utc::now();
        if let Some(token) = self.token.read().await.as_ref() {
            if token.is_fresh(now) {
                return Ok(token.value.clone());
            }
        }

        let mut guard = self.token.write().await;
        // Another task may have refreshed while we waited for the lock
        if let Some(token) = guard.as_ref() {
            if token.is_fresh(now) {
                return Ok(token.value.clone());
            }
        }
        let token = self.fetch_token().await?;
        let value = token.value.clone();
        *guard = Some(token);
        Ok(value)
    }

    async fn fetch_token(&self) -> Result<AccessToken, BrightboxError> {
        let url = self.config.token_url();
        let credentials = self.config.credentials();
        let mut form: Vec<(&str, &str)> = vec![("scope", TOKEN_SCOPE)];
        match &credentials {
            Credentials::ApiClient => {
                debug!("Obtaining API client authorisation for client {}", self.config.client_id);
                form.push(("grant_type", "client_credentials"));
            }
            Credentials::User { username, password } => {
                debug!("Obtaining authentication for user {}", username);
                form.push(("grant_type", "password"));
                form.push(("username", username.as_str()));
                form.push(("password", password.as_str()));
            }
        }
        debug!("Speaking to {}", url);

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .header("Accept", "application/json")
            .form(&form)
            .send()
            .await
            .map_err(BrightboxError::Http)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BrightboxError::Authentication(format!("{status} - {body}")));
        }

        let token: TokenResponse = response.json().await.map_err(BrightboxError::Http)?;
        Ok(AccessToken {
            value: token.access_token,
            expires_at: token
                .expires_in
                .map(|secs| Utc::now() + ChronoDuration::seconds(secs)),
        })
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<Response, BrightboxError> {
        let url = self.build_url(path);
        match body {
            Some(body) => debug!(
                "{} {} with body: {}",
                method,
                url,
                serde_json::to_string(body).unwrap_or_default()
            ),
            None => debug!("{} {}", method, url),
        }

        let mut request = self
            .client
            .request(method.clone(), &url)
            .bearer_auth(self.bearer().await?)
            .header("Accept", "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await.map_err(BrightboxError::Http)?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let text = response.text().await.unwrap_or_default();
        Err(match status {
            StatusCode::NOT_FOUND => {
                BrightboxError::NotFound(format!("{method} {path} - {text}"))
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                BrightboxError::Authentication(format!("{method} {path}: {status} - {text}"))
            }
            _ => BrightboxError::Api {
                status: status.as_u16(),
                message: format!("{method} {path} - {text}"),
            },
        })
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, BrightboxError> {
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| BrightboxError::Api {
            status: 200,
            message: format!(
                "error decoding response body: {} - Response (first 500 chars): {}",
                e,
                text.chars().take(500).collect::<String>()
            ),
        })
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, BrightboxError> {
        Self::decode(self.send(Method::GET, path, None).await?).await
    }

    /// Make a POST request and decode the returned resource
    pub async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T, BrightboxError> {
        Self::decode(self.send(Method::POST, path, Some(body)).await?).await
    }

    /// Make a POST request whose response body is ignored
    pub async fn post_action(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<(), BrightboxError> {
        self.send(Method::POST, path, Some(body)).await?;
        Ok(())
    }

    /// Make a PUT request
    pub async fn put<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T, BrightboxError> {
        Self::decode(self.send(Method::PUT, path, Some(body)).await?).await
    }

    /// Make a DELETE request
    pub async fn delete(&self, path: &str) -> Result<(), BrightboxError> {
        self.send(Method::DELETE, path, None).await?;
        Ok(())
    }
}
