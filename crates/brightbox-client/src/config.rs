//! Client configuration and credential validation
//!
//! Credentials come from the environment, the same variables the Brightbox
//! CLI tools use. Two authentication modes are supported:
//!
//! - **API client**: a non-default client id/secret pair, client-credentials grant
//! - **User credentials**: user name and password with the public default client,
//!   password grant, which also needs an account id

use crate::error::BrightboxError;
use std::env;

/// Public client id shared by user-credential logins
pub const DEFAULT_CLIENT_ID: &str = "app-dkmch";
/// Public client secret shared by user-credential logins
pub const DEFAULT_CLIENT_SECRET: &str = "uogoelzgt0nwawb";
/// API endpoint used when none is configured
pub const DEFAULT_API_URL: &str = "https://api.gb1.brightbox.com";

const CLIENT_ENV_VAR: &str = "BRIGHTBOX_CLIENT";
const CLIENT_SECRET_ENV_VAR: &str = "BRIGHTBOX_CLIENT_SECRET";
const USERNAME_ENV_VAR: &str = "BRIGHTBOX_USER_NAME";
const PASSWORD_ENV_VAR: &str = "BRIGHTBOX_PASSWORD";
const ACCOUNT_ENV_VAR: &str = "BRIGHTBOX_ACCOUNT";
const API_URL_ENV_VAR: &str = "BRIGHTBOX_API_URL";

/// How the client obtains its bearer token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    /// OAuth2 client-credentials grant
    ApiClient,
    /// OAuth2 password grant
    User {
        /// Login name
        username: String,
        /// Login password
        password: String,
    },
}

/// Connection settings for [`crate::BrightboxClient`]
#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub client_id: String,
    pub client_secret: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub account: Option<String>,
    pub api_url: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

// Secrets stay out of logs.
impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("client_id", &self.client_id)
            .field("username", &self.username)
            .field("account", &self.account)
            .field("api_url", &self.api_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish_non_exhaustive()
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            client_id: DEFAULT_CLIENT_ID.to_string(),
            client_secret: DEFAULT_CLIENT_SECRET.to_string(),
            username: None,
            password: None,
            account: None,
            api_url: DEFAULT_API_URL.to_string(),
            timeout_secs: 10,
        }
    }
}

impl ClientConfig {
    /// Load configuration from `BRIGHTBOX_*` environment variables and validate it
    pub fn from_env() -> Result<Self, BrightboxError> {
        let non_empty = |key: &str| env::var(key).ok().filter(|v| !v.is_empty());
        let config = Self {
            client_id: env::var(CLIENT_ENV_VAR).unwrap_or_else(|_| DEFAULT_CLIENT_ID.to_string()),
            client_secret: env::var(CLIENT_SECRET_ENV_VAR)
                .unwrap_or_else(|_| DEFAULT_CLIENT_SECRET.to_string()),
            username: non_empty(USERNAME_ENV_VAR),
            password: non_empty(PASSWORD_ENV_VAR),
            account: non_empty(ACCOUNT_ENV_VAR),
            api_url: non_empty(API_URL_ENV_VAR).unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the credential combination is one the API accepts
    pub fn validate(&self) -> Result<(), BrightboxError> {
        if self.uses_default_client() {
            if self.account.is_none() {
                return Err(BrightboxError::Config(
                    "must specify an account with user credentials".to_string(),
                ));
            }
        } else if self.username.is_some() || self.password.is_some() {
            return Err(BrightboxError::Config(
                "user credentials are not used with an API client".to_string(),
            ));
        }
        Ok(())
    }

    /// Which OAuth2 grant to use
    #[must_use]
    pub fn credentials(&self) -> Credentials {
        match (&self.username, &self.password) {
            (None, None) => Credentials::ApiClient,
            (username, password) => Credentials::User {
                username: username.clone().unwrap_or_default(),
                password: password.clone().unwrap_or_default(),
            },
        }
    }

    /// Token endpoint for this API
    #[must_use]
    pub fn token_url(&self) -> String {
        format!("{}/token", self.api_url.trim_end_matches('/'))
    }

    fn uses_default_client(&self) -> bool {
        self.client_id == DEFAULT_CLIENT_ID && self.client_secret == DEFAULT_CLIENT_SECRET
    }
}
