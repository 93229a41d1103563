//! Client configuration.

use serde::Deserialize;

use crate::auth::Credentials;
use crate::error::{ApiError, Result};

/// Production endpoint of the Moodstocks API v2.
pub const DEFAULT_ENDPOINT: &str = "http://api.moodstocks.com/v2";

pub const ENV_API_KEY: &str = "MOODSTOCKS_API_KEY";
pub const ENV_API_SECRET: &str = "MOODSTOCKS_API_SECRET";
pub const ENV_ENDPOINT: &str = "MOODSTOCKS_ENDPOINT";

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

/// Everything needed to construct an `ApiClient`.
#[derive(Clone, Deserialize)]
pub struct ClientConfig {
    pub api_key: String,
    pub api_secret: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            endpoint: default_endpoint(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Read `MOODSTOCKS_API_KEY`, `MOODSTOCKS_API_SECRET` and the optional
    /// `MOODSTOCKS_ENDPOINT` from the environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |name: &str| {
            lookup(name)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ApiError::Config(format!("{name} is not set")))
        };
        Ok(Self {
            api_key: required(ENV_API_KEY)?,
            api_secret: required(ENV_API_SECRET)?,
            endpoint: lookup(ENV_ENDPOINT)
                .filter(|v| !v.is_empty())
                .unwrap_or_else(default_endpoint),
        })
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(&self.api_key, &self.api_secret)
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}
