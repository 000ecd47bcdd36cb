use crate::signing::Canonicalization;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub const APP_KEY_ENV: &str = "AFFILIATE_APP_KEY";
pub const APP_SECRET_ENV: &str = "AFFILIATE_APP_SECRET";
pub const TRACKING_ID_ENV: &str = "AFFILIATE_TRACKING_ID";

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("Upstream URL must use http or https: {0}")]
    InvalidUpstreamScheme(String),

    #[error("Timeout for {0} cannot be 0")]
    ZeroTimeout(&'static str),

    #[error("Page size must be between 1 and 50")]
    InvalidPageSize,

    #[error("Default query cannot be empty")]
    EmptyDefaultQuery,
}

/// HTTP method used for the signed upstream call
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum UpstreamMethod {
    Get,
    #[default]
    Post,
}

/// Affiliate proxy configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    /// Listener for incoming requests
    #[serde(default)]
    pub listener: Listener,
    /// Signed upstream API settings
    #[serde(default)]
    pub upstream: UpstreamConfig,
    /// Short link resolution settings
    #[serde(default)]
    pub resolver: ResolverConfig,
    /// API credentials. Usually supplied through the environment instead.
    #[serde(default)]
    pub credentials: Credentials,
    /// Search phrase used when the caller omits the query parameter
    #[serde(default = "default_query")]
    pub default_query: String,
}

impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.listener.validate()?;
        self.upstream.validate()?;

        if self.resolver.timeout_secs == 0 {
            return Err(ValidationError::ZeroTimeout("resolver"));
        }

        if self.default_query.trim().is_empty() {
            return Err(ValidationError::EmptyDefaultQuery);
        }

        Ok(())
    }
}

fn default_query() -> String {
    "wireless earbuds".into()
}

/// Network listener configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Listener {
    /// Host address to bind to (e.g., "0.0.0.0" or "127.0.0.1")
    pub host: String,
    /// Port number to listen on
    pub port: u16,
}

impl Default for Listener {
    fn default() -> Self {
        Listener {
            host: "0.0.0.0".into(),
            port: 10000,
        }
    }
}

impl Listener {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Endpoint of the affiliate API gateway
    pub url: Url,
    pub method: UpstreamMethod,
    pub timeout_secs: u64,
    pub canonicalization: Canonicalization,
    pub target_currency: String,
    pub target_language: String,
    /// Number of products requested per search. Only the first one is returned.
    pub page_size: u32,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        UpstreamConfig {
            url: Url::parse("https://api-sg.aliexpress.com/sync").expect("valid default url"),
            method: UpstreamMethod::Post,
            timeout_secs: 15,
            canonicalization: Canonicalization::Concatenated,
            target_currency: "USD".into(),
            target_language: "EN".into(),
            page_size: 1,
        }
    }
}

impl UpstreamConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !matches!(self.url.scheme(), "http" | "https") {
            return Err(ValidationError::InvalidUpstreamScheme(self.url.to_string()));
        }
        if self.timeout_secs == 0 {
            return Err(ValidationError::ZeroTimeout("upstream"));
        }
        if !(1..=50).contains(&self.page_size) {
            return Err(ValidationError::InvalidPageSize);
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct ResolverConfig {
    pub timeout_secs: u64,
    pub max_redirects: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        ResolverConfig {
            timeout_secs: 10,
            max_redirects: 10,
        }
    }
}

impl ResolverConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Credentials {
    pub app_key: Option<String>,
    pub app_secret: Option<String>,
    pub tracking_id: Option<String>,
}

impl Credentials {
    /// Overrides file values with whatever `lookup` returns for the
    /// `AFFILIATE_*` variables. Empty values are ignored.
    pub fn overlay<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(app_key) = non_empty(APP_KEY_ENV) {
            self.app_key = Some(app_key);
        }
        if let Some(app_secret) = non_empty(APP_SECRET_ENV) {
            self.app_secret = Some(app_secret);
        }
        if let Some(tracking_id) = non_empty(TRACKING_ID_ENV) {
            self.tracking_id = Some(tracking_id);
        }
    }

    pub fn overlay_env(&mut self) {
        self.overlay(|name| std::env::var(name).ok());
    }

    pub fn is_complete(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());
        present(&self.app_key) && present(&self.app_secret)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("app_key", &self.app_key)
            .field("app_secret", &self.app_secret.as_ref().map(|_| "<redacted>"))
            .field("tracking_id", &self.tracking_id)
            .finish()
    }
}
