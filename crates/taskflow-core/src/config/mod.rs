//! Client configuration shared by every TaskFlow front end.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api/v1";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
/// How long a transient notification stays visible.
pub const DEFAULT_NOTIFICATION_TTL: Duration = Duration::from_millis(3000);

/// Keyword placed before the credential in the `Authorization` header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthScheme {
    /// `Authorization: Token <credential>`
    #[default]
    Token,
    /// `Authorization: Bearer <credential>`
    Bearer,
}

impl AuthScheme {
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Token => "Token",
            Self::Bearer => "Bearer",
        }
    }
}

impl fmt::Display for AuthScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

impl FromStr for AuthScheme {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "token" => Ok(Self::Token),
            "bearer" => Ok(Self::Bearer),
            other => Err(format!(
                "unsupported auth scheme '{other}' (expected token or bearer)"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub auth_scheme: AuthScheme,
    pub request_timeout: Duration,
    pub notification_ttl: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            auth_scheme: AuthScheme::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            notification_ttl: DEFAULT_NOTIFICATION_TTL,
        }
    }
}

impl ClientConfig {
    /// Builds a config for an explicit API base URL, keeping the other defaults.
    pub fn with_base_url(base_url: impl AsRef<str>) -> Result<Self, String> {
        Ok(Self {
            api_base_url: normalize_base_url(base_url.as_ref())?,
            ..Self::default()
        })
    }
}

/// Trim the URL, drop trailing slashes, and require an http(s) scheme.
pub fn normalize_base_url(raw: &str) -> Result<String, String> {
    let base = raw.trim().trim_end_matches('/').to_string();
    if base.is_empty() {
        return Err("API base URL must not be empty".to_string());
    }
    if !(base.starts_with("http://") || base.starts_with("https://")) {
        return Err("API base URL must include http:// or https://".to_string());
    }
    Ok(base)
}
