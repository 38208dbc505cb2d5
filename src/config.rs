//! Client configuration parsed from environment variables.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use std::path::PathBuf;

use crate::net::error::ApiError;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

pub const ENV_API_BASE_URL: &str = "SALARIZ_API_BASE_URL";
pub const ENV_TOKEN_FILE: &str = "SALARIZ_TOKEN_FILE";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "SALARIZ_REQUEST_TIMEOUT_SECS";
pub const ENV_CONNECT_TIMEOUT_SECS: &str = "SALARIZ_CONNECT_TIMEOUT_SECS";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Backend origin without a trailing slash.
    pub base_url: String,
    /// Where the access token is persisted. `None` keeps it in memory only.
    pub token_file: Option<PathBuf>,
    pub timeouts: Timeouts,
}

impl ClientConfig {
    /// Config for `base_url` with default timeouts and no token file.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidRequest`] if the URL is not `http(s)://`.
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        Ok(Self { base_url: normalize_base_url(base_url)?, token_file: None, timeouts: Timeouts::default() })
    }

    /// Build typed client config from environment variables.
    ///
    /// Optional:
    /// - `SALARIZ_API_BASE_URL`: default `http://localhost:8000`
    /// - `SALARIZ_TOKEN_FILE`: default `<data dir>/salariz/access_token`
    /// - `SALARIZ_REQUEST_TIMEOUT_SECS`: default 60
    /// - `SALARIZ_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidRequest`] if the base URL is malformed.
    pub fn from_env() -> Result<Self, ApiError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ClientConfig::from_env`] but reads through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidRequest`] if the base URL is malformed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ApiError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup(ENV_API_BASE_URL).unwrap_or_else(|| DEFAULT_API_BASE_URL.to_owned());
        let token_file = lookup(ENV_TOKEN_FILE)
            .filter(|raw| !raw.trim().is_empty())
            .map(PathBuf::from)
            .or_else(default_token_file);
        let timeouts = Timeouts {
            request_secs: parse_u64(lookup(ENV_REQUEST_TIMEOUT_SECS), DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_secs: parse_u64(lookup(ENV_CONNECT_TIMEOUT_SECS), DEFAULT_CONNECT_TIMEOUT_SECS),
        };

        Ok(Self { base_url: normalize_base_url(&base_url)?, token_file, timeouts })
    }

    /// Cookie jar file beside the token file (`<token file>.cookies`).
    #[must_use]
    pub fn cookie_file(&self) -> Option<PathBuf> {
        self.token_file.as_ref().map(|path| {
            let mut name = path.as_os_str().to_owned();
            name.push(".cookies");
            PathBuf::from(name)
        })
    }
}

/// Platform data directory location of the persisted access token.
#[must_use]
pub fn default_token_file() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("salariz").join("access_token"))
}

/// Trim whitespace and trailing slashes; empty input falls back to the default origin.
///
/// # Errors
///
/// Returns [`ApiError::InvalidRequest`] for anything that is not `http://` or `https://`.
pub fn normalize_base_url(raw: &str) -> Result<String, ApiError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Ok(DEFAULT_API_BASE_URL.to_owned());
    }
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ApiError::InvalidRequest(format!("invalid base URL: {raw}")));
    }
    Ok(trimmed.to_owned())
}

fn parse_u64(raw: Option<String>, default: u64) -> u64 {
    raw.and_then(|v| v.trim().parse::<u64>().ok()).unwrap_or(default)
}
