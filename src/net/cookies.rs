//! Cookie jar for the reqwest transport.
//!
//! DESIGN
//! ======
//! The backend keeps the refresh token in an HttpOnly `refresh_token` cookie
//! (`Path=/`, `Max-Age` one day). A CLI process is short-lived, so
//! [`CookieJar`] can persist what it holds to a JSON file next to the access
//! token; the next run then refreshes with the cookie from the last one.
//!
//! Cookies are scoped by host and name only. The client talks to a single
//! origin and the backend sets everything on `/`, so paths and domain
//! attributes are not tracked. `Secure` cookies are only sent over https or to
//! loopback hosts.

#[cfg(test)]
#[path = "cookies_test.rs"]
mod cookies_test;

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use reqwest::Url;
use reqwest::header::HeaderValue;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc2822;

use super::error::ApiError;
use crate::state::token::write_private;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCookie {
    pub host: String,
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub secure: bool,
    /// Unix seconds; `None` for session cookies.
    #[serde(default)]
    pub expires_at: Option<i64>,
}

impl StoredCookie {
    fn is_expired(&self, now: i64) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// In-memory cookie jar, optionally mirrored to a file.
#[derive(Debug, Default)]
pub struct CookieJar {
    path: Option<PathBuf>,
    cookies: RwLock<Vec<StoredCookie>>,
}

impl CookieJar {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Jar backed by `path`. A missing file starts empty; expired entries are
    /// dropped on load.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Storage`] if the file exists but cannot be read or
    /// parsed.
    pub fn load(path: PathBuf) -> Result<Self, ApiError> {
        let cookies = match std::fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => Vec::new(),
            Ok(raw) => serde_json::from_str::<Vec<StoredCookie>>(&raw)
                .map_err(|e| ApiError::Storage(format!("{}: {e}", path.display())))?,
            Err(e) if e.kind() == ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(ApiError::Storage(format!("{}: {e}", path.display()))),
        };
        let now = now_unix();
        let cookies = cookies.into_iter().filter(|c| !c.is_expired(now)).collect();
        Ok(Self { path: Some(path), cookies: RwLock::new(cookies) })
    }

    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Live cookies currently held.
    #[must_use]
    pub fn snapshot(&self) -> Vec<StoredCookie> {
        let now = now_unix();
        let cookies = match self.cookies.read() {
            Ok(cookies) => cookies,
            Err(poisoned) => poisoned.into_inner(),
        };
        cookies.iter().filter(|c| !c.is_expired(now)).cloned().collect()
    }

    /// Apply one `Set-Cookie` header received from `url`.
    pub fn store_set_cookie(&self, header: &str, url: &Url) {
        let Some(host) = url.host_str() else {
            return;
        };
        let now = now_unix();
        let Some(cookie) = parse_set_cookie(header, host, now) else {
            tracing::debug!(header, "ignoring malformed set-cookie");
            return;
        };

        {
            let mut cookies = match self.cookies.write() {
                Ok(cookies) => cookies,
                Err(poisoned) => poisoned.into_inner(),
            };
            cookies.retain(|c| !(c.host == cookie.host && c.name == cookie.name) && !c.is_expired(now));
            if !cookie.is_expired(now) {
                cookies.push(cookie);
            }
        }
        self.persist();
    }

    /// `Cookie` header value for a request to `url`.
    #[must_use]
    pub fn header_for(&self, url: &Url) -> Option<String> {
        let host = url.host_str()?;
        let secure_ok = url.scheme() == "https" || is_loopback(host);
        let now = now_unix();
        let cookies = match self.cookies.read() {
            Ok(cookies) => cookies,
            Err(poisoned) => poisoned.into_inner(),
        };
        let pairs: Vec<String> = cookies
            .iter()
            .filter(|c| c.host.eq_ignore_ascii_case(host) && !c.is_expired(now) && (secure_ok || !c.secure))
            .map(|c| format!("{}={}", c.name, c.value))
            .collect();
        (!pairs.is_empty()).then(|| pairs.join("; "))
    }

    fn persist(&self) {
        let Some(path) = &self.path else {
            return;
        };
        let result = serde_json::to_string(&self.snapshot())
            .map_err(|e| ApiError::Storage(format!("{}: {e}", path.display())))
            .and_then(|json| {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)
                        .map_err(|e| ApiError::Storage(format!("{}: {e}", parent.display())))?;
                }
                write_private(path, &json)
            });
        if let Err(error) = result {
            tracing::warn!(error = %error, "could not persist cookies");
        }
    }
}

impl reqwest::cookie::CookieStore for CookieJar {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        for header in cookie_headers {
            if let Ok(raw) = header.to_str() {
                self.store_set_cookie(raw, url);
            }
        }
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        self.header_for(url).and_then(|value| HeaderValue::from_str(&value).ok())
    }
}

/// Parse a `Set-Cookie` header. `Max-Age` wins over `Expires`; a
/// non-positive `Max-Age` or a past `Expires` yields an already expired
/// cookie, which removes any stored one.
fn parse_set_cookie(header: &str, host: &str, now: i64) -> Option<StoredCookie> {
    let mut parts = header.split(';');
    let (name, value) = parts.next()?.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }

    let mut secure = false;
    let mut max_age = None;
    let mut expires = None;
    for attribute in parts {
        let (key, raw) = attribute.split_once('=').unwrap_or((attribute, ""));
        let raw = raw.trim();
        match key.trim().to_ascii_lowercase().as_str() {
            "secure" => secure = true,
            "max-age" => max_age = raw.parse::<i64>().ok(),
            "expires" => expires = parse_http_date(raw),
            _ => {}
        }
    }

    let expires_at = match max_age {
        Some(seconds) if seconds <= 0 => Some(i64::MIN),
        Some(seconds) => Some(now.saturating_add(seconds)),
        None => expires,
    };

    Some(StoredCookie {
        host: host.to_ascii_lowercase(),
        name: name.to_owned(),
        value: value.trim().trim_matches('"').to_owned(),
        secure,
        expires_at,
    })
}

/// `Thu, 01 Jan 1970 00:00:00 GMT` style dates.
fn parse_http_date(raw: &str) -> Option<i64> {
    let normalized = raw
        .strip_suffix(" GMT")
        .or_else(|| raw.strip_suffix(" UTC"))
        .map_or_else(|| raw.to_owned(), |head| format!("{head} +0000"));
    OffsetDateTime::parse(&normalized, &Rfc2822)
        .ok()
        .map(OffsetDateTime::unix_timestamp)
}

fn is_loopback(host: &str) -> bool {
    matches!(host, "localhost" | "127.0.0.1" | "[::1]" | "::1")
}

fn now_unix() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}
