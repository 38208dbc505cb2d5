//! HTTP transport seam.
//!
//! DESIGN
//! ======
//! [`Transport`] sends exactly one request and returns the raw status,
//! content type and body text. Auth, retry and error normalization live in
//! `client`, so they can be exercised against scripted transports. Request
//! descriptions are plain owned data (multipart included) so a request can
//! be replayed after a token refresh.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use serde_json::Value;

use super::cookies::CookieJar;
use super::error::ApiError;
use crate::config::Timeouts;

// =============================================================================
// REQUEST / RESPONSE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A multipart field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartValue {
    Text(String),
    File { file_name: String, content_type: String, bytes: Vec<u8> },
}

/// Replayable multipart form. Field order is preserved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartForm {
    pub parts: Vec<(String, PartValue)>,
}

impl MultipartForm {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn text(mut self, name: &str, value: impl Into<String>) -> Self {
        self.parts.push((name.to_owned(), PartValue::Text(value.into())));
        self
    }

    #[must_use]
    pub fn file(mut self, name: &str, file_name: &str, content_type: &str, bytes: Vec<u8>) -> Self {
        self.parts.push((
            name.to_owned(),
            PartValue::File { file_name: file_name.to_owned(), content_type: content_type.to_owned(), bytes },
        ));
        self
    }

    /// Text value of the first field named `name`.
    #[must_use]
    pub fn text_value(&self, name: &str) -> Option<&str> {
        self.parts.iter().find_map(|(key, value)| match value {
            PartValue::Text(text) if key == name => Some(text.as_str()),
            _ => None,
        })
    }

    #[must_use]
    pub fn has_field(&self, name: &str) -> bool {
        self.parts.iter().any(|(key, _)| key == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(Value),
    Multipart(MultipartForm),
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
}

impl HttpRequest {
    /// First header value named `name` (case-insensitive).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    /// Canonical reason phrase for `status`, empty when unknown.
    pub reason: String,
    pub content_type: Option<String>,
    pub body: String,
}

impl HttpResponse {
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    #[must_use]
    pub fn is_json(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.to_ascii_lowercase().contains("application/json"))
    }
}

// =============================================================================
// TRANSPORT
// =============================================================================

#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Send one request.
    ///
    /// # Errors
    ///
    /// [`ApiError::Network`] when no response was received, or
    /// [`ApiError::InvalidRequest`] when the request could not be built.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError>;
}

/// `reqwest` transport with a cookie jar, so the HttpOnly refresh cookie set
/// by the login endpoint is sent back on refresh.
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    /// Transport whose cookies live only as long as the process.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Network`] if the HTTP client fails to build.
    pub fn new(timeouts: Timeouts) -> Result<Self, ApiError> {
        Self::with_cookie_jar(timeouts, Arc::new(CookieJar::in_memory()))
    }

    /// # Errors
    ///
    /// Returns [`ApiError::Network`] if the HTTP client fails to build.
    pub fn with_cookie_jar(timeouts: Timeouts, cookies: Arc<CookieJar>) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .cookie_provider(cookies)
            .timeout(Duration::from_secs(timeouts.request_secs))
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .build()
            .map_err(|e| ApiError::Network(format!("HTTP client build failed: {e}")))?;
        Ok(Self { http })
    }
}

#[async_trait::async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.http.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.body(value.to_string()),
            RequestBody::Multipart(form) => builder.multipart(into_reqwest_form(form)?),
        };

        let response = builder
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(ToOwned::to_owned);
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        Ok(HttpResponse {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default().to_owned(),
            content_type,
            body,
        })
    }
}

fn into_reqwest_form(form: MultipartForm) -> Result<reqwest::multipart::Form, ApiError> {
    let mut out = reqwest::multipart::Form::new();
    for (name, value) in form.parts {
        out = match value {
            PartValue::Text(text) => out.text(name, text),
            PartValue::File { file_name, content_type, bytes } => {
                let part = reqwest::multipart::Part::bytes(bytes)
                    .file_name(file_name)
                    .mime_str(&content_type)
                    .map_err(|e| ApiError::InvalidRequest(format!("invalid content type {content_type}: {e}")))?;
                out.part(name, part)
            }
        };
    }
    Ok(out)
}

// =============================================================================
// TEST HELPERS
// =============================================================================
