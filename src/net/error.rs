//! API error: the one failure shape callers see.
//!
//! DESIGN
//! ======
//! Every non-2xx response is normalized here, after the optional
//! refresh-and-replay, so UI code never inspects raw responses. Bodies are
//! kept as JSON: parsed when possible, otherwise wrapped as
//! `{ status, message }` with the raw text (or the status reason phrase when
//! the body is empty).

#[cfg(test)]
#[path = "error_test.rs"]
mod error_test;

use serde_json::{Value, json};

/// Application code attached to HTTP 402 responses.
pub const PAYMENT_REQUIRED_CODE: &str = "payment_required";

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced by API client operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApiError {
    /// The request never produced an HTTP response (DNS, TLS, refused, timeout).
    #[error("network request failed: {0}")]
    Network(String),

    /// The backend answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: Value },

    /// The backend declared an application condition (HTTP 402) with a code.
    #[error("application error `{code}` (HTTP {status})")]
    Application { status: u16, code: String, body: Value },

    /// A success response did not have the expected shape.
    #[error("response decode failed: {0}")]
    Decode(String),

    /// The access token could not be read from or written to storage.
    #[error("token storage failed: {0}")]
    Storage(String),

    /// The request could not be built (bad URL, bad multipart part).
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    /// Build the error for a non-success response.
    #[must_use]
    pub fn from_response(status: u16, reason: &str, text: &str) -> Self {
        classify(status, normalize_error_body(status, reason, text))
    }

    /// HTTP status, `Some(0)` for network failures, `None` for local errors.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Network(_) => Some(0),
            Self::Http { status, .. } | Self::Application { status, .. } => Some(*status),
            Self::Decode(_) | Self::Storage(_) | Self::InvalidRequest(_) => None,
        }
    }

    /// Parsed error body for HTTP-level failures.
    #[must_use]
    pub fn body(&self) -> Option<&Value> {
        match self {
            Self::Http { body, .. } | Self::Application { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Application code: the explicit variant code, else a string `code` in the body.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Application { code, .. } => Some(code.as_str()),
            Self::Http { body, .. } => body.get("code").and_then(Value::as_str),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    #[must_use]
    pub fn is_payment_required(&self) -> bool {
        self.status() == Some(402) || self.code() == Some(PAYMENT_REQUIRED_CODE)
    }

    /// Stable machine-readable code for logs.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Network(_) => "E_NETWORK",
            Self::Http { .. } => "E_HTTP",
            Self::Application { .. } => "E_APPLICATION",
            Self::Decode(_) => "E_DECODE",
            Self::Storage(_) => "E_STORAGE",
            Self::InvalidRequest(_) => "E_INVALID_REQUEST",
        }
    }
}

// =============================================================================
// NORMALIZATION
// =============================================================================

/// Parse an error body: JSON if possible, else `{ status, message }`.
#[must_use]
pub fn normalize_error_body(status: u16, reason: &str, text: &str) -> Value {
    if text.trim().is_empty() {
        return json!({ "status": status, "message": reason });
    }
    serde_json::from_str(text).unwrap_or_else(|_| json!({ "status": status, "message": text }))
}

fn classify(status: u16, body: Value) -> ApiError {
    if status != 402 {
        return ApiError::Http { status, body };
    }
    let code = body
        .get("code")
        .and_then(Value::as_str)
        .unwrap_or(PAYMENT_REQUIRED_CODE)
        .to_owned();
    ApiError::Application { status, code, body }
}
