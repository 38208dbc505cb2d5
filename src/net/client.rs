//! Authenticated HTTP client with refresh-and-replay.
//!
//! ARCHITECTURE
//! ============
//! One request goes through at most two sends:
//!
//! ```text
//! SENDING ── 2xx ─────────────────────────────────────────► DONE
//!    │
//!    ├── 401 (first attempt) ──► REFRESHING ── ok ──► REPLAY ── 2xx ──► DONE
//!    │                                │                  └──── else ──► FAILED
//!    │                                └── failed (token cleared) ─────► FAILED (original 401)
//!    └── other non-2xx, or 401 with retry disabled ───────────────────► FAILED
//! ```
//!
//! The refresh call (`POST /api/token/refresh/`, authenticated by the
//! HttpOnly cookie) never goes through this retry path itself.
//!
//! CONCURRENCY
//! ===========
//! Refreshes run behind an async gate that remembers the last outcome and a
//! generation counter. A request records the generation before sending; if
//! the counter moved by the time it holds the gate, another caller already
//! refreshed on its behalf and the stored outcome is reused. Two requests
//! that 401 together therefore cost one refresh call.
//!
//! The access token sits behind a `std::sync::RwLock` that is never held
//! across an `.await`. Dropping a request future aborts the in-flight call.

#[cfg(test)]
#[path = "client_test.rs"]
mod client_test;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::cookies::CookieJar;
use super::error::ApiError;
use super::transport::{HttpRequest, HttpResponse, Method, MultipartForm, ReqwestTransport, RequestBody, Transport};
use super::types::TokenResponse;
use crate::config::ClientConfig;
use crate::state::token::{FileTokenStore, MemoryTokenStore, TokenStore};

pub const REFRESH_PATH: &str = "/api/token/refresh/";

// =============================================================================
// OPTIONS / RESPONSE BODY
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOptions {
    /// Refresh and replay once on 401. On by default.
    pub retry_on_unauthorized: bool,
    /// Extra headers, sent before `Authorization`.
    pub headers: Vec<(String, String)>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self { retry_on_unauthorized: true, headers: Vec::new() }
    }
}

impl RequestOptions {
    #[must_use]
    pub fn no_retry() -> Self {
        Self { retry_on_unauthorized: false, ..Self::default() }
    }
}

/// Success body: JSON when the content type says so, raw text otherwise.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    Text(String),
}

impl ResponseBody {
    /// Deserialize into `T`.
    ///
    /// Empty text decodes as JSON `null`; other text is parsed as JSON in case
    /// the server mislabelled it.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Decode`] when the body does not match `T`.
    pub fn decode<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        let value = match self {
            Self::Json(value) => value,
            Self::Text(text) if text.trim().is_empty() => Value::Null,
            Self::Text(text) => serde_json::from_str(&text)
                .map_err(|_| ApiError::Decode(format!("expected JSON, got text: {}", truncate(&text, 120))))?,
        };
        serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

// =============================================================================
// CLIENT
// =============================================================================

pub struct ApiClient {
    transport: Arc<dyn Transport>,
    store: Arc<dyn TokenStore>,
    base_url: String,
    access_token: RwLock<Option<String>>,
    refresh_generation: AtomicU64,
    /// Outcome of the most recent refresh.
    refresh_gate: tokio::sync::Mutex<bool>,
}

impl ApiClient {
    /// Build a client, reading the persisted token once.
    #[must_use]
    pub fn new(base_url: &str, transport: Arc<dyn Transport>, store: Arc<dyn TokenStore>) -> Self {
        let token = store.load().unwrap_or_else(|error| {
            tracing::warn!(error = %error, "could not read persisted access token");
            None
        });
        Self {
            transport,
            store,
            base_url: base_url.trim_end_matches('/').to_owned(),
            access_token: RwLock::new(token),
            refresh_generation: AtomicU64::new(0),
            refresh_gate: tokio::sync::Mutex::new(false),
        }
    }

    /// Build a `reqwest`-backed client from config.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ApiError> {
        let cookies = match config.cookie_file() {
            Some(path) => CookieJar::load(path).unwrap_or_else(|error| {
                tracing::warn!(error = %error, "could not read persisted cookies; starting empty");
                CookieJar::in_memory()
            }),
            None => CookieJar::in_memory(),
        };
        let transport = Arc::new(ReqwestTransport::with_cookie_jar(config.timeouts, Arc::new(cookies))?);
        let store: Arc<dyn TokenStore> = match &config.token_file {
            Some(path) => Arc::new(FileTokenStore::new(path.clone())),
            None => Arc::new(MemoryTokenStore::new()),
        };
        Ok(Self::new(&config.base_url, transport, store))
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn access_token(&self) -> Option<String> {
        match self.access_token.read() {
            Ok(slot) => slot.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Replace the in-memory token and mirror it into the store.
    ///
    /// Storage failures are logged, not returned: the in-memory token stays
    /// authoritative for this process.
    pub fn set_access_token(&self, token: Option<String>) {
        if let Err(error) = self.store.save(token.as_deref()) {
            tracing::warn!(error = %error, "could not persist access token");
        }
        match self.access_token.write() {
            Ok(mut slot) => *slot = token,
            Err(poisoned) => *poisoned.into_inner() = token,
        }
    }

    /// Absolute URLs pass through; paths are joined to the base with one `/`.
    #[must_use]
    pub fn build_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_owned();
        }
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    // -------------------------------------------------------------------------
    // Request pipeline
    // -------------------------------------------------------------------------

    /// Send a request with bearer auth and one refresh-and-replay on 401.
    ///
    /// # Errors
    ///
    /// Network failures, non-2xx responses (after the replay, if any) and
    /// undecodable JSON bodies.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: RequestBody,
        options: &RequestOptions,
    ) -> Result<ResponseBody, ApiError> {
        let url = self.build_url(path);
        let observed = self.refresh_generation.load(Ordering::Acquire);

        let token = self.access_token();
        let mut response = self
            .send_once(method, &url, &body, options, token.as_deref(), 1)
            .await?;

        if response.status == 401 && options.retry_on_unauthorized {
            if self.refresh_once(observed).await {
                let token = self.access_token();
                response = self
                    .send_once(method, &url, &body, options, token.as_deref(), 2)
                    .await?;
            } else {
                tracing::debug!(%method, %url, "refresh failed; surfacing original 401");
            }
        }

        finish(response)
    }

    /// `GET` and decode.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::request`].
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.get_with(path, &RequestOptions::default()).await
    }

    /// `GET` with explicit options and decode.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::request`].
    pub async fn get_with<T: DeserializeOwned>(&self, path: &str, options: &RequestOptions) -> Result<T, ApiError> {
        self.request(Method::Get, path, RequestBody::Empty, options)
            .await?
            .decode()
    }

    /// `POST` a JSON body and decode.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::request`]; also fails if `body` cannot be serialized.
    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send_json(Method::Post, path, body, &RequestOptions::default()).await
    }

    /// `POST` a JSON body with explicit options and decode.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::post`].
    pub async fn post_with<T, B>(&self, path: &str, body: &B, options: &RequestOptions) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send_json(Method::Post, path, body, options).await
    }

    /// `PATCH` a JSON body and decode.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::post`].
    pub async fn patch<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send_json(Method::Patch, path, body, &RequestOptions::default()).await
    }

    /// `POST` with no body and decode.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::request`].
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request(Method::Post, path, RequestBody::Empty, &RequestOptions::default())
            .await?
            .decode()
    }

    /// `POST` a multipart form and decode. No content type is set by hand so
    /// the transport can add the boundary.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::request`].
    pub async fn upload<T: DeserializeOwned>(&self, path: &str, form: MultipartForm) -> Result<T, ApiError> {
        self.request(Method::Post, path, RequestBody::Multipart(form), &RequestOptions::default())
            .await?
            .decode()
    }

    /// `DELETE`, returning the raw body (often empty).
    ///
    /// # Errors
    ///
    /// See [`ApiClient::request`].
    pub async fn delete(&self, path: &str) -> Result<ResponseBody, ApiError> {
        self.request(Method::Delete, path, RequestBody::Empty, &RequestOptions::default())
            .await
    }

    async fn send_json<T, B>(&self, method: Method, path: &str, body: &B, options: &RequestOptions) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let value = serde_json::to_value(body).map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
        self.request(method, path, RequestBody::Json(value), options)
            .await?
            .decode()
    }

    async fn send_once(
        &self,
        method: Method,
        url: &str,
        body: &RequestBody,
        options: &RequestOptions,
        token: Option<&str>,
        attempt: u8,
    ) -> Result<HttpResponse, ApiError> {
        let mut headers = options.headers.clone();
        if !matches!(body, RequestBody::Multipart(_)) {
            headers.push(("Content-Type".to_owned(), "application/json".to_owned()));
        }
        if let Some(token) = token {
            headers.push(("Authorization".to_owned(), format!("Bearer {token}")));
        }

        tracing::debug!(%method, %url, attempt, authenticated = token.is_some(), "sending request");
        let response = self
            .transport
            .send(HttpRequest { method, url: url.to_owned(), headers, body: body.clone() })
            .await?;
        tracing::debug!(%method, %url, attempt, status = response.status, "response received");
        Ok(response)
    }

    // -------------------------------------------------------------------------
    // Refresh
    // -------------------------------------------------------------------------

    /// Obtain a new access token from the refresh cookie.
    ///
    /// Shares the outcome with any refresh that completed while this call
    /// waited for the gate. On failure the token is cleared.
    pub async fn refresh_access_token(&self) -> bool {
        let observed = self.refresh_generation.load(Ordering::Acquire);
        self.refresh_once(observed).await
    }

    async fn refresh_once(&self, observed: u64) -> bool {
        let mut last_outcome = self.refresh_gate.lock().await;
        if self.refresh_generation.load(Ordering::Acquire) != observed {
            tracing::debug!(succeeded = *last_outcome, "reusing concurrent refresh outcome");
            return *last_outcome;
        }

        let succeeded = self.perform_refresh().await;
        *last_outcome = succeeded;
        self.refresh_generation.fetch_add(1, Ordering::AcqRel);
        succeeded
    }

    async fn perform_refresh(&self) -> bool {
        let url = self.build_url(REFRESH_PATH);
        let token = self.access_token();
        let body = RequestBody::Json(Value::Object(Map::new()));

        let outcome = match self
            .send_once(Method::Post, &url, &body, &RequestOptions::no_retry(), token.as_deref(), 1)
            .await
        {
            Ok(response) => finish(response).and_then(ResponseBody::decode::<TokenResponse>),
            Err(error) => Err(error),
        };

        match outcome {
            Ok(TokenResponse { access: Some(access) }) if !access.is_empty() => {
                self.set_access_token(Some(access));
                tracing::info!("access token refreshed");
                true
            }
            Ok(_) => {
                tracing::warn!("refresh response carried no access token");
                self.set_access_token(None);
                false
            }
            Err(error) => {
                tracing::warn!(error = %error, "access token refresh failed");
                self.set_access_token(None);
                false
            }
        }
    }
}

/// Map a final response to a body or a normalized error.
fn finish(response: HttpResponse) -> Result<ResponseBody, ApiError> {
    if !response.is_success() {
        return Err(ApiError::from_response(response.status, &response.reason, &response.body));
    }
    if !response.is_json() {
        return Ok(ResponseBody::Text(response.body));
    }
    if response.body.trim().is_empty() {
        return Ok(ResponseBody::Json(Value::Null));
    }
    serde_json::from_str(&response.body)
        .map(ResponseBody::Json)
        .map_err(|e| ApiError::Decode(format!("invalid JSON body: {e}")))
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_owned(),
    }
}
