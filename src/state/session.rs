//! Signed-in session: current user plus a loading flag.
//!
//! ARCHITECTURE
//! ============
//! [`Session`] owns the shared [`ApiClient`] and publishes [`AuthState`]
//! through a `tokio::sync::watch` channel, so any number of views can follow
//! sign-in changes without polling.
//!
//! Bootstrap is a linear chain with at most two profile fetches and one
//! refresh:
//!
//! ```text
//! no token ─────────────────────────────────────────────► signed out
//! token ── profile ok ──────────────────────────────────► signed in
//!            └─ fail ── refresh ok ── profile ok ───────► signed in
//!                          │             └── fail ──────► signed out
//!                          └── fail ────────────────────► signed out
//! ```
//!
//! Profile fetches during bootstrap disable the client's own 401 retry so
//! the chain above is the only place a refresh happens.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::watch;

use crate::net::client::{ApiClient, RequestOptions};
use crate::net::error::ApiError;
use crate::net::types::{RegisterRequest, User};

/// Snapshot published to subscribers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthState {
    pub user: Option<User>,
    /// True until [`Session::bootstrap`] has finished.
    pub loading: bool,
}

impl AuthState {
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

pub struct Session {
    client: Arc<ApiClient>,
    state: watch::Sender<AuthState>,
}

impl Session {
    /// New session in the loading state; call [`Session::bootstrap`] next.
    #[must_use]
    pub fn new(client: Arc<ApiClient>) -> Self {
        let (state, _) = watch::channel(AuthState { user: None, loading: true });
        Self { client, state }
    }

    #[must_use]
    pub fn client(&self) -> &Arc<ApiClient> {
        &self.client
    }

    #[must_use]
    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.state.borrow().user.clone()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    /// Resolve the initial user from the persisted token.
    ///
    /// Never fails: every error path ends signed out.
    pub async fn bootstrap(&self) -> Option<User> {
        let user = self.resolve_initial_user().await;
        self.state.send_replace(AuthState { user: user.clone(), loading: false });
        user
    }

    async fn resolve_initial_user(&self) -> Option<User> {
        if self.client.access_token().is_none() {
            tracing::debug!("no stored access token; starting signed out");
            return None;
        }

        let options = RequestOptions::no_retry();
        match self.client.profile_with(&options).await {
            Ok(user) => return Some(user),
            Err(error) => tracing::debug!(error = %error, "stored token rejected; trying refresh"),
        }

        if !self.client.refresh_access_token().await {
            return None;
        }
        match self.client.profile_with(&options).await {
            Ok(user) => Some(user),
            Err(error) => {
                tracing::warn!(error = %error, "profile fetch failed after refresh");
                None
            }
        }
    }

    /// Log in and load the profile.
    ///
    /// # Errors
    ///
    /// The login or profile error; the published user is unchanged.
    pub async fn login(&self, username: &str, password: &str) -> Result<User, ApiError> {
        self.client.login(username, password).await?;
        let user = self.client.profile().await?;
        self.set_user(Some(user.clone()));
        Ok(user)
    }

    /// Create an account without signing in.
    ///
    /// # Errors
    ///
    /// The registration error (field errors arrive as a 400 body).
    pub async fn register(&self, request: &RegisterRequest) -> Result<Value, ApiError> {
        self.client.register(request).await
    }

    /// Sign out. The token and user are cleared even when the call fails.
    ///
    /// # Errors
    ///
    /// The logout call's error, after local state has been cleared.
    pub async fn logout(&self) -> Result<(), ApiError> {
        let outcome = self.client.logout().await;
        self.set_user(None);
        outcome
    }

    /// Refresh the access token and reload the profile.
    ///
    /// Returns `false` when the refresh fails (user left as is) or when the
    /// profile cannot be loaded afterwards (user cleared).
    pub async fn refresh(&self) -> bool {
        if !self.client.refresh_access_token().await {
            return false;
        }
        match self.client.profile().await {
            Ok(user) => {
                self.set_user(Some(user));
                true
            }
            Err(error) => {
                tracing::warn!(error = %error, "profile fetch failed after refresh");
                self.set_user(None);
                false
            }
        }
    }

    fn set_user(&self, user: Option<User>) {
        self.state.send_modify(|state| state.user = user);
    }
}
