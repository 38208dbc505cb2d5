//! Networking modules for the backend REST API.
//!
//! SYSTEM CONTEXT
//! ==============
//! `transport` sends one fully-described HTTP request, `client` layers bearer
//! auth and refresh-and-replay on top, `api` names every endpoint, `types`
//! defines the wire schema and `error` the single failure type. `cookies`
//! holds the refresh cookie between runs.

pub mod api;
pub mod client;
pub mod cookies;
pub mod error;
pub mod transport;
pub mod types;
