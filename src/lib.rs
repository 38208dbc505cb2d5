//! Salariz: client library for the payslip-analysis backend.
//!
//! SYSTEM CONTEXT
//! ==============
//! The backend owns every business rule (PDF ingestion, AI analysis, credit
//! accounting). This crate is the glue a front end needs around it:
//!
//! - `net` talks HTTP: bearer auth, one refresh-and-replay on 401, and a
//!   uniform [`net::error::ApiError`] for every failure.
//! - `state` owns the access token slot and the signed-in user.
//! - `util` turns errors into French user-facing messages.
//! - `report` shapes server JSON into dashboard rows and analysis reports,
//!   including a standalone HTML export.

pub mod config;
pub mod net;
pub mod report;
pub mod state;
pub mod util;

pub use config::ClientConfig;
pub use net::client::ApiClient;
pub use net::error::ApiError;
pub use state::session::{AuthState, Session};
