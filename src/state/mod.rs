//! Client-side state: the access-token slot and the signed-in session.

pub mod session;
pub mod token;
