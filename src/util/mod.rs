//! Presentation helpers shared by front ends.

pub mod french_error;
