//! services/companion/src/lib.rs
//!
//! The CalmMind companion service: storage and model adapters, configuration,
//! and the conversation controller driven by the terminal front end.

pub mod adapters;
pub mod config;
pub mod error;
pub mod session;
