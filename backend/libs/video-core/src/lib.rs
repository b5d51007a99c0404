//! Feed content core models and types
//!
//! Shared data structures for the feed engine and the services that feed it

pub mod constants;
pub mod models;

pub use models::*;
