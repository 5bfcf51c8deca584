//! # Lorebase Core
//!
//! Shared foundation for the Lorebase workspace: configuration, the
//! workspace-wide error type, chat message types, and the provider traits
//! implemented by `lorebase-providers` and consumed by the knowledge store
//! and the answer engine.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::LorebaseConfig;
pub use error::{LorebaseError, Result};
