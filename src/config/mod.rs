//! Configuration Module
//!
//! Handles application configuration loading, validation, and management.

pub mod types;

pub use types::{Config, InstallConfig, LoggingConfig, RemoteConfig, deckhand_home};
