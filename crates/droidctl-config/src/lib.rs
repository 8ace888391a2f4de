//! # droidctl-config
//!
//! Configuration for droidctl. Reads `droidctl.toml`, then applies
//! environment variable overrides on top.

pub mod loader;
pub mod schema;

pub use loader::ConfigLoader;
pub use schema::{BridgeConfig, ConfigWarning, DroidConfig, LoggingConfig, WarningSeverity};
