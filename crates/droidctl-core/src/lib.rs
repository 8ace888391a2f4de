//! # droidctl-core
//!
//! Core types and the error taxonomy shared by every crate in the droidctl
//! workspace: device addressing, shell results and the `DroidError` enum.

pub mod error;
pub mod types;

pub use error::{DroidError, Result};
pub use types::*;
