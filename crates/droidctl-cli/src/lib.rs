//! # droidctl-cli
//!
//! Command-line interface for droidctl.
//!
//! ## Commands
//!
//! - `droidctl devices`: List connected devices
//! - `droidctl shell`: Run a command on the device, exiting with its status
//! - `droidctl getprop` / `setprop`: Read and write system properties
//! - `droidctl features`: Show what the device and bridge support
//! - `droidctl push` / `pull` / `install` / `forward` / `reverse` / ...: adb passthrough

pub mod commands;

pub use commands::Cli;
