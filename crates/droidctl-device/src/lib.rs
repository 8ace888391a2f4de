//! # droidctl-device
//!
//! Host-side control of Android devices through the `adb` bridge client.
//!
//! - [`DeviceDirectory`] lists connected devices and resolves a unique target
//! - [`AndroidDevice`] runs shell commands and recovers their exit status on
//!   both the structured (`shell_v2`) and the legacy text-stream protocol
//! - [`CommandRunner`] is the process boundary; [`SystemRunner`] spawns the
//!   real bridge binary and [`mock::ScriptedRunner`] replays canned output
//!
//! All operations are blocking. Long-lived `shell_popen` sessions can be
//! registered with [`cleanup`] so the host kills them on shutdown.

pub mod android;
pub mod cleanup;
pub mod directory;
pub mod mock;
pub mod process;
pub mod props;
pub mod protocol;
pub mod session;

pub use android::AndroidDevice;
pub use directory::DeviceDirectory;
pub use process::{CommandRunner, PopenOptions, ProcessOutput, StdioMode, SystemRunner};
pub use session::ShellSession;
