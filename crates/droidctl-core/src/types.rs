use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Serial number identifying a connected device.
pub type Serial = String;

/// Capability names reported by `adb features`.
pub type FeatureSet = BTreeSet<String>;

/// Feature name of the structured shell protocol.
pub const SHELL_PROTOCOL_FEATURE: &str = "shell_v2";

/// How to address one specific device on every bridge invocation.
///
/// Immutable after construction; `connection_args` is derived once from the
/// serial and product.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Device {
    serial: Serial,
    product: Option<String>,
    connection_args: Vec<String>,
}

impl Device {
    pub fn new(serial: impl Into<String>, product: Option<String>) -> Self {
        let serial = serial.into();
        let mut connection_args = vec!["-s".to_string(), serial.clone()];
        if let Some(ref p) = product {
            connection_args.push("-p".to_string());
            connection_args.push(p.clone());
        }
        Self {
            serial,
            product,
            connection_args,
        }
    }

    pub fn serial(&self) -> &str {
        &self.serial
    }

    pub fn product(&self) -> Option<&str> {
        self.product.as_deref()
    }

    /// Address arguments prepended to every device-scoped subcommand.
    pub fn connection_args(&self) -> &[String] {
        &self.connection_args
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.product {
            Some(ref p) => write!(f, "{} ({})", self.serial, p),
            None => f.write_str(&self.serial),
        }
    }
}

/// One line of `adb devices` output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceEntry {
    pub serial: Serial,
    /// Connection state: "device", "offline", "unauthorized", "recovery", ...
    pub state: String,
}

impl DeviceEntry {
    pub fn is_offline(&self) -> bool {
        self.state == "offline"
    }
}

/// Class of connection used to pick the unique device of that kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionType {
    Usb,
    Emulator,
}

impl ConnectionType {
    /// The bridge flag selecting this connection class.
    pub fn flag(self) -> &'static str {
        match self {
            ConnectionType::Usb => "-d",
            ConnectionType::Emulator => "-e",
        }
    }
}

/// Result of a remote shell command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShellOutput {
    pub exit_code: i32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ShellOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Stdout decoded lossily as UTF-8.
    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}
