//! Device discovery and unique-target resolution.

use std::sync::Arc;

use droidctl_config::BridgeConfig;
use droidctl_core::{ConnectionType, Device, DeviceEntry, DroidError, Result};
use tracing::{debug, info};

use crate::android::AndroidDevice;
use crate::process::{CommandRunner, SystemRunner};

/// Parse `adb devices` output. The first line is the
/// "List of attached devices" header; blank lines are skipped.
pub fn parse_device_list(output: &str) -> Vec<DeviceEntry> {
    output
        .lines()
        .skip(1)
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let serial = parts.next()?;
            let state = parts.next().unwrap_or_default();
            Some(DeviceEntry {
                serial: serial.to_string(),
                state: state.to_string(),
            })
        })
        .collect()
}

/// Lists connected devices and hands out [`AndroidDevice`] handles.
pub struct DeviceDirectory {
    config: BridgeConfig,
    runner: Arc<dyn CommandRunner>,
}

impl DeviceDirectory {
    pub fn new(config: BridgeConfig) -> Self {
        Self::with_runner(config, Arc::new(SystemRunner::new()))
    }

    pub fn with_runner(config: BridgeConfig, runner: Arc<dyn CommandRunner>) -> Self {
        Self { config, runner }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    fn adb(&self, args: &[&str]) -> Vec<String> {
        let mut command = vec![self.config.adb_path.to_string_lossy().into_owned()];
        command.extend(args.iter().map(|s| s.to_string()));
        command
    }

    fn check_call(&self, args: &[&str]) -> Result<Vec<u8>> {
        let command = self.adb(args);
        info!(command = %command.join(" "), "adb");
        self.runner.run(&command)?.check(&command)
    }

    /// Start the bridge server. Does nothing if it is already running.
    pub fn start_server(&self) -> Result<()> {
        self.check_call(&["start-server"])?;
        Ok(())
    }

    /// Every device `adb devices` reports, offline ones included.
    pub fn device_entries(&self) -> Result<Vec<DeviceEntry>> {
        self.start_server()?;
        let out = self.check_call(&["devices"])?;
        let entries = parse_device_list(&String::from_utf8_lossy(&out));
        debug!(count = entries.len(), "listed devices");
        Ok(entries)
    }

    /// Serials of connected devices that are not offline, in listed order.
    pub fn list_devices(&self) -> Result<Vec<String>> {
        Ok(self
            .device_entries()?
            .into_iter()
            .filter(|e| !e.is_offline())
            .map(|e| e.serial)
            .collect())
    }

    /// Build a handle without checking that the device is connected.
    pub fn device(&self, serial: &str, product: Option<&str>) -> AndroidDevice {
        let product = product
            .map(str::to_string)
            .or_else(|| self.config.product.clone());
        AndroidDevice::with_runner(
            Device::new(serial, product),
            &self.config,
            Arc::clone(&self.runner),
        )
    }

    /// Resolve a single device, preferring in order:
    ///
    /// 1. the `serial` argument,
    /// 2. the serial override environment variable (`ANDROID_SERIAL` by default),
    /// 3. the only connected device.
    ///
    /// A requested serial that is not connected is [`DroidError::DeviceNotFound`];
    /// with nothing requested, zero or several devices is
    /// [`DroidError::NoUniqueDevice`].
    pub fn resolve(&self, serial: Option<&str>, product: Option<&str>) -> Result<AndroidDevice> {
        if let Some(serial) = serial {
            return self.resolve_serial(serial, product);
        }

        if let Ok(env_serial) = std::env::var(&self.config.serial_env) {
            debug!(var = %self.config.serial_env, serial = %env_serial, "using serial from environment");
            return self.resolve_serial(&env_serial, product);
        }

        let devices = self.list_devices()?;
        match devices.as_slice() {
            [only] => Ok(self.device(only, product)),
            _ => Err(DroidError::NoUniqueDevice),
        }
    }

    fn resolve_serial(&self, serial: &str, product: Option<&str>) -> Result<AndroidDevice> {
        if self.list_devices()?.iter().any(|d| d == serial) {
            Ok(self.device(serial, product))
        } else {
            Err(DroidError::DeviceNotFound {
                serial: serial.to_string(),
            })
        }
    }

    /// The unique device of one connection class (`adb -d` / `adb -e`).
    pub fn resolve_by_connection_type(&self, kind: ConnectionType) -> Result<AndroidDevice> {
        self.start_server()?;
        let command = self.adb(&[kind.flag(), "get-serialno"]);
        info!(command = %command.join(" "), "adb");
        let out = self.runner.run(&command)?.check(&command)?;
        let serial = String::from_utf8_lossy(&out).trim().to_string();
        if serial == "unknown" {
            return Err(DroidError::NoUniqueDevice);
        }
        self.resolve_serial(&serial, None)
    }

    pub fn usb_device(&self) -> Result<AndroidDevice> {
        self.resolve_by_connection_type(ConnectionType::Usb)
    }

    pub fn emulator_device(&self) -> Result<AndroidDevice> {
        self.resolve_by_connection_type(ConnectionType::Emulator)
    }
}
