//! Handle for one Android device reached through the `adb` bridge client.

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use droidctl_config::BridgeConfig;
use droidctl_core::{Device, DroidError, FeatureSet, Result, ShellOutput};
use tracing::{debug, info, warn};

use crate::process::{CommandRunner, PopenOptions, SystemRunner};
use crate::props;
use crate::protocol::{self, ShellMode};
use crate::session::ShellSession;

/// A single addressable device.
///
/// The feature set and the remote line terminator are each queried at most
/// once and cached for the handle's lifetime; the cached feature set decides
/// the shell protocol for every later command.
pub struct AndroidDevice {
    device: Device,
    adb_path: String,
    runner: Arc<dyn CommandRunner>,
    kill_popen_at_exit: bool,
    features: OnceLock<FeatureSet>,
    line_terminator: OnceLock<Vec<u8>>,
}

impl std::fmt::Debug for AndroidDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AndroidDevice")
            .field("device", &self.device)
            .field("adb_path", &self.adb_path)
            .field("features", &self.features.get())
            .finish()
    }
}

impl AndroidDevice {
    /// Address `device` through the real bridge binary.
    pub fn new(device: Device, config: &BridgeConfig) -> Self {
        Self::with_runner(device, config, Arc::new(SystemRunner::new()))
    }

    pub fn with_runner(
        device: Device,
        config: &BridgeConfig,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        Self {
            device,
            adb_path: config.adb_path.to_string_lossy().into_owned(),
            runner,
            kill_popen_at_exit: config.kill_popen_at_exit,
            features: OnceLock::new(),
            line_terminator: OnceLock::new(),
        }
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn serial(&self) -> &str {
        self.device.serial()
    }

    pub fn product(&self) -> Option<&str> {
        self.device.product()
    }

    /// `adb -s <serial> [-p <product>]`
    pub fn adb_cmd(&self) -> Vec<String> {
        let mut cmd = Vec::with_capacity(1 + self.device.connection_args().len());
        cmd.push(self.adb_path.clone());
        cmd.extend_from_slice(self.device.connection_args());
        cmd
    }

    // ── Capability discovery ───────────────────────────────────

    /// Features supported by the device and bridge. A failed query means the
    /// legacy protocol and yields the empty set.
    pub fn features(&self) -> &FeatureSet {
        self.features.get_or_init(|| match self.simple_call(&["features"]) {
            Ok(out) => String::from_utf8_lossy(&out)
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(String::from)
                .collect(),
            Err(e) => {
                warn!(
                    serial = %self.serial(),
                    error = %e,
                    "feature query failed, assuming legacy shell protocol"
                );
                FeatureSet::new()
            }
        })
    }

    pub fn has_feature(&self, name: &str) -> bool {
        self.features().contains(name)
    }

    pub fn shell_mode(&self) -> ShellMode {
        ShellMode::for_features(self.features())
    }

    /// Line ending the remote shell produces, probed with a bare `echo`.
    /// A failed probe is returned as an error and retried on the next call.
    pub fn line_terminator(&self) -> Result<&[u8]> {
        if let Some(sep) = self.line_terminator.get() {
            return Ok(sep);
        }
        let out = self.simple_call(&["shell", "echo"])?;
        Ok(self.line_terminator.get_or_init(|| out))
    }

    // ── Shell ──────────────────────────────────────────────────

    /// Run `cmd` on the device and fail with [`DroidError::Shell`] on a
    /// nonzero exit. Returns `(stdout, stderr)`; on the legacy protocol
    /// stderr is merged into stdout.
    pub fn shell<S: AsRef<str>>(&self, cmd: &[S]) -> Result<(Vec<u8>, Vec<u8>)> {
        let out = self.shell_nocheck(cmd)?;
        if out.exit_code != 0 {
            return Err(DroidError::Shell {
                command: cmd.iter().map(|s| s.as_ref().to_string()).collect(),
                stdout: out.stdout,
                stderr: out.stderr,
                exit_code: out.exit_code,
            });
        }
        Ok((out.stdout, out.stderr))
    }

    /// Run `cmd` on the device and return its exit code and output.
    pub fn shell_nocheck<S: AsRef<str>>(&self, cmd: &[S]) -> Result<ShellOutput> {
        let mode = self.shell_mode();
        let command = protocol::build_shell_command(&self.adb_cmd(), cmd, mode);
        info!(command = %command.join(" "), "adb shell");
        let out = self.runner.run(&command)?;

        match mode {
            ShellMode::Structured => Ok(ShellOutput {
                exit_code: out.exit_code,
                stdout: out.stdout,
                stderr: out.stderr,
            }),
            ShellMode::Legacy => {
                let bridge_code = out.exit_code;
                let (exit_code, stdout) =
                    protocol::parse_legacy_output(out.stdout).inspect_err(|_| {
                        warn!(
                            serial = %self.serial(),
                            bridge_exit_code = bridge_code,
                            stderr = %String::from_utf8_lossy(&out.stderr).trim(),
                            "no exit status in legacy shell output"
                        );
                    })?;
                debug!(exit_code, stdout_bytes = stdout.len(), "legacy shell finished");
                Ok(ShellOutput {
                    exit_code,
                    stdout,
                    stderr: out.stderr,
                })
            }
        }
    }

    /// Start `adb shell <cmd>` and return the live process without waiting.
    /// No exit-code recovery is done on the result.
    pub fn shell_popen<S: AsRef<str>>(
        &self,
        cmd: &[S],
        options: &PopenOptions,
    ) -> Result<ShellSession> {
        let mut command = self.adb_cmd();
        command.push("shell".to_string());
        command.extend(cmd.iter().map(|s| s.as_ref().to_string()));
        ShellSession::start(self.runner.as_ref(), command, options)
    }

    /// Popen defaults for this handle, honouring `bridge.kill_popen_at_exit`.
    pub fn popen_options(&self) -> PopenOptions {
        PopenOptions::default().kill_at_exit(self.kill_popen_at_exit)
    }

    // ── Properties ─────────────────────────────────────────────

    pub fn get_props(&self) -> Result<BTreeMap<String, String>> {
        let (out, _) = self.shell(&["getprop"])?;
        props::parse_props(&String::from_utf8_lossy(&out))
    }

    /// Value of one property, `None` if unset.
    pub fn get_prop(&self, name: &str) -> Result<Option<String>> {
        let (out, _) = self.shell(&["getprop", name])?;
        props::parse_prop_value(&String::from_utf8_lossy(&out))
    }

    pub fn set_prop(&self, name: &str, value: &str) -> Result<()> {
        self.shell(&["setprop", name, value])?;
        Ok(())
    }

    // ── Bridge passthrough ─────────────────────────────────────

    fn simple_call(&self, args: &[&str]) -> Result<Vec<u8>> {
        let mut command = self.adb_cmd();
        command.extend(args.iter().map(|s| s.to_string()));
        info!(command = %command.join(" "), "adb");
        self.runner.run(&command)?.check(&command)
    }

    pub fn install(&self, filename: &str, replace: bool) -> Result<Vec<u8>> {
        let mut args = vec!["install"];
        if replace {
            args.push("-r");
        }
        args.push(filename);
        self.simple_call(&args)
    }

    pub fn push(&self, local: &str, remote: &str) -> Result<Vec<u8>> {
        self.simple_call(&["push", local, remote])
    }

    pub fn pull(&self, remote: &str, local: &str) -> Result<Vec<u8>> {
        self.simple_call(&["pull", remote, local])
    }

    pub fn sync(&self, directory: Option<&str>) -> Result<Vec<u8>> {
        let mut args = vec!["sync"];
        args.extend(directory);
        self.simple_call(&args)
    }

    pub fn forward(&self, local: &str, remote: &str) -> Result<Vec<u8>> {
        self.simple_call(&["forward", local, remote])
    }

    pub fn forward_remove(&self, local: &str) -> Result<Vec<u8>> {
        self.simple_call(&["forward", "--remove", local])
    }

    pub fn forward_remove_all(&self) -> Result<Vec<u8>> {
        self.simple_call(&["forward", "--remove-all"])
    }

    pub fn reverse(&self, remote: &str, local: &str) -> Result<Vec<u8>> {
        self.simple_call(&["reverse", remote, local])
    }

    pub fn reverse_remove(&self, remote: &str) -> Result<Vec<u8>> {
        self.simple_call(&["reverse", "--remove", remote])
    }

    pub fn reverse_remove_all(&self) -> Result<Vec<u8>> {
        self.simple_call(&["reverse", "--remove-all"])
    }

    pub fn tcpip(&self, port: u16) -> Result<Vec<u8>> {
        self.simple_call(&["tcpip", &port.to_string()])
    }

    pub fn usb(&self) -> Result<Vec<u8>> {
        self.simple_call(&["usb"])
    }

    pub fn reboot(&self) -> Result<Vec<u8>> {
        self.simple_call(&["reboot"])
    }

    pub fn remount(&self) -> Result<Vec<u8>> {
        self.simple_call(&["remount"])
    }

    pub fn root(&self) -> Result<Vec<u8>> {
        self.simple_call(&["root"])
    }

    pub fn unroot(&self) -> Result<Vec<u8>> {
        self.simple_call(&["unroot"])
    }

    pub fn connect(&self, host: &str) -> Result<Vec<u8>> {
        self.simple_call(&["connect", host])
    }

    pub fn disconnect(&self, host: &str) -> Result<Vec<u8>> {
        self.simple_call(&["disconnect", host])
    }

    /// Block until the device is reachable (`wait-for-device`).
    pub fn wait(&self) -> Result<Vec<u8>> {
        self.simple_call(&["wait-for-device"])
    }
}
