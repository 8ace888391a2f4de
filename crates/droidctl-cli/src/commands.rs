use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use std::io::Write;
use std::path::PathBuf;
use tracing::debug;

use droidctl_config::{ConfigLoader, DroidConfig};
use droidctl_device::{AndroidDevice, DeviceDirectory, PopenOptions};

/// Drive Android devices through the adb bridge
#[derive(Parser)]
#[command(name = "droidctl", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to droidctl.toml config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Serial of the target device (overrides the serial environment variable)
    #[arg(short, long, global = true)]
    serial: Option<String>,

    /// Product qualifier passed to adb as -p
    #[arg(short, long, global = true, conflicts_with_all = ["usb", "emulator"])]
    product: Option<String>,

    /// Target the only USB-connected device
    #[arg(short = 'd', long, global = true, conflicts_with_all = ["serial", "emulator"])]
    usb: bool,

    /// Target the only running emulator
    #[arg(short = 'e', long, global = true, conflicts_with = "serial")]
    emulator: bool,

    /// Log level override (e.g. debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress all log output (errors only)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List connected devices
    Devices {
        /// Include offline devices and show their state
        #[arg(short, long)]
        all: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run a shell command on the device and exit with its status
    Shell {
        /// Attach the command to this terminal instead of capturing output
        #[arg(long)]
        stream: bool,
        /// Command and arguments
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },
    /// Show one system property, or all of them
    Getprop {
        name: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Set a system property
    Setprop { name: String, value: String },
    /// List features supported by the device and bridge
    Features {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Copy a local file to the device
    Push { local: String, remote: String },
    /// Copy a file from the device
    Pull { remote: String, local: String },
    /// Install an APK
    Install {
        /// Replace an existing installation
        #[arg(short, long)]
        replace: bool,
        path: String,
    },
    /// Manage host-to-device port forwards
    Forward {
        #[command(subcommand)]
        action: PortAction,
    },
    /// Manage device-to-host port forwards
    Reverse {
        #[command(subcommand)]
        action: PortAction,
    },
    /// Reboot the device
    Reboot,
    /// Restart adbd with root permissions
    Root,
    /// Restart adbd without root permissions
    Unroot,
    /// Remount system partitions read-write
    Remount,
    /// Block until the device is available
    Wait,
    /// Show current configuration
    Config {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Generate shell completions for bash, zsh, or fish
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum PortAction {
    /// Add a forward, e.g. `tcp:8080 tcp:8080`
    Add { from: String, to: String },
    /// Remove one forward
    Remove { from: String },
    /// Remove every forward
    RemoveAll,
}

impl Cli {
    /// Run the command and return the process exit code.
    pub fn run(self) -> droidctl_core::Result<i32> {
        let config_loader = ConfigLoader::load(self.config.as_deref())?;
        let config = config_loader.get();

        // Resolve log level: --verbose > --quiet > --log-level > config
        let log_level = if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            self.log_level.as_deref().unwrap_or(&config.logging.level)
        };
        init_tracing(&config.logging.format, log_level);
        debug!(config_path = ?config_loader.path(), "configuration ready");

        let directory = DeviceDirectory::new(config.bridge.clone());

        match self.command {
            Commands::Devices { all, json } => Self::cmd_devices(&directory, all, json),
            Commands::Shell { stream, ref command } => {
                let device = self.target(&directory)?;
                Self::cmd_shell(&device, command, stream)
            }
            Commands::Getprop { ref name, json } => {
                let device = self.target(&directory)?;
                Self::cmd_getprop(&device, name.as_deref(), json)
            }
            Commands::Setprop {
                ref name,
                ref value,
            } => {
                self.target(&directory)?.set_prop(name, value)?;
                Ok(0)
            }
            Commands::Features { json } => {
                let device = self.target(&directory)?;
                Self::cmd_features(&device, json)
            }
            Commands::Push {
                ref local,
                ref remote,
            } => print_raw(&self.target(&directory)?.push(local, remote)?),
            Commands::Pull {
                ref remote,
                ref local,
            } => print_raw(&self.target(&directory)?.pull(remote, local)?),
            Commands::Install { replace, ref path } => {
                print_raw(&self.target(&directory)?.install(path, replace)?)
            }
            Commands::Forward { ref action } => {
                let device = self.target(&directory)?;
                let out = match action {
                    PortAction::Add { from, to } => device.forward(from, to)?,
                    PortAction::Remove { from } => device.forward_remove(from)?,
                    PortAction::RemoveAll => device.forward_remove_all()?,
                };
                print_raw(&out)
            }
            Commands::Reverse { ref action } => {
                let device = self.target(&directory)?;
                let out = match action {
                    PortAction::Add { from, to } => device.reverse(from, to)?,
                    PortAction::Remove { from } => device.reverse_remove(from)?,
                    PortAction::RemoveAll => device.reverse_remove_all()?,
                };
                print_raw(&out)
            }
            Commands::Reboot => print_raw(&self.target(&directory)?.reboot()?),
            Commands::Root => print_raw(&self.target(&directory)?.root()?),
            Commands::Unroot => print_raw(&self.target(&directory)?.unroot()?),
            Commands::Remount => print_raw(&self.target(&directory)?.remount()?),
            Commands::Wait => print_raw(&self.target(&directory)?.wait()?),
            Commands::Config { json } => Self::cmd_config(&config, json),
            Commands::Completions { shell } => Self::cmd_completions(shell),
        }
    }

    /// Pick the device named by the global flags.
    fn target(&self, directory: &DeviceDirectory) -> droidctl_core::Result<AndroidDevice> {
        if self.usb {
            directory.usb_device()
        } else if self.emulator {
            directory.emulator_device()
        } else {
            directory.resolve(self.serial.as_deref(), self.product.as_deref())
        }
    }

    fn cmd_devices(directory: &DeviceDirectory, all: bool, json: bool) -> droidctl_core::Result<i32> {
        let entries: Vec<_> = directory
            .device_entries()?
            .into_iter()
            .filter(|e| all || !e.is_offline())
            .collect();

        if json {
            println!("{}", serde_json::to_string_pretty(&entries)?);
        } else if all {
            for entry in &entries {
                println!("{}\t{}", entry.serial, entry.state);
            }
        } else {
            for entry in &entries {
                println!("{}", entry.serial);
            }
        }
        Ok(0)
    }

    fn cmd_shell(device: &AndroidDevice, command: &[String], stream: bool) -> droidctl_core::Result<i32> {
        if stream {
            let session = device.shell_popen(command, &stream_options(device))?;
            return session.wait();
        }

        let out = device.shell_nocheck(command)?;
        std::io::stdout().write_all(&out.stdout)?;
        std::io::stderr().write_all(&out.stderr)?;
        Ok(out.exit_code)
    }

    fn cmd_getprop(device: &AndroidDevice, name: Option<&str>, json: bool) -> droidctl_core::Result<i32> {
        match name {
            Some(name) => {
                let value = device.get_prop(name)?;
                if json {
                    println!("{}", serde_json::to_string(&value)?);
                } else if let Some(v) = value {
                    println!("{v}");
                }
            }
            None => {
                let props = device.get_props()?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&props)?);
                } else {
                    for (k, v) in &props {
                        println!("[{k}]: [{v}]");
                    }
                }
            }
        }
        Ok(0)
    }

    fn cmd_features(device: &AndroidDevice, json: bool) -> droidctl_core::Result<i32> {
        let features = device.features();
        if json {
            println!("{}", serde_json::to_string_pretty(features)?);
        } else {
            for feature in features {
                println!("{feature}");
            }
        }
        Ok(0)
    }

    fn cmd_config(config: &DroidConfig, json: bool) -> droidctl_core::Result<i32> {
        if json {
            println!("{}", serde_json::to_string_pretty(config)?);
        } else {
            println!(
                "{}",
                toml::to_string_pretty(config)
                    .map_err(|e| anyhow::anyhow!("failed to render config as TOML: {e}"))?
            );
        }
        Ok(0)
    }

    fn cmd_completions(shell: Shell) -> droidctl_core::Result<i32> {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "droidctl", &mut std::io::stdout());
        Ok(0)
    }
}

/// Install the tracing subscriber. `RUST_LOG` takes precedence over `level`.
fn init_tracing(format: &str, level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        "json" => builder.json().with_target(true).init(),
        "compact" => builder.compact().with_target(false).init(),
        _ => builder.with_target(false).init(),
    }
}

/// Popen options for a shell attached to this terminal. adb stays in the
/// foreground process group so it can read the terminal without SIGTTIN.
fn stream_options(device: &AndroidDevice) -> PopenOptions {
    device.popen_options().new_process_group(false)
}

/// Write bridge output to stdout untouched.
fn print_raw(bytes: &[u8]) -> droidctl_core::Result<i32> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(bytes)?;
    stdout.flush()?;
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use droidctl_config::BridgeConfig;
    use droidctl_core::Device;
    use droidctl_device::StdioMode;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_shell_keeps_hyphen_args() {
        let cli = Cli::try_parse_from(["droidctl", "-s", "abc", "shell", "ls", "-l", "/sdcard"]).unwrap();
        assert_eq!(cli.serial.as_deref(), Some("abc"));
        match cli.command {
            Commands::Shell { stream, command } => {
                assert!(!stream);
                assert_eq!(command, ["ls", "-l", "/sdcard"]);
            }
            _ => panic!("expected shell command"),
        }
    }

    #[test]
    fn test_parse_usb_conflicts_with_serial() {
        assert!(Cli::try_parse_from(["droidctl", "-d", "-s", "abc", "reboot"]).is_err());
    }

    #[test]
    fn test_parse_product_conflicts_with_connection_type() {
        assert!(Cli::try_parse_from(["droidctl", "-d", "-p", "walleye", "reboot"]).is_err());
        assert!(Cli::try_parse_from(["droidctl", "-e", "-p", "walleye", "reboot"]).is_err());
        assert!(Cli::try_parse_from(["droidctl", "-s", "abc", "-p", "walleye", "reboot"]).is_ok());
    }

    #[test]
    fn test_stream_options_keep_foreground_process_group() {
        let config = BridgeConfig::default();
        let device = AndroidDevice::new(Device::new("abc", None), &config);
        let opts = stream_options(&device);
        assert!(!opts.new_process_group);
        assert!(opts.kill_at_exit);
        assert_eq!(opts.stdin, StdioMode::Inherit);

        let config = BridgeConfig {
            kill_popen_at_exit: false,
            ..BridgeConfig::default()
        };
        let device = AndroidDevice::new(Device::new("abc", None), &config);
        assert!(!stream_options(&device).kill_at_exit);
    }

    #[test]
    fn test_parse_forward_remove() {
        let cli = Cli::try_parse_from(["droidctl", "forward", "remove", "tcp:8080"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Forward {
                action: PortAction::Remove { .. }
            }
        ));
    }

    #[test]
    fn test_parse_install_replace() {
        let cli = Cli::try_parse_from(["droidctl", "install", "-r", "app.apk"]).unwrap();
        match cli.command {
            Commands::Install { replace, path } => {
                assert!(replace);
                assert_eq!(path, "app.apk");
            }
            _ => panic!("expected install command"),
        }
    }
}
