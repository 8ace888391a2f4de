use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration, read from `droidctl.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DroidConfig {
    pub bridge: BridgeConfig,
    pub logging: LoggingConfig,
}

// ── Bridge ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Bridge client executable, looked up on PATH when not absolute.
    pub adb_path: PathBuf,
    /// Environment variable holding the default device serial.
    pub serial_env: String,
    /// Product qualifier passed as `-p` to every device-scoped command.
    pub product: Option<String>,
    /// Register `shell_popen` processes for termination at exit.
    pub kill_popen_at_exit: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            adb_path: PathBuf::from("adb"),
            serial_env: "ANDROID_SERIAL".into(),
            product: None,
            kill_popen_at_exit: true,
        }
    }
}

// ── Logging ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
    /// Output format: "pretty", "json", "compact".
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".into(),
            format: "pretty".into(),
        }
    }
}

// ── Validation ─────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ConfigWarning {
    pub field: String,
    pub message: String,
    pub severity: WarningSeverity,
    pub hint: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningSeverity {
    Error,
    Warning,
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self.severity {
            WarningSeverity::Error => "error",
            WarningSeverity::Warning => "warning",
        };
        write!(f, "{}: {}: {}", tag, self.field, self.message)?;
        if let Some(ref h) = self.hint {
            write!(f, " ({})", h)?;
        }
        Ok(())
    }
}

const VALID_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
const VALID_FORMATS: [&str; 3] = ["pretty", "json", "compact"];

impl DroidConfig {
    /// Validate the config and return a list of warnings.
    /// Returns `Err` with all error messages joined if any severity is Error.
    pub fn validate(&self) -> Result<Vec<ConfigWarning>, String> {
        let mut warnings = Vec::new();

        if self.bridge.adb_path.as_os_str().is_empty() {
            warnings.push(ConfigWarning {
                field: "bridge.adb_path".into(),
                message: "bridge executable path is empty".into(),
                severity: WarningSeverity::Error,
                hint: Some("Set to \"adb\" or an absolute path to platform-tools/adb".into()),
            });
        }

        if self.bridge.serial_env.trim().is_empty() {
            warnings.push(ConfigWarning {
                field: "bridge.serial_env".into(),
                message: "serial override variable name is empty".into(),
                severity: WarningSeverity::Error,
                hint: Some("The conventional name is ANDROID_SERIAL".into()),
            });
        }

        if let Some(ref p) = self.bridge.product
            && p.trim().is_empty()
        {
            warnings.push(ConfigWarning {
                field: "bridge.product".into(),
                message: "product qualifier is blank and will be ignored by adb".into(),
                severity: WarningSeverity::Warning,
                hint: Some("Remove the key to address devices by serial only".into()),
            });
        }

        if !VALID_LEVELS.contains(&self.logging.level.as_str()) {
            warnings.push(ConfigWarning {
                field: "logging.level".into(),
                message: format!("unknown log level '{}'", self.logging.level),
                severity: WarningSeverity::Warning,
                hint: Some(format!("Valid values: {}", VALID_LEVELS.join(", "))),
            });
        }

        if !VALID_FORMATS.contains(&self.logging.format.as_str()) {
            warnings.push(ConfigWarning {
                field: "logging.format".into(),
                message: format!("unknown log format '{}'", self.logging.format),
                severity: WarningSeverity::Error,
                hint: Some(format!("Valid values: {}", VALID_FORMATS.join(", "))),
            });
        }

        let errors: Vec<String> = warnings
            .iter()
            .filter(|w| w.severity == WarningSeverity::Error)
            .map(|w| w.to_string())
            .collect();
        if !errors.is_empty() {
            return Err(errors.join("; "));
        }
        Ok(warnings)
    }
}
