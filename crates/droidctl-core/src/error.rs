use thiserror::Error;

/// Unified error type for every droidctl operation.
#[derive(Error, Debug)]
pub enum DroidError {
    // ── Discovery errors ───────────────────────────────────────
    #[error("no device with serial {serial}")]
    DeviceNotFound { serial: String },

    #[error("no unique device")]
    NoUniqueDevice,

    // ── Remote command errors ──────────────────────────────────
    /// The remote command ran to completion and exited nonzero.
    #[error("`{}` exited with code {exit_code}", .command.join(" "))]
    Shell {
        command: Vec<String>,
        stdout: Vec<u8>,
        stderr: Vec<u8>,
        exit_code: i32,
    },

    // ── Protocol errors ────────────────────────────────────────
    /// The bridge produced output the exit-code protocol could not parse.
    #[error("shell protocol error: {0}")]
    Protocol(String),

    // ── Transport errors ───────────────────────────────────────
    /// A bridge-level (non-shell) invocation exited nonzero.
    #[error("bridge command `{}` failed with exit code {exit_code}: {stderr}", .command.join(" "))]
    Transport {
        command: Vec<String>,
        exit_code: i32,
        stderr: String,
    },

    // ── Property errors ────────────────────────────────────────
    #[error("property error: {0}")]
    Property(String),

    // ── Config errors ──────────────────────────────────────────
    #[error("config error: {0}")]
    Config(String),

    #[error("config validation failed: {field}: {reason}")]
    ConfigValidation { field: String, reason: String },

    // ── Generic wrappers ───────────────────────────────────────
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl DroidError {
    /// True for errors raised while looking up a device to talk to.
    pub fn is_find_device_error(&self) -> bool {
        matches!(
            self,
            DroidError::DeviceNotFound { .. } | DroidError::NoUniqueDevice
        )
    }

    /// Exit code carried by a shell or transport failure.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            DroidError::Shell { exit_code, .. } | DroidError::Transport { exit_code, .. } => {
                Some(*exit_code)
            }
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, DroidError>;
