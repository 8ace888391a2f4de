//! Remote shell execution protocol.
//!
//! With the `shell_v2` feature the bridge reports the remote exit code and
//! keeps stdout and stderr apart, so commands go out untouched. Without it
//! the streams are merged and the exit status is lost; we append an epilogue
//! that prints a delimiter followed by `$?` and recover the code from the tail
//! of stdout.

use droidctl_core::{DroidError, FeatureSet, Result, SHELL_PROTOCOL_FEATURE};

/// Marks the start of the exit code in legacy output. Not a digit, so
/// `printf 1; echo $?` cannot be confused with a code of `10`.
pub const RETURN_CODE_DELIMITER: u8 = b'x';

/// Appended to legacy shell commands to print the exit status.
pub const RETURN_CODE_PROBE: &str = "; echo \"x$?\"";

/// Exit codes fit in three digits.
const MAX_EXIT_CODE_DIGITS: usize = 3;

/// adb on Windows returns `\r\n` even when adbd sends `\n`.
const MAX_LINE_TERMINATOR_LEN: usize = 2;

/// How far back from the end of the output the delimiter is searched for.
pub const RETURN_CODE_SEARCH_LENGTH: usize = 1 + MAX_EXIT_CODE_DIGITS + MAX_LINE_TERMINATOR_LEN;

/// Shell execution mode, chosen once from the device's feature set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellMode {
    /// `shell_v2`: exit code and separate streams come from the transport.
    Structured,
    /// Merged text stream; exit code recovered from a synthetic epilogue.
    Legacy,
}

impl ShellMode {
    pub fn for_features(features: &FeatureSet) -> Self {
        if features.contains(SHELL_PROTOCOL_FEATURE) {
            ShellMode::Structured
        } else {
            ShellMode::Legacy
        }
    }
}

/// Build `<base> shell <user_cmd...>`, plus the exit-code probe in legacy mode.
pub fn build_shell_command<S: AsRef<str>>(
    base: &[String],
    user_cmd: &[S],
    mode: ShellMode,
) -> Vec<String> {
    let mut command = Vec::with_capacity(base.len() + user_cmd.len() + 2);
    command.extend_from_slice(base);
    command.push("shell".to_string());
    command.extend(user_cmd.iter().map(|s| s.as_ref().to_string()));
    if mode == ShellMode::Legacy {
        command.push(RETURN_CODE_PROBE.to_string());
    }
    command
}

/// Split legacy shell output into `(exit_code, stdout)`.
///
/// Only the last [`RETURN_CODE_SEARCH_LENGTH`] bytes are searched for the
/// rightmost delimiter. Everything from the delimiter on is cut from the
/// returned stdout.
pub fn parse_legacy_output(mut out: Vec<u8>) -> Result<(i32, Vec<u8>)> {
    let start = out.len().saturating_sub(RETURN_CODE_SEARCH_LENGTH);
    let window = &out[start..];
    let pos = window
        .iter()
        .rposition(|&b| b == RETURN_CODE_DELIMITER)
        .ok_or_else(|| {
            DroidError::Protocol("could not find exit status in shell output".into())
        })?;

    let code_bytes = &window[pos + 1..];
    let exit_code = std::str::from_utf8(code_bytes)
        .ok()
        .and_then(|s| s.trim().parse::<i32>().ok())
        .ok_or_else(|| {
            DroidError::Protocol(format!(
                "invalid exit status {:?} in shell output",
                String::from_utf8_lossy(code_bytes)
            ))
        })?;

    out.truncate(start + pos);
    Ok((exit_code, out))
}
