//! Process invocation boundary.
//!
//! Everything above this module assumes a clean
//! `(argument list) -> (exit code, stdout, stderr)` contract. Platform
//! details (process groups, exit-by-signal, argument encoding) stay here.

use std::io;
use std::process::{Child, Command, ExitStatus, Stdio};

use droidctl_core::{DroidError, Result};
use tracing::debug;

/// Captured result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code; a process killed by a signal reports the negated signal number.
    pub exit_code: i32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ProcessOutput {
    /// A successful run that printed `stdout`.
    pub fn ok(stdout: impl Into<Vec<u8>>) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.into(),
            stderr: Vec::new(),
        }
    }

    pub fn exited(
        exit_code: i32,
        stdout: impl Into<Vec<u8>>,
        stderr: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            exit_code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Return stdout, or a transport error carrying `argv` if the process failed.
    pub fn check(self, argv: &[String]) -> Result<Vec<u8>> {
        if self.success() {
            return Ok(self.stdout);
        }
        Err(DroidError::Transport {
            command: argv.to_vec(),
            exit_code: self.exit_code,
            stderr: String::from_utf8_lossy(&self.stderr).trim().to_string(),
        })
    }
}

/// Where a spawned process's standard stream goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StdioMode {
    Inherit,
    Piped,
    Null,
}

impl StdioMode {
    fn stdio(self) -> Stdio {
        match self {
            StdioMode::Inherit => Stdio::inherit(),
            StdioMode::Piped => Stdio::piped(),
            StdioMode::Null => Stdio::null(),
        }
    }
}

/// Options for long-lived processes started with `shell_popen`.
#[derive(Debug, Clone)]
pub struct PopenOptions {
    /// Register the process with [`crate::cleanup`] so it is killed at exit.
    pub kill_at_exit: bool,
    /// Start the process in its own process group so a Ctrl-C delivered to
    /// the host does not reach it.
    pub new_process_group: bool,
    pub stdin: StdioMode,
    pub stdout: StdioMode,
    pub stderr: StdioMode,
}

impl Default for PopenOptions {
    fn default() -> Self {
        Self {
            kill_at_exit: true,
            new_process_group: true,
            stdin: StdioMode::Inherit,
            stdout: StdioMode::Inherit,
            stderr: StdioMode::Inherit,
        }
    }
}

impl PopenOptions {
    pub fn kill_at_exit(mut self, yes: bool) -> Self {
        self.kill_at_exit = yes;
        self
    }

    pub fn new_process_group(mut self, yes: bool) -> Self {
        self.new_process_group = yes;
        self
    }

    pub fn stdin(mut self, mode: StdioMode) -> Self {
        self.stdin = mode;
        self
    }

    pub fn stdout(mut self, mode: StdioMode) -> Self {
        self.stdout = mode;
        self
    }

    pub fn stderr(mut self, mode: StdioMode) -> Self {
        self.stderr = mode;
        self
    }

    /// All three streams piped back to the caller.
    pub fn piped() -> Self {
        Self::default()
            .stdin(StdioMode::Piped)
            .stdout(StdioMode::Piped)
            .stderr(StdioMode::Piped)
    }
}

/// Runs bridge command lines. `argv[0]` is the program.
pub trait CommandRunner: Send + Sync {
    /// Run to completion and capture both streams. A nonzero exit is not an
    /// error here; only failing to start or read from the process is.
    fn run(&self, argv: &[String]) -> Result<ProcessOutput>;

    /// Start a process and return it without waiting.
    fn spawn(&self, argv: &[String], options: &PopenOptions) -> Result<Child>;
}

/// [`CommandRunner`] backed by `std::process::Command`.
///
/// Arguments are handed to the OS as-is; on Windows the standard library
/// passes them as UTF-16, so non-ASCII arguments need no special casing.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }
}

fn split_program(argv: &[String]) -> Result<(&String, &[String])> {
    argv.split_first().ok_or_else(|| {
        DroidError::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            "empty command line",
        ))
    })
}

impl CommandRunner for SystemRunner {
    fn run(&self, argv: &[String]) -> Result<ProcessOutput> {
        let (program, args) = split_program(argv)?;
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()?;
        let exit_code = exit_code_of(output.status);
        debug!(
            program = %program,
            exit_code,
            stdout_bytes = output.stdout.len(),
            stderr_bytes = output.stderr.len(),
            "process finished"
        );
        Ok(ProcessOutput {
            exit_code,
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }

    fn spawn(&self, argv: &[String], options: &PopenOptions) -> Result<Child> {
        let (program, args) = split_program(argv)?;
        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(options.stdin.stdio())
            .stdout(options.stdout.stdio())
            .stderr(options.stderr.stdio());
        if options.new_process_group {
            detach_process_group(&mut cmd);
        }
        let child = cmd.spawn()?;
        debug!(program = %program, pid = child.id(), "process spawned");
        Ok(child)
    }
}

#[cfg(unix)]
fn detach_process_group(cmd: &mut Command) {
    use std::os::unix::process::CommandExt;
    cmd.process_group(0);
}

#[cfg(windows)]
fn detach_process_group(cmd: &mut Command) {
    use std::os::windows::process::CommandExt;
    const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
    cmd.creation_flags(CREATE_NEW_PROCESS_GROUP);
}

#[cfg(not(any(unix, windows)))]
fn detach_process_group(_cmd: &mut Command) {}

/// Map an exit status to a single integer code.
pub(crate) fn exit_code_of(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return -signal;
        }
    }
    -1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_check_success_returns_stdout() {
        let out = ProcessOutput::ok("hello\n");
        assert_eq!(out.check(&argv(&["adb", "devices"])).unwrap(), b"hello\n");
    }

    #[test]
    fn test_check_failure_is_transport_error() {
        let out = ProcessOutput::exited(1, "", "error: device offline\n");
        let err = out.check(&argv(&["adb", "reboot"])).unwrap_err();
        match err {
            DroidError::Transport {
                command,
                exit_code,
                stderr,
            } => {
                assert_eq!(command, ["adb", "reboot"]);
                assert_eq!(exit_code, 1);
                assert_eq!(stderr, "error: device offline");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_empty_argv_is_rejected() {
        let result = SystemRunner::new().run(&[]);
        assert!(matches!(result, Err(DroidError::Io(_))));
    }

    #[test]
    fn test_popen_options_builder() {
        let opts = PopenOptions::piped().kill_at_exit(false);
        assert!(!opts.kill_at_exit);
        assert!(opts.new_process_group);
        assert_eq!(opts.stdout, StdioMode::Piped);
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_captures_streams_and_code() {
        let out = SystemRunner::new()
            .run(&argv(&["sh", "-c", "printf out; printf err >&2; exit 3"]))
            .unwrap();
        assert_eq!(out.exit_code, 3);
        assert_eq!(out.stdout, b"out");
        assert_eq!(out.stderr, b"err");
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_reports_signal_as_negative() {
        let out = SystemRunner::new()
            .run(&argv(&["sh", "-c", "kill -9 $$"]))
            .unwrap();
        assert_eq!(out.exit_code, -9);
    }

    #[test]
    fn test_system_runner_missing_binary_is_io_error() {
        let result = SystemRunner::new().run(&argv(&["droidctl-no-such-binary-7f3a"]));
        assert!(matches!(result, Err(DroidError::Io(_))));
    }
}
