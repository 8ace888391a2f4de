//! Live `adb shell` processes started by `shell_popen`.

use std::process::{Child, ChildStderr, ChildStdin, ChildStdout};

use droidctl_core::Result;
use tracing::info;

use crate::cleanup::{self, CleanupToken};
use crate::process::{CommandRunner, PopenOptions, ProcessOutput, exit_code_of};

/// A live `adb shell` process started by `shell_popen`.
///
/// No exit-code recovery is done; the caller reads the streams and decides
/// what the result means. The caller must finish the session with [`wait`],
/// [`wait_with_output`] or [`kill`]. Dropping it leaves the process running
/// (and still registered for exit cleanup, if it was registered).
///
/// [`wait`]: ShellSession::wait
/// [`wait_with_output`]: ShellSession::wait_with_output
/// [`kill`]: ShellSession::kill
#[derive(Debug)]
pub struct ShellSession {
    child: Child,
    command: Vec<String>,
    cleanup: Option<CleanupToken>,
}

impl ShellSession {
    /// Spawn `command` through `runner`.
    pub fn start(
        runner: &dyn CommandRunner,
        command: Vec<String>,
        options: &PopenOptions,
    ) -> Result<Self> {
        info!(command = %command.join(" "), "starting shell session");
        let child = runner.spawn(&command, options)?;
        let cleanup = options
            .kill_at_exit
            .then(|| cleanup::register(child.id(), &command.join(" ")));
        Ok(Self {
            child,
            command,
            cleanup,
        })
    }

    pub fn id(&self) -> u32 {
        self.child.id()
    }

    /// The full bridge command line.
    pub fn command(&self) -> &[String] {
        &self.command
    }

    pub fn is_registered(&self) -> bool {
        self.cleanup.as_ref().is_some_and(cleanup::is_registered)
    }

    pub fn take_stdin(&mut self) -> Option<ChildStdin> {
        self.child.stdin.take()
    }

    pub fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.child.stdout.take()
    }

    pub fn take_stderr(&mut self) -> Option<ChildStderr> {
        self.child.stderr.take()
    }

    /// Exit code if the process has already finished.
    pub fn try_wait(&mut self) -> Result<Option<i32>> {
        let status = self.child.try_wait()?;
        if status.is_some() {
            self.release();
        }
        Ok(status.map(exit_code_of))
    }

    /// Block until the process exits and return the bridge's exit code.
    pub fn wait(mut self) -> Result<i32> {
        let status = self.child.wait()?;
        self.release();
        Ok(exit_code_of(status))
    }

    /// Block until exit, collecting whatever piped output has not been taken.
    pub fn wait_with_output(mut self) -> Result<ProcessOutput> {
        let token = self.cleanup.take();
        let output = self.child.wait_with_output()?;
        if let Some(token) = token {
            cleanup::unregister(token);
        }
        Ok(ProcessOutput {
            exit_code: exit_code_of(output.status),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }

    /// Kill the process and reap it.
    pub fn kill(mut self) -> Result<i32> {
        // Already-exited processes make kill() fail; wait() still reaps them.
        let _ = self.child.kill();
        self.wait()
    }

    /// Give up ownership of the child. It is no longer killed at exit.
    pub fn into_child(mut self) -> Child {
        self.release();
        self.child
    }

    fn release(&mut self) {
        if let Some(token) = self.cleanup.take() {
            cleanup::unregister(token);
        }
    }
}
