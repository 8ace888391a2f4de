//! Process-wide registry of long-lived bridge processes.
//!
//! `shell_popen` sessions started with `kill_at_exit` are registered here.
//! The host owns teardown: call [`kill_all`] on shutdown, or hold the guard
//! returned by [`install`] for the lifetime of `main`.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::LazyLock;
use std::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
struct TrackedProcess {
    pid: u32,
    command: String,
    started_at: Instant,
}

struct CleanupRegistry {
    processes: HashMap<u64, TrackedProcess>,
    next_id: u64,
}

impl CleanupRegistry {
    fn new() -> Self {
        Self {
            processes: HashMap::new(),
            next_id: 1,
        }
    }
}

static CLEANUP_REGISTRY: LazyLock<Mutex<CleanupRegistry>> =
    LazyLock::new(|| Mutex::new(CleanupRegistry::new()));

/// Proof of registration. Dropping it does not unregister; pass it to
/// [`unregister`] once the process has been reaped.
#[derive(Debug)]
pub struct CleanupToken(u64);

/// Track `pid` for termination at exit.
pub fn register(pid: u32, command: &str) -> CleanupToken {
    let mut registry = CLEANUP_REGISTRY.lock();
    let id = registry.next_id;
    registry.next_id += 1;
    registry.processes.insert(
        id,
        TrackedProcess {
            pid,
            command: command.to_string(),
            started_at: Instant::now(),
        },
    );
    debug!(pid, id, "registered process for exit cleanup");
    CleanupToken(id)
}

/// Stop tracking a process. Returns false if it was already removed by
/// [`kill_all`].
pub fn unregister(token: CleanupToken) -> bool {
    CLEANUP_REGISTRY.lock().processes.remove(&token.0).is_some()
}

/// Whether the process behind `token` is still tracked.
pub fn is_registered(token: &CleanupToken) -> bool {
    CLEANUP_REGISTRY.lock().processes.contains_key(&token.0)
}

/// Kill every tracked process and empty the registry. Returns how many
/// processes were signalled successfully.
pub fn kill_all() -> usize {
    let drained: Vec<TrackedProcess> = {
        let mut registry = CLEANUP_REGISTRY.lock();
        registry.processes.drain().map(|(_, p)| p).collect()
    };

    let mut killed = 0;
    for process in drained {
        if kill_pid(process.pid) {
            killed += 1;
            info!(
                pid = process.pid,
                command = %process.command,
                uptime_secs = process.started_at.elapsed().as_secs(),
                "killed bridge process on shutdown"
            );
        } else {
            warn!(pid = process.pid, "failed to kill bridge process on shutdown");
        }
    }
    killed
}

/// Scope guard that runs [`kill_all`] when dropped.
#[derive(Debug)]
#[must_use = "the registry is torn down when the guard is dropped"]
pub struct CleanupGuard {
    _private: (),
}

/// Install exit cleanup for the current scope.
pub fn install() -> CleanupGuard {
    CleanupGuard { _private: () }
}

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        kill_all();
    }
}

#[cfg(unix)]
fn kill_pid(pid: u32) -> bool {
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return false;
    };
    unsafe { libc::kill(pid, libc::SIGKILL) == 0 }
}

#[cfg(windows)]
fn kill_pid(pid: u32) -> bool {
    std::process::Command::new("taskkill")
        .args(["/F", "/PID", &pid.to_string()])
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(not(any(unix, windows)))]
fn kill_pid(_pid: u32) -> bool {
    false
}
