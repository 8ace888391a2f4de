//! Scripted command runner for deterministic testing.
//!
//! Replays canned process output without spawning anything.

use parking_lot::Mutex;
use std::io;
use std::process::Child;

use droidctl_core::{DroidError, Result};

use crate::process::{CommandRunner, PopenOptions, ProcessOutput};

struct Rule {
    pattern: Vec<String>,
    reply: std::result::Result<ProcessOutput, io::ErrorKind>,
    repeat: bool,
}

impl Rule {
    fn matches(&self, argv: &[String]) -> bool {
        self.pattern.is_empty()
            || argv
                .windows(self.pattern.len())
                .any(|w| w == self.pattern.as_slice())
    }
}

/// A [`CommandRunner`] that answers from a script.
///
/// Each rule matches when its pattern occurs as a contiguous run inside the
/// command line. The first matching rule wins; one-shot rules are consumed.
///
/// # Example
/// ```
/// use droidctl_device::mock::ScriptedRunner;
/// use droidctl_device::ProcessOutput;
/// let runner = ScriptedRunner::new()
///     .always(&["features"], ProcessOutput::ok("shell_v2\n"))
///     .on(&["shell", "id"], ProcessOutput::ok("uid=0(root)\n"));
/// ```
#[derive(Default)]
pub struct ScriptedRunner {
    rules: Mutex<Vec<Rule>>,
    calls: Mutex<Vec<Vec<String>>>,
}

fn to_pattern(pattern: &[&str]) -> Vec<String> {
    pattern.iter().map(|s| s.to_string()).collect()
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer the next matching command once.
    pub fn on(self, pattern: &[&str], output: ProcessOutput) -> Self {
        self.push(pattern, Ok(output), false)
    }

    /// Answer every matching command.
    pub fn always(self, pattern: &[&str], output: ProcessOutput) -> Self {
        self.push(pattern, Ok(output), true)
    }

    /// Fail the next matching command as if the process could not start.
    pub fn on_spawn_error(self, pattern: &[&str], kind: io::ErrorKind) -> Self {
        self.push(pattern, Err(kind), false)
    }

    fn push(
        self,
        pattern: &[&str],
        reply: std::result::Result<ProcessOutput, io::ErrorKind>,
        repeat: bool,
    ) -> Self {
        self.rules.lock().push(Rule {
            pattern: to_pattern(pattern),
            reply,
            repeat,
        });
        self
    }

    /// Every command line seen so far, in order (including spawns).
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().clone()
    }

    /// How many recorded command lines contain `pattern`.
    pub fn count(&self, pattern: &[&str]) -> usize {
        let rule = Rule {
            pattern: to_pattern(pattern),
            reply: Err(io::ErrorKind::Other),
            repeat: false,
        };
        self.calls.lock().iter().filter(|argv| rule.matches(argv)).count()
    }

    fn answer(&self, argv: &[String]) -> Result<ProcessOutput> {
        self.calls.lock().push(argv.to_vec());
        let mut rules = self.rules.lock();
        let Some(idx) = rules.iter().position(|r| r.matches(argv)) else {
            return Err(DroidError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no scripted reply for `{}`", argv.join(" ")),
            )));
        };
        let reply = if rules[idx].repeat {
            rules[idx].reply.clone()
        } else {
            rules.remove(idx).reply
        };
        reply.map_err(|kind| DroidError::Io(io::Error::new(kind, "scripted spawn failure")))
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, argv: &[String]) -> Result<ProcessOutput> {
        self.answer(argv)
    }

    /// Records the command line; scripted runners cannot hand out live processes.
    fn spawn(&self, argv: &[String], _options: &PopenOptions) -> Result<Child> {
        self.calls.lock().push(argv.to_vec());
        Err(DroidError::Io(io::Error::new(
            io::ErrorKind::Unsupported,
            "scripted runner cannot spawn processes",
        )))
    }
}
