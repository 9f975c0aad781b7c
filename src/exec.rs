//! Subprocess execution: runs external executables (`kubectl`, the migration
//! engine) with structured args, never through a shell.
//!
//! `CommandRunner` is the capability seam: `ProcessRunner` spawns real
//! processes via `tokio::process::Command`, tests substitute a recording fake.

use std::collections::HashMap;
use std::future::Future;
use std::process::Stdio;
use std::time::Instant;

/// Outcome of a single subprocess invocation.
///
/// Both streams are captured even when the process fails. A process that
/// could not be spawned at all is reported as an unsuccessful result with the
/// spawn error in `stderr`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    stdout: String,
    stderr: String,
    exit_code: Option<i32>,
}

impl CommandResult {
    pub fn new(stdout: impl Into<String>, stderr: impl Into<String>, exit_code: Option<i32>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
            exit_code,
        }
    }

    /// Result for a process that never started.
    pub fn spawn_failure(program: &str, err: &std::io::Error) -> Self {
        Self::new("", format!("failed to spawn '{}': {}", program, err), None)
    }

    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    pub fn stderr(&self) -> &str {
        &self.stderr
    }

    /// Consume the result, keeping only stderr.
    pub fn into_stderr(self) -> String {
        self.stderr
    }

    /// True iff the process exited with status zero.
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Exit code, `None` if the process was not spawned or was killed by a signal.
    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }
}

/// Executes a program with arguments and reports the outcome.
pub trait CommandRunner: Send + Sync {
    /// Run to completion, capturing stdout and stderr.
    fn run(&self, program: &str, args: &[String]) -> impl Future<Output = CommandResult> + Send;

    /// Run to completion with the streams inherited from this process.
    ///
    /// The returned result carries empty `stdout`/`stderr`.
    fn run_inherited(
        &self,
        program: &str,
        args: &[String],
    ) -> impl Future<Output = CommandResult> + Send;
}

/// Runs real child processes.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    env: HashMap<String, String>,
}

impl ProcessRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extra environment variables set on every spawned process.
    pub fn with_env(env: HashMap<String, String>) -> Self {
        Self { env }
    }

    fn command(&self, program: &str, args: &[String]) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(program);
        cmd.args(args);
        for (k, v) in &self.env {
            cmd.env(k, v);
        }
        cmd
    }
}

impl CommandRunner for ProcessRunner {
    async fn run(&self, program: &str, args: &[String]) -> CommandResult {
        let start = Instant::now();
        let mut cmd = self.command(program, args);
        cmd.stdin(Stdio::null());

        let output = match cmd.output().await {
            Ok(output) => output,
            Err(e) => {
                tracing::debug!(command = %program, error = %e, "failed to spawn");
                return CommandResult::spawn_failure(program, &e);
            }
        };

        let result = CommandResult::new(
            String::from_utf8_lossy(&output.stdout).into_owned(),
            String::from_utf8_lossy(&output.stderr).into_owned(),
            output.status.code(),
        );

        tracing::debug!(
            command = %program,
            args = ?args,
            exit_code = ?result.exit_code(),
            duration_ms = %start.elapsed().as_millis(),
            "subprocess finished"
        );

        result
    }

    async fn run_inherited(&self, program: &str, args: &[String]) -> CommandResult {
        let mut cmd = self.command(program, args);
        match cmd.status().await {
            Ok(status) => CommandResult::new("", "", status.code()),
            Err(e) => CommandResult::spawn_failure(program, &e),
        }
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use super::*;

    /// Records every invocation and replays scripted results (success by default).
    #[derive(Debug, Default)]
    pub struct FakeRunner {
        calls: Mutex<Vec<(String, Vec<String>)>>,
        responses: Mutex<VecDeque<CommandResult>>,
    }

    impl FakeRunner {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn push(&self, result: CommandResult) {
            self.responses.lock().unwrap().push_back(result);
        }

        pub fn push_failure(&self, stderr: &str) {
            self.push(CommandResult::new("", stderr, Some(1)));
        }

        pub fn calls(&self) -> Vec<(String, Vec<String>)> {
            self.calls.lock().unwrap().clone()
        }

        fn next(&self, program: &str, args: &[String]) -> CommandResult {
            self.calls
                .lock()
                .unwrap()
                .push((program.to_string(), args.to_vec()));
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| CommandResult::new("", "", Some(0)))
        }
    }

    impl CommandRunner for FakeRunner {
        async fn run(&self, program: &str, args: &[String]) -> CommandResult {
            self.next(program, args)
        }

        async fn run_inherited(&self, program: &str, args: &[String]) -> CommandResult {
            self.next(program, args)
        }
    }

    /// Clonable handle to one [`FakeRunner`], for code that clones its runner.
    #[derive(Debug, Clone, Default)]
    pub struct SharedRunner(pub Arc<FakeRunner>);

    impl CommandRunner for SharedRunner {
        async fn run(&self, program: &str, args: &[String]) -> CommandResult {
            self.0.next(program, args)
        }

        async fn run_inherited(&self, program: &str, args: &[String]) -> CommandResult {
            self.0.next(program, args)
        }
    }
}
