//! Executable invocation boundary.
//!
//! Every provider operation is expressed as an [`Invocation`] (executable plus
//! argv) and handed to a [`CommandRunner`] together with a working directory.
//! The runner executes synchronously and reports exit status and captured
//! output. [`ShellRunner`] is the real implementation; tests script a
//! `RecordingRunner` instead.

use std::fmt;
use std::path::Path;
use std::process::Stdio;

use serde::{Deserialize, Serialize};

use crate::error::{MuxError, Result};


/// One call to the multiplexer binary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Invocation {
    pub executable: String,
    pub args: Vec<String>,
}


impl Invocation {
    pub fn new<I, S>(executable: &str, args: I) -> Invocation
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Invocation {
            executable: executable.to_string(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// First argument, i.e. the tmux subcommand.
    pub fn subcommand(&self) -> Option<&str> {
        self.args.first().map(|s| s.as_str())
    }
}


impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.executable)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}


/// Exit status and captured output of one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExecutionResult {
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}


impl ExecutionResult {
    #[cfg(test)]
    pub fn ok(stdout: &str) -> ExecutionResult {
        ExecutionResult {
            status: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    #[cfg(test)]
    pub fn failed(status: i32, stderr: &str) -> ExecutionResult {
        ExecutionResult {
            status,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.status == 0
    }

    /// stderr if present, stdout otherwise, trimmed.
    pub fn diagnostic(&self) -> &str {
        let err = self.stderr.trim();
        if err.is_empty() {
            self.stdout.trim()
        } else {
            err
        }
    }

    /// Turn a non-zero status into an error, classifying duplicate sessions
    /// by `duplicate_marker` at the start of stderr.
    pub fn check(
        self,
        invocation: &Invocation,
        session: &str,
        duplicate_marker: Option<&str>,
    ) -> Result<ExecutionResult> {
        if self.success() {
            return Ok(self);
        }
        if let Some(marker) = duplicate_marker {
            if self.stderr.trim_start().starts_with(marker) {
                return Err(MuxError::DuplicateSession {
                    session: session.to_string(),
                    stderr: self.stderr.trim().to_string(),
                });
            }
        }
        Err(MuxError::ToolExecution {
            command: invocation.to_string(),
            status: self.status,
            stderr: self.diagnostic().to_string(),
        })
    }
}


pub trait CommandRunner {
    /// Run to completion with stdout/stderr captured.
    fn run(&self, invocation: &Invocation, cwd: &Path) -> Result<ExecutionResult>;

    /// Run attached to the current terminal and return the exit status.
    fn run_interactive(&self, invocation: &Invocation, cwd: &Path) -> Result<i32>;
}


/// Runs invocations as child processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShellRunner;


impl CommandRunner for ShellRunner {
    fn run(&self, invocation: &Invocation, cwd: &Path) -> Result<ExecutionResult> {
        log::info!("running {}", invocation);
        let output = std::process::Command::new(&invocation.executable)
            .args(&invocation.args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .output()?;
        let result = ExecutionResult {
            status: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        if !result.success() {
            log::debug!("{} exited {}: {}", invocation, result.status, result.diagnostic());
        }
        Ok(result)
    }

    fn run_interactive(&self, invocation: &Invocation, cwd: &Path) -> Result<i32> {
        log::info!("attaching: {}", invocation);
        let status = std::process::Command::new(&invocation.executable)
            .args(&invocation.args)
            .current_dir(cwd)
            .status()?;
        Ok(status.code().unwrap_or(-1))
    }
}




#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invocation_display_joins_args() {
        let inv = Invocation::new("tmux", ["has-session", "-t", "mux-demo"]);
        assert_eq!(inv.to_string(), "tmux has-session -t mux-demo");
        assert_eq!(inv.subcommand(), Some("has-session"));
    }

    #[test]
    fn check_passes_success_through() {
        let inv = Invocation::new("tmux", ["new-session"]);
        let result = ExecutionResult::ok("").check(&inv, "mux-demo", Some("duplicate session:"));
        assert!(result.is_ok());
    }

    #[test]
    fn check_classifies_duplicate_marker() {
        let inv = Invocation::new("tmux", ["new-session"]);
        let err = ExecutionResult::failed(1, "duplicate session: mux-demo\n")
            .check(&inv, "mux-demo", Some("duplicate session:"))
            .unwrap_err();
        match err {
            MuxError::DuplicateSession { session, stderr } => {
                assert_eq!(session, "mux-demo");
                assert_eq!(stderr, "duplicate session: mux-demo");
            }
            other => panic!("expected DuplicateSession, got {:?}", other),
        }
    }

    #[test]
    fn check_reports_other_failures_with_stderr() {
        let inv = Invocation::new("tmux", ["split-window", "-h", "htop"]);
        let err = ExecutionResult::failed(1, "no space for new pane")
            .check(&inv, "mux-demo", Some("duplicate session:"))
            .unwrap_err();
        match err {
            MuxError::ToolExecution { command, status, stderr } => {
                assert_eq!(command, "tmux split-window -h htop");
                assert_eq!(status, 1);
                assert_eq!(stderr, "no space for new pane");
            }
            other => panic!("expected ToolExecution, got {:?}", other),
        }
    }

    #[test]
    fn diagnostic_falls_back_to_stdout() {
        let result = ExecutionResult {
            status: 2,
            stdout: "  usage: screen\n".into(),
            stderr: String::new(),
        };
        assert_eq!(result.diagnostic(), "usage: screen");
    }

    #[test]
    fn shell_runner_captures_exit_status() {
        let runner = ShellRunner;
        let cwd = std::env::temp_dir();
        let ok = runner.run(&Invocation::new("sh", ["-c", "echo hi"]), &cwd).unwrap();
        assert!(ok.success());
        assert_eq!(ok.stdout.trim(), "hi");
        let failed = runner.run(&Invocation::new("sh", ["-c", "echo oops >&2; exit 3"]), &cwd).unwrap();
        assert_eq!(failed.status, 3);
        assert_eq!(failed.diagnostic(), "oops");
    }

    #[test]
    fn recording_runner_pops_queued_responses() {
        use recording::RecordingRunner;
        let runner = RecordingRunner::new();
        runner.respond("has-session", ExecutionResult::failed(1, "no session"));
        runner.respond("has-session", ExecutionResult::ok(""));
        let inv = Invocation::new("tmux", ["has-session"]);
        let cwd = Path::new("/");
        assert_eq!(runner.run(&inv, cwd).unwrap().status, 1);
        assert_eq!(runner.run(&inv, cwd).unwrap().status, 0);
        assert_eq!(runner.run(&inv, cwd).unwrap().status, 0);
        assert_eq!(runner.calls().len(), 3);
    }
}
