//! Multiplexer providers — the capability set every backend exposes.
//!
//! The layout builder, the session controller, and navigation only talk to
//! [`MuxProvider`]. Concrete backends hold read-only configuration
//! ([`ProviderContext`]) plus whatever they have queued, and run everything
//! through an injected [`CommandRunner`].

pub mod screen;
pub mod tmux;

use std::fmt;
use std::path::PathBuf;
use std::rc::Rc;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{MuxError, Result};
use crate::runner::{CommandRunner, ExecutionResult, Invocation};
use crate::session::state::CommandBatch;
use crate::types::config::MuxSettings;
use crate::types::direction::{PaneDirection, WindowDirection};

pub use screen::ScreenProvider;
pub use tmux::TmuxProvider;


pub trait MuxProvider {
    /// Short backend name used in logs and errors.
    fn name(&self) -> &'static str;

    fn session_name(&self) -> &str;

    /// Whether the session exists. "Not found" is `Ok(false)`.
    fn session_exists(&self) -> Result<bool>;

    /// Queue creation of a detached session whose first window is
    /// `window_title` running `starting_command`.
    fn create_session(&mut self, window_title: &str, starting_command: &str);

    /// Queue a new window in the session.
    fn create_window(&mut self, window_title: &str, starting_command: &str);

    /// Queue a split of the focused pane. The new pane takes focus.
    fn create_pane(&mut self, starting_command: &str, is_horizontal: bool);

    fn move_to_pane(&self, direction: PaneDirection) -> Result<ExecutionResult>;

    fn move_to_window(&self, direction: WindowDirection) -> Result<ExecutionResult>;

    /// Apply everything queued, in order. Each successful invocation is
    /// appended to `batch`; the first failure stops the pass and the rest of
    /// the queue is dropped.
    fn build(&mut self, batch: &mut CommandBatch) -> Result<()>;

    /// Re-run previously recorded invocations against the live session.
    fn replay(&mut self, commands: &[Invocation]) -> Result<()>;

    /// Open a terminal connected to the session. Best effort.
    fn attach(&self) -> Result<()>;

    /// Whether the configured executable is the tool this provider drives.
    fn verify_executable(&self) -> Result<bool>;

    fn kill_session(&self) -> Result<()>;

    /// Kill any session by name, used for bulk cleanup.
    fn kill_named_session(&self, name: &str) -> Result<()>;

    fn list_sessions(&self) -> Result<Vec<SessionSummary>>;

    /// Whether a recorded invocation is the one that created the session.
    fn is_session_creation(&self, invocation: &Invocation) -> bool;
}


/// A running session as reported by the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionSummary {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub windows: Option<u32>,
}


/// Read-only configuration shared by all providers.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderContext {
    pub executable: String,
    pub session: String,
    pub cwd: PathBuf,
    pub shell: String,
    /// Directory for provider scratch files (screen rc files).
    pub scratch_dir: PathBuf,
    /// Running inside a multiplexer client already.
    pub nested: bool,
}


impl ProviderContext {
    pub fn from_settings(settings: &MuxSettings, scratch_dir: PathBuf) -> ProviderContext {
        let cwd = if settings.project_root.is_empty() {
            std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/"))
        } else {
            PathBuf::from(&settings.project_root)
        };
        ProviderContext {
            executable: settings.executable(),
            session: settings.session_name(),
            cwd,
            shell: settings.shell(),
            scratch_dir,
            nested: std::env::var_os("TMUX").is_some(),
        }
    }

    pub fn invocation<I, S>(&self, args: I) -> Invocation
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Invocation::new(&self.executable, args)
    }
}


#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Tmux,
    Screen,
}


impl FromStr for ProviderKind {
    type Err = MuxError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tmux" => Ok(ProviderKind::Tmux),
            "screen" => Ok(ProviderKind::Screen),
            other => Err(MuxError::config(format!(
                "unknown provider '{}' (expected tmux or screen)",
                other
            ))),
        }
    }
}


impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::Tmux => f.write_str("tmux"),
            ProviderKind::Screen => f.write_str("screen"),
        }
    }
}


/// Construct and verify the provider named by `kind`.
pub fn create_provider(
    kind: ProviderKind,
    context: ProviderContext,
    runner: Rc<dyn CommandRunner>,
) -> Result<Box<dyn MuxProvider>> {
    log::debug!("creating {} provider for session {}", kind, context.session);
    match kind {
        ProviderKind::Tmux => Ok(Box::new(TmuxProvider::new(context, runner)?)),
        ProviderKind::Screen => Ok(Box::new(ScreenProvider::new(context, runner)?)),
    }
}


/// Kill every running session whose name starts with `prefix`. Returns the
/// names that were killed; a failed kill is logged and skipped.
pub fn kill_sessions_with_prefix(provider: &dyn MuxProvider, prefix: &str) -> Result<Vec<String>> {
    let mut killed = Vec::new();
    for session in provider.list_sessions()? {
        if !session.name.starts_with(prefix) {
            continue;
        }
        match provider.kill_named_session(&session.name) {
            Ok(()) => killed.push(session.name),
            Err(err) => log::warn!("could not kill {}: {}", session.name, err),
        }
    }
    Ok(killed)
}


/// Run invocations in order, stopping at the first failure.
/// `on_success` sees each invocation that exited cleanly.
pub(crate) fn run_in_order(
    runner: &dyn CommandRunner,
    context: &ProviderContext,
    invocations: Vec<Invocation>,
    duplicate_marker: Option<&str>,
    mut on_success: impl FnMut(Invocation),
) -> Result<()> {
    let total = invocations.len();
    for (i, invocation) in invocations.into_iter().enumerate() {
        let result = runner.run(&invocation, &context.cwd)?;
        match result.check(&invocation, &context.session, duplicate_marker) {
            Ok(_) => on_success(invocation),
            Err(err) => {
                log::error!("{}", err);
                if i + 1 < total {
                    log::warn!("skipping {} remaining queued command(s)", total - i - 1);
                }
                return Err(err);
            }
        }
    }
    Ok(())
}


/// Map a failure to spawn the version probe to a configuration error.
pub(crate) fn probe_version(
    runner: &dyn CommandRunner,
    context: &ProviderContext,
    flag: &str,
) -> Result<ExecutionResult> {
    runner
        .run(&context.invocation([flag]), &context.cwd)
        .map_err(|e| match e {
            MuxError::Io(io) => MuxError::config(format!(
                "cannot run executable '{}': {}",
                context.executable, io
            )),
            other => other,
        })
}
