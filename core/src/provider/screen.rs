//! GNU screen backend.
//!
//! screen has no batch command mode worth driving, so create calls collect
//! lines for an rc file instead. `build()` writes the file and starts a
//! detached session that reads it. Navigation and replay are not supported.

use std::path::PathBuf;
use std::rc::Rc;

use crate::error::{MuxError, Result};
use crate::runner::{CommandRunner, ExecutionResult, Invocation};
use crate::session::state::CommandBatch;
use crate::types::direction::{PaneDirection, WindowDirection};

use super::{probe_version, run_in_order, MuxProvider, ProviderContext, SessionSummary};


const HARDSTATUS: &str = "hardstatus string '%{= kG}[ %{G}%H %{g}][%= %{= kw}%?%-Lw%?%{r}(%{W}%n*%f%t%?(%u)%?%{r})%{w}%?%+Lw%?%?%= %{g}][%{B} %m-%d %{W}%c %{g}]'";


pub struct ScreenProvider {
    context: ProviderContext,
    runner: Rc<dyn CommandRunner>,
    rc_lines: Vec<String>,
}


impl ScreenProvider {
    /// Fails with a configuration error unless the executable reports itself as screen.
    pub fn new(context: ProviderContext, runner: Rc<dyn CommandRunner>) -> Result<ScreenProvider> {
        let provider = ScreenProvider {
            context,
            runner,
            rc_lines: Vec::new(),
        };
        if !provider.verify_executable()? {
            return Err(MuxError::config(format!(
                "'{}' is not GNU screen; set executable_path to a screen binary",
                provider.context.executable
            )));
        }
        Ok(provider)
    }

    pub fn rc_path(&self) -> PathBuf {
        self.context
            .scratch_dir
            .join(format!("{}_screen", self.context.session))
    }

    fn add_line(&mut self, line: String) {
        log::debug!("[screen] rc: {}", line);
        self.rc_lines.push(line);
    }

    fn window_line(&self, title: Option<&str>, command: &str) -> String {
        match title {
            Some(t) => format!(
                "screen -t {} {} -c {}",
                rc_quote(t),
                self.context.shell,
                rc_quote(command)
            ),
            None => format!("screen {} -c {}", self.context.shell, rc_quote(command)),
        }
    }

    fn launch_invocation(&self) -> Invocation {
        let rc = self.rc_path().to_string_lossy().into_owned();
        self.context.invocation([
            "-d",
            "-m",
            "-S",
            self.context.session.as_str(),
            "-c",
            rc.as_str(),
        ])
    }
}


impl MuxProvider for ScreenProvider {
    fn name(&self) -> &'static str {
        "screen"
    }

    fn session_name(&self) -> &str {
        &self.context.session
    }

    fn session_exists(&self) -> Result<bool> {
        // `screen -ls` exits non-zero even when it lists sessions; only the
        // listing matters.
        let result = self.runner.run(&self.context.invocation(["-ls"]), &self.context.cwd)?;
        Ok(parse_screen_list(&result.stdout)
            .iter()
            .any(|s| s.name == self.context.session))
    }

    fn create_session(&mut self, window_title: &str, starting_command: &str) {
        self.add_line(format!("sessionname {}", self.context.session));
        self.add_line("hardstatus alwayslastline".into());
        self.add_line(HARDSTATUS.into());
        let line = self.window_line(Some(window_title), starting_command);
        self.add_line(line);
    }

    fn create_window(&mut self, window_title: &str, starting_command: &str) {
        let line = self.window_line(Some(window_title), starting_command);
        self.add_line(line);
    }

    fn create_pane(&mut self, starting_command: &str, is_horizontal: bool) {
        self.add_line(if is_horizontal { "split".into() } else { "split -v".into() });
        // The new region follows the current one in focus order.
        self.add_line("focus next".into());
        let line = self.window_line(None, starting_command);
        self.add_line(line);
    }

    fn move_to_pane(&self, _direction: PaneDirection) -> Result<ExecutionResult> {
        Err(MuxError::not_supported("screen", "move_to_pane"))
    }

    fn move_to_window(&self, _direction: WindowDirection) -> Result<ExecutionResult> {
        Err(MuxError::not_supported("screen", "move_to_window"))
    }

    fn build(&mut self, batch: &mut CommandBatch) -> Result<()> {
        if self.rc_lines.is_empty() {
            return Ok(());
        }
        let lines = std::mem::take(&mut self.rc_lines);
        // screen allows duplicate session names; refuse the way tmux does.
        if self.session_exists()? {
            log::warn!("[screen] session {} is already running", self.context.session);
            return Err(MuxError::DuplicateSession {
                session: self.context.session.clone(),
                stderr: format!("session {} is already running", self.context.session),
            });
        }
        let path = self.rc_path();
        if !self.context.scratch_dir.exists() {
            log::info!("creating config folder {}", self.context.scratch_dir.display());
            std::fs::create_dir_all(&self.context.scratch_dir)?;
        }
        let mut content = lines.join("\n");
        content.push('\n');
        std::fs::write(&path, content)?;
        log::info!("[screen] wrote {} rc line(s) to {}", lines.len(), path.display());

        let launch = self.launch_invocation();
        run_in_order(
            self.runner.as_ref(),
            &self.context,
            vec![launch],
            None,
            |invocation| batch.push(invocation),
        )
    }

    fn replay(&mut self, commands: &[Invocation]) -> Result<()> {
        if commands.is_empty() {
            return Ok(());
        }
        Err(MuxError::not_supported("screen", "replay"))
    }

    fn attach(&self) -> Result<()> {
        let invocation = self.context.invocation(["-r", self.context.session.as_str()]);
        log::info!("[screen] attaching to session: {}", self.context.session);
        let status = self.runner.run_interactive(&invocation, &self.context.cwd)?;
        if status != 0 {
            log::warn!("[screen] {} exited with status {}", invocation, status);
        }
        Ok(())
    }

    fn verify_executable(&self) -> Result<bool> {
        let result = probe_version(self.runner.as_ref(), &self.context, "-v")?;
        Ok(result.stdout.contains("Screen version") || result.stderr.contains("Screen version"))
    }

    fn kill_session(&self) -> Result<()> {
        let session = self.context.session.clone();
        self.kill_named_session(&session)
    }

    fn kill_named_session(&self, name: &str) -> Result<()> {
        let invocation = self.context.invocation(["-S", name, "-X", "quit"]);
        log::info!("[screen] killing session {}", name);
        self.runner
            .run(&invocation, &self.context.cwd)?
            .check(&invocation, name, None)
            .map(|_| ())
    }

    fn list_sessions(&self) -> Result<Vec<SessionSummary>> {
        let result = self.runner.run(&self.context.invocation(["-ls"]), &self.context.cwd)?;
        Ok(parse_screen_list(&result.stdout))
    }

    fn is_session_creation(&self, invocation: &Invocation) -> bool {
        invocation.args.iter().any(|a| a == "-m")
    }
}


/// Parse `screen -ls` output. Session lines look like
/// `\t12345.name\t(Detached)`.
pub fn parse_screen_list(raw: &str) -> Vec<SessionSummary> {
    raw.lines()
        .filter(|line| line.starts_with('\t') || line.starts_with(' '))
        .filter_map(|line| line.split_whitespace().next())
        .filter_map(|id| id.split_once('.'))
        .filter(|(pid, _)| pid.chars().all(|c| c.is_ascii_digit()))
        .map(|(_, name)| SessionSummary {
            name: name.to_string(),
            windows: None,
        })
        .collect()
}


/// Quote an rc-file argument. Single quotes suppress `$` expansion; values
/// that contain one fall back to escaped double quotes.
fn rc_quote(value: &str) -> String {
    if !value.contains('\'') {
        return format!("'{}'", value);
    }
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{}\"", escaped)
}
