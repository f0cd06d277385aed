//! tmux backend — every create call is one tmux invocation, queued and
//! applied in order by `build()`. Navigation uses tmux's `{token}` targets.

use std::rc::Rc;

use crate::error::{MuxError, Result};
use crate::layout::targeting::{pane_target, window_target};
use crate::runner::{CommandRunner, ExecutionResult, Invocation};
use crate::session::state::CommandBatch;
use crate::types::direction::{PaneDirection, WindowDirection};

use super::{probe_version, run_in_order, MuxProvider, ProviderContext, SessionSummary};


/// Leading stderr text of a refused `new-session`.
pub const DUPLICATE_SESSION_MARKER: &str = "duplicate session:";

const SESSION_LIST_FORMAT: &str = "#{session_name} #{session_windows}";


pub struct TmuxProvider {
    context: ProviderContext,
    runner: Rc<dyn CommandRunner>,
    queue: Vec<Invocation>,
}


impl TmuxProvider {
    /// Fails with a configuration error unless the executable reports itself as tmux.
    pub fn new(context: ProviderContext, runner: Rc<dyn CommandRunner>) -> Result<TmuxProvider> {
        let provider = TmuxProvider {
            context,
            runner,
            queue: Vec::new(),
        };
        if !provider.verify_executable()? {
            return Err(MuxError::config(format!(
                "'{}' is not tmux; set executable_path to a tmux binary",
                provider.context.executable
            )));
        }
        Ok(provider)
    }

    fn enqueue<I, S>(&mut self, args: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let invocation = self.context.invocation(args);
        log::debug!("[tmux] queued {}", invocation);
        self.queue.push(invocation);
    }

    /// `=name` makes tmux match the session name exactly instead of by prefix.
    fn exact(&self, name: &str) -> String {
        format!("={}", name)
    }

    fn run(&self, invocation: &Invocation) -> Result<ExecutionResult> {
        self.runner.run(invocation, &self.context.cwd)
    }
}


impl MuxProvider for TmuxProvider {
    fn name(&self) -> &'static str {
        "tmux"
    }

    fn session_name(&self) -> &str {
        &self.context.session
    }

    fn session_exists(&self) -> Result<bool> {
        let target = self.exact(&self.context.session);
        let result = self.run(&self.context.invocation(["has-session", "-t", target.as_str()]))?;
        Ok(result.success())
    }

    fn create_session(&mut self, window_title: &str, starting_command: &str) {
        let session = self.context.session.clone();
        self.enqueue([
            "new-session",
            "-d",
            "-s",
            session.as_str(),
            "-n",
            window_title,
            starting_command,
        ]);
    }

    fn create_window(&mut self, window_title: &str, starting_command: &str) {
        let session = self.context.session.clone();
        self.enqueue([
            "new-window",
            "-t",
            session.as_str(),
            "-n",
            window_title,
            starting_command,
        ]);
    }

    fn create_pane(&mut self, starting_command: &str, is_horizontal: bool) {
        let session = self.context.session.clone();
        let orientation = if is_horizontal { "-h" } else { "-v" };
        self.enqueue([
            "split-window",
            "-t",
            session.as_str(),
            orientation,
            starting_command,
        ]);
    }

    fn move_to_pane(&self, direction: PaneDirection) -> Result<ExecutionResult> {
        let target = pane_target(&self.context.session, direction);
        let result = self.run(&self.context.invocation(["select-pane", "-t", target.as_str()]))?;
        if !result.success() {
            log::warn!("[tmux] select-pane {} failed: {}", target, result.diagnostic());
        }
        Ok(result)
    }

    fn move_to_window(&self, direction: WindowDirection) -> Result<ExecutionResult> {
        let target = window_target(&self.context.session, direction);
        let result = self.run(&self.context.invocation(["select-window", "-t", target.as_str()]))?;
        if !result.success() {
            log::warn!("[tmux] select-window {} failed: {}", target, result.diagnostic());
        }
        Ok(result)
    }

    fn build(&mut self, batch: &mut CommandBatch) -> Result<()> {
        let queue = std::mem::take(&mut self.queue);
        log::info!("[tmux] applying {} queued command(s)", queue.len());
        run_in_order(
            self.runner.as_ref(),
            &self.context,
            queue,
            Some(DUPLICATE_SESSION_MARKER),
            |invocation| batch.push(invocation),
        )
    }

    fn replay(&mut self, commands: &[Invocation]) -> Result<()> {
        log::info!("[tmux] replaying {} recorded command(s)", commands.len());
        run_in_order(
            self.runner.as_ref(),
            &self.context,
            commands.to_vec(),
            Some(DUPLICATE_SESSION_MARKER),
            |_| {},
        )
    }

    fn attach(&self) -> Result<()> {
        let session = self.context.session.as_str();
        let invocation = if self.context.nested {
            self.context.invocation(["switch-client", "-t", session])
        } else {
            self.context.invocation(["-2", "attach-session", "-t", session])
        };
        log::info!("[tmux] attaching to session: {}", session);
        let status = self.runner.run_interactive(&invocation, &self.context.cwd)?;
        if status != 0 {
            log::warn!("[tmux] {} exited with status {}", invocation, status);
        }
        Ok(())
    }

    fn verify_executable(&self) -> Result<bool> {
        let result = probe_version(self.runner.as_ref(), &self.context, "-V")?;
        Ok(result.stdout.contains("tmux"))
    }

    fn kill_session(&self) -> Result<()> {
        let session = self.context.session.clone();
        self.kill_named_session(&session)
    }

    fn kill_named_session(&self, name: &str) -> Result<()> {
        let target = self.exact(name);
        let invocation = self.context.invocation(["kill-session", "-t", target.as_str()]);
        log::info!("[tmux] killing session {}", name);
        self.run(&invocation)?
            .check(&invocation, name, None)
            .map(|_| ())
    }

    fn list_sessions(&self) -> Result<Vec<SessionSummary>> {
        let invocation = self.context.invocation(["list-sessions", "-F", SESSION_LIST_FORMAT]);
        let result = self.run(&invocation)?;
        if !result.success() {
            // No server means no sessions.
            if result.stderr.contains("no server running") || result.stderr.contains("error connecting") {
                return Ok(Vec::new());
            }
            return result.check(&invocation, &self.context.session, None).map(|_| Vec::new());
        }
        Ok(parse_list_sessions(&result.stdout))
    }

    fn is_session_creation(&self, invocation: &Invocation) -> bool {
        matches!(invocation.subcommand(), Some("new-session") | Some("new"))
    }
}


/// Parse `list-sessions -F "#{session_name} #{session_windows}"` output.
pub fn parse_list_sessions(raw: &str) -> Vec<SessionSummary> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| match line.rsplit_once(' ') {
            Some((name, count)) if count.parse::<u32>().is_ok() => SessionSummary {
                name: name.to_string(),
                windows: count.parse().ok(),
            },
            _ => SessionSummary {
                name: line.to_string(),
                windows: None,
            },
        })
        .collect()
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::test_support::context;
    use crate::runner::recording::RecordingRunner;

    fn provider() -> (TmuxProvider, Rc<RecordingRunner>) {
        let runner = Rc::new(RecordingRunner::new());
        runner.respond("-V", ExecutionResult::ok("tmux 3.4\n"));
        let provider = TmuxProvider::new(context("tmux", "mux-demo"), runner.clone()).unwrap();
        runner.clear();
        (provider, runner)
    }

    #[test]
    fn constructor_verifies_version() {
        let runner = Rc::new(RecordingRunner::new());
        runner.respond("-V", ExecutionResult::ok("Screen version 4.09.00"));
        let result = TmuxProvider::new(context("screen", "mux-demo"), runner.clone());
        assert!(matches!(result, Err(MuxError::Configuration(_))));
        assert_eq!(runner.subcommands(), vec!["-V"]);
    }

    #[test]
    fn create_calls_are_queued_not_run() {
        let (mut p, runner) = provider();
        p.create_session("main", "bash");
        p.create_pane("htop", true);
        p.create_window("logs", "tail -f log.txt");
        assert!(runner.calls().is_empty());

        let pending = p.queue.clone();
        assert_eq!(
            pending[0].args,
            vec!["new-session", "-d", "-s", "mux-demo", "-n", "main", "bash"]
        );
        assert_eq!(pending[1].args, vec!["split-window", "-t", "mux-demo", "-h", "htop"]);
        assert_eq!(
            pending[2].args,
            vec!["new-window", "-t", "mux-demo", "-n", "logs", "tail -f log.txt"]
        );
    }

    #[test]
    fn vertical_pane_uses_v_flag() {
        let (mut p, _runner) = provider();
        p.create_pane("top", false);
        assert_eq!(p.queue[0].args[3], "-v");
    }

    #[test]
    fn build_runs_queue_in_order_and_records() {
        let (mut p, runner) = provider();
        p.create_session("main", "bash");
        p.create_pane("htop", true);
        p.create_window("logs", "tail -f log.txt");
        let mut batch = CommandBatch::new();
        p.build(&mut batch).unwrap();

        assert_eq!(runner.subcommands(), vec!["new-session", "split-window", "new-window"]);
        assert_eq!(batch.len(), 3);
        assert!(p.queue.is_empty());
    }

    #[test]
    fn build_stops_at_first_failure() {
        let (mut p, runner) = provider();
        runner.respond("split-window", ExecutionResult::failed(1, "create pane failed: pane too small"));
        p.create_session("main", "bash");
        p.create_pane("htop", true);
        p.create_window("logs", "tail -f log.txt");
        let mut batch = CommandBatch::new();
        let err = p.build(&mut batch).unwrap_err();

        assert!(matches!(err, MuxError::ToolExecution { status: 1, .. }));
        assert_eq!(runner.subcommands(), vec!["new-session", "split-window"]);
        assert_eq!(batch.len(), 1);
        assert!(p.queue.is_empty());
    }

    #[test]
    fn duplicate_session_is_classified() {
        let (mut p, runner) = provider();
        runner.respond("new-session", ExecutionResult::failed(1, "duplicate session: mux-demo\n"));
        p.create_session("main", "bash");
        p.create_pane("htop", true);
        let mut batch = CommandBatch::new();
        let err = p.build(&mut batch).unwrap_err();
        assert!(err.is_duplicate_session());
        assert!(batch.is_empty());
        assert_eq!(runner.subcommands(), vec!["new-session"]);
    }

    #[test]
    fn session_exists_matches_exact_name() {
        let (p, runner) = provider();
        runner.respond("has-session", ExecutionResult::failed(1, "can't find session: mux-demo"));
        assert!(!p.session_exists().unwrap());
        assert_eq!(runner.calls()[0].args, vec!["has-session", "-t", "=mux-demo"]);
    }

    #[test]
    fn move_to_pane_targets_token() {
        let (p, runner) = provider();
        let result = p.move_to_pane(PaneDirection::TopLeft).unwrap();
        assert!(result.success());
        assert_eq!(runner.calls()[0].args, vec!["select-pane", "-t", "mux-demo:{top-left}"]);
    }

    #[test]
    fn move_to_window_returns_tool_status() {
        let (p, runner) = provider();
        runner.respond("select-window", ExecutionResult::failed(1, "can't find window"));
        let result = p.move_to_window(WindowDirection::LastActive).unwrap();
        assert_eq!(result.status, 1);
        assert_eq!(runner.calls()[0].args, vec!["select-window", "-t", "mux-demo:{active}"]);
    }

    #[test]
    fn attach_runs_interactively() {
        let (p, runner) = provider();
        p.attach().unwrap();
        let calls = runner.interactive_calls();
        assert_eq!(calls[0].args, vec!["-2", "attach-session", "-t", "mux-demo"]);
    }

    #[test]
    fn nested_attach_switches_client() {
        let runner = Rc::new(RecordingRunner::new());
        runner.respond("-V", ExecutionResult::ok("tmux 3.4"));
        let mut ctx = context("tmux", "mux-demo");
        ctx.nested = true;
        let p = TmuxProvider::new(ctx, runner.clone()).unwrap();
        p.attach().unwrap();
        assert_eq!(runner.interactive_calls()[0].args, vec!["switch-client", "-t", "mux-demo"]);
    }

    #[test]
    fn kill_session_reports_failure() {
        let (p, runner) = provider();
        runner.respond("kill-session", ExecutionResult::failed(1, "can't find session: mux-demo"));
        let err = p.kill_session().unwrap_err();
        assert!(matches!(err, MuxError::ToolExecution { .. }));
    }

    #[test]
    fn list_sessions_parses_names_and_counts() {
        let (p, runner) = provider();
        runner.respond("list-sessions", ExecutionResult::ok("mux-demo 2\nmux-other app 1\nscratch 3\n"));
        let sessions = p.list_sessions().unwrap();
        assert_eq!(sessions.len(), 3);
        assert_eq!(sessions[1].name, "mux-other app");
        assert_eq!(sessions[1].windows, Some(1));
    }

    #[test]
    fn list_sessions_without_server_is_empty() {
        let (p, runner) = provider();
        runner.respond(
            "list-sessions",
            ExecutionResult::failed(1, "no server running on /tmp/tmux-1000/default"),
        );
        assert!(p.list_sessions().unwrap().is_empty());
    }

    #[test]
    fn replay_does_not_touch_queue() {
        let (mut p, runner) = provider();
        let recorded = vec![
            Invocation::new("tmux", ["split-window", "-t", "mux-demo", "-v", "top"]),
        ];
        p.replay(&recorded).unwrap();
        assert_eq!(runner.subcommands(), vec!["split-window"]);
        assert!(p.queue.is_empty());
    }

    #[test]
    fn recognises_session_creation() {
        let (p, _runner) = provider();
        assert!(p.is_session_creation(&Invocation::new("tmux", ["new-session", "-d"])));
        assert!(!p.is_session_creation(&Invocation::new("tmux", ["new-window"])));
    }
}
