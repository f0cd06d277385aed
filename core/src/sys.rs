use std::path::PathBuf;
use std::rc::Rc;

use crate::command::Command;
use crate::error::Result;
use crate::layout::targeting::{self, NavigationTarget};
use crate::provider::{self, create_provider, ProviderContext, ProviderKind};
use crate::response::Response;
use crate::runner::CommandRunner;
use crate::session::{ConflictResolution, JsonStateStore, SessionController, SessionState};
use crate::types::config::MuxSettings;
use crate::types::layout::{load_document, LayoutDocument};


/// Central runtime for muxlay. Owns the settings and, once a command needs
/// it, the session controller for this workspace.
pub struct Sys {
    settings: MuxSettings,
    config_dir: PathBuf,
    runner: Rc<dyn CommandRunner>,
    controller: Option<SessionController>,
}


impl Sys {
    pub fn new(settings: MuxSettings, config_dir: impl Into<PathBuf>, runner: Rc<dyn CommandRunner>) -> Sys {
        Sys {
            settings,
            config_dir: config_dir.into(),
            runner,
            controller: None,
        }
    }

    /// Current lifecycle state, if a controller has been created.
    #[cfg(test)]
    pub fn session_state(&self) -> Option<&SessionState> {
        self.controller.as_ref().map(|c| c.state())
    }

    /// The single dispatch method.
    pub fn execute(&mut self, cmd: Command) -> Response {
        match cmd {
            Command::Show => self.cmd_show(),
            Command::Activate => self.activate(),
            Command::Resolve { choice } => self.cmd_resolve(choice),
            Command::Dismiss => self.cmd_dismiss(),
            Command::Kill => self.cmd_kill(),
            Command::KillAll { prefix } => self.cmd_kill_all(prefix),
            Command::SessionList => self.cmd_session_list(),
            Command::NavPane { direction } => self.cmd_navigate(NavigationTarget::Pane(direction)),
            Command::NavWindow { direction } => self.cmd_navigate(NavigationTarget::Window(direction)),
            Command::Status { format } => self.cmd_status(format),
            Command::Help { topic } => self.cmd_help(topic),
        }
    }

    /// Workspace activation: reconcile right away unless `run_at_startup`
    /// is off.
    pub fn activate(&mut self) -> Response {
        if !self.settings.run_at_startup {
            log::info!("run_at_startup disabled, not building {}", self.settings.session_name());
            return Response::ok("run_at_startup is disabled");
        }
        self.cmd_show()
    }

    fn controller(&mut self) -> Result<&mut SessionController> {
        let controller = match self.controller.take() {
            Some(controller) => controller,
            None => {
                let kind: ProviderKind = self.settings.provider.parse()?;
                let state_dir = self.settings.state_dir(&self.config_dir);
                let context = ProviderContext::from_settings(&self.settings, state_dir.clone());
                let provider = create_provider(kind, context, self.runner.clone())?;
                let store = JsonStateStore::new(state_dir);
                SessionController::open(provider, Box::new(store))?
            }
        };
        Ok(self.controller.insert(controller))
    }

    fn layout(&self) -> Result<LayoutDocument> {
        let global = self.settings.global_layout_path();
        load_document(&self.settings.layout_path(), global.as_deref())
    }

    // -----------------------------------------------------------------------
    // Session lifecycle
    // -----------------------------------------------------------------------

    fn cmd_show(&mut self) -> Response {
        let document = match self.layout() {
            Ok(doc) => doc,
            Err(err) => return Response::error(err.to_string()),
        };
        let controller = match self.controller() {
            Ok(c) => c,
            Err(err) => return Response::error(err.to_string()),
        };
        match controller.reconcile(document) {
            Ok(_) => state_response(controller),
            Err(err) => Response::error(err.to_string()),
        }
    }

    fn cmd_resolve(&mut self, choice: ConflictResolution) -> Response {
        let controller = match self.controller() {
            Ok(c) => c,
            Err(err) => return Response::error(err.to_string()),
        };
        match controller.resolve(choice) {
            Ok(_) => state_response(controller),
            Err(err) => Response::error(err.to_string()),
        }
    }

    fn cmd_dismiss(&mut self) -> Response {
        let controller = match self.controller() {
            Ok(c) => c,
            Err(err) => return Response::error(err.to_string()),
        };
        controller.dismiss();
        state_response(controller)
    }

    fn cmd_kill(&mut self) -> Response {
        let controller = match self.controller() {
            Ok(c) => c,
            Err(err) => return Response::error(err.to_string()),
        };
        let session = controller.provider().session_name().to_string();
        controller
            .kill()
            .map(|()| format!("killed session {}", session))
            .into()
    }

    fn cmd_kill_all(&mut self, prefix: Option<String>) -> Response {
        let prefix = prefix.unwrap_or_else(|| format!("{}-", self.settings.prefix));
        let controller = match self.controller() {
            Ok(c) => c,
            Err(err) => return Response::error(err.to_string()),
        };
        provider::kill_sessions_with_prefix(controller.provider(), &prefix)
            .map(|killed| {
                if killed.is_empty() {
                    format!("no sessions matching '{}'", prefix)
                } else {
                    format!("killed {}", killed.join(", "))
                }
            })
            .into()
    }

    fn cmd_session_list(&mut self) -> Response {
        let controller = match self.controller() {
            Ok(c) => c,
            Err(err) => return Response::error(err.to_string()),
        };
        controller
            .provider()
            .list_sessions()
            .and_then(|sessions| serde_json::to_string(&sessions).map_err(Into::into))
            .into()
    }

    // -----------------------------------------------------------------------
    // Navigation
    // -----------------------------------------------------------------------

    fn cmd_navigate(&mut self, target: NavigationTarget) -> Response {
        let controller = match self.controller() {
            Ok(c) => c,
            Err(err) => return Response::error(err.to_string()),
        };
        match targeting::dispatch(controller.provider(), target) {
            Ok(result) if result.success() => Response::ok(target.to_string()),
            Ok(result) => Response::error(format!(
                "{} failed with status {}: {}",
                target,
                result.status,
                result.diagnostic()
            )),
            Err(err) => Response::error(err.to_string()),
        }
    }

    // -----------------------------------------------------------------------
    // Status / Help
    // -----------------------------------------------------------------------

    fn cmd_status(&mut self, format: Option<String>) -> Response {
        let session = self.settings.session_name();
        let provider = self.settings.provider.clone();
        let controller = match self.controller() {
            Ok(c) => c,
            Err(err) => return Response::error(err.to_string()),
        };
        let exists = match controller.provider().session_exists() {
            Ok(exists) => exists,
            Err(err) => return Response::error(err.to_string()),
        };
        let recorded = &controller.context().state;
        let fingerprint = recorded.configuration_hash.as_ref().map(|f| f.as_str().to_string());

        if format.as_deref() == Some("json") {
            let value = serde_json::json!({
                "session": session,
                "provider": provider,
                "running": exists,
                "state": controller.state(),
                "recorded_commands": recorded.commands.len(),
                "configuration_hash": fingerprint,
            });
            return Response::ok(value.to_string());
        }

        Response::ok(format!(
            "session:   {}\nprovider:  {}\nrunning:   {}\nstate:     {}\nrecorded:  {} command(s)\nhash:      {}",
            session,
            provider,
            if exists { "yes" } else { "no" },
            controller.state(),
            recorded.commands.len(),
            fingerprint.as_deref().unwrap_or("-"),
        ))
    }

    fn cmd_help(&self, topic: Option<String>) -> Response {
        Response::ok(crate::help::help_text(topic.as_deref()))
    }
}


fn state_response(controller: &SessionController) -> Response {
    let session = controller.provider().session_name();
    if let Some(options) = controller.conflict_options() {
        let message = match controller.state() {
            SessionState::Conflict { message } => message.clone(),
            _ => String::new(),
        };
        return Response::Conflict {
            session: session.to_string(),
            message,
            options: options.iter().map(|c| c.label().to_string()).collect(),
        };
    }
    match controller.state() {
        SessionState::Attached => Response::ok(format!("attached to {}", session)),
        SessionState::Failed { message } => Response::error(message.clone()),
        SessionState::Idle => Response::ok(format!("left {} untouched", session)),
        other => Response::ok(format!("{}: {}", session, other)),
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    use crate::runner::recording::RecordingRunner;
    use crate::runner::ExecutionResult;
    use crate::types::direction::{PaneDirection, WindowDirection};

    const DOC: &str = r#"{"windows":[{"title":"main","command":"bash","panes":[{"command":"htop","isHorizontal":false}]}]}"#;

    struct Fixture {
        project: tempfile::TempDir,
        config: tempfile::TempDir,
        runner: Rc<RecordingRunner>,
    }

    fn fixture() -> Fixture {
        let project = tempfile::tempdir().unwrap();
        std::fs::write(project.path().join(".mux.json"), DOC).unwrap();
        let runner = Rc::new(RecordingRunner::new());
        runner.respond("-V", ExecutionResult::ok("tmux 3.4"));
        Fixture {
            project,
            config: tempfile::tempdir().unwrap(),
            runner,
        }
    }

    fn settings(project: &Path) -> MuxSettings {
        MuxSettings {
            project_root: project.to_string_lossy().into_owned(),
            project_name: Some("app".into()),
            ..MuxSettings::default()
        }
    }

    fn sys(f: &Fixture) -> Sys {
        Sys::new(settings(f.project.path()), f.config.path(), f.runner.clone())
    }

    #[test]
    fn show_builds_and_persists_state() {
        let f = fixture();
        f.runner.respond("has-session", ExecutionResult::failed(1, "can't find session: mux-app"));
        let mut sys = sys(&f);

        let resp = sys.execute(Command::Show);

        assert_eq!(resp, Response::ok("attached to mux-app"));
        assert_eq!(f.runner.interactive_calls().len(), 1);
        let state_file = f.config.path().join("state").join("mux-app.json");
        let saved: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(state_file).unwrap()).unwrap();
        assert_eq!(saved["commands"].as_array().unwrap().len(), 2);
        assert!(saved["configurationHash"].is_string());
    }

    #[test]
    fn duplicate_session_surfaces_conflict_then_attach() {
        let f = fixture();
        f.runner.respond("has-session", ExecutionResult::ok(""));
        f.runner.respond("new-session", ExecutionResult::failed(1, "duplicate session: mux-app"));
        let mut sys = sys(&f);

        match sys.execute(Command::Show) {
            Response::Conflict { session, options, .. } => {
                assert_eq!(session, "mux-app");
                assert_eq!(options, vec!["Restart", "Attach"]);
            }
            other => panic!("expected Conflict, got {:?}", other),
        }

        let resp = sys.execute(Command::Resolve {
            choice: ConflictResolution::Attach,
        });
        assert_eq!(resp, Response::ok("attached to mux-app"));
        assert_eq!(sys.session_state(), Some(&SessionState::Attached));
    }

    #[test]
    fn dismissed_conflict_leaves_session_alone() {
        let f = fixture();
        f.runner.respond("has-session", ExecutionResult::ok(""));
        f.runner.respond("new-session", ExecutionResult::failed(1, "duplicate session: mux-app"));
        let mut sys = sys(&f);
        assert!(matches!(sys.execute(Command::Show), Response::Conflict { .. }));
        f.runner.clear();

        let resp = sys.execute(Command::Dismiss);

        assert_eq!(resp, Response::ok("left mux-app untouched"));
        assert_eq!(sys.session_state(), Some(&SessionState::Idle));
        assert!(f.runner.calls().is_empty());
        assert!(f.runner.interactive_calls().is_empty());
    }

    #[test]
    fn activate_builds_when_run_at_startup_is_on() {
        let f = fixture();
        f.runner.respond("has-session", ExecutionResult::failed(1, "no session"));
        let mut sys = sys(&f);
        assert_eq!(sys.execute(Command::Activate), Response::ok("attached to mux-app"));
    }

    #[test]
    fn missing_layout_is_an_error() {
        let f = fixture();
        std::fs::remove_file(f.project.path().join(".mux.json")).unwrap();
        let mut sys = sys(&f);
        assert!(matches!(sys.execute(Command::Show), Response::Error { .. }));
        assert!(f.runner.calls().is_empty());
    }

    #[test]
    fn global_layout_is_used_when_project_layout_is_missing() {
        let f = fixture();
        std::fs::remove_file(f.project.path().join(".mux.json")).unwrap();
        let global = f.config.path().join("global.json");
        std::fs::write(&global, r#"{"windows":[{"command":"zsh"}]}"#).unwrap();
        f.runner.respond("has-session", ExecutionResult::failed(1, "no session"));
        let mut settings = settings(f.project.path());
        settings.global_configuration = Some(global.to_string_lossy().into_owned());
        let mut sys = Sys::new(settings, f.config.path(), f.runner.clone());

        assert!(matches!(sys.execute(Command::Show), Response::Ok { .. }));
        assert!(f.runner.subcommands().contains(&"new-session".to_string()));
    }

    #[test]
    fn activate_respects_run_at_startup() {
        let f = fixture();
        let mut settings = settings(f.project.path());
        settings.run_at_startup = false;
        let mut sys = Sys::new(settings, f.config.path(), f.runner.clone());

        assert_eq!(sys.activate(), Response::ok("run_at_startup is disabled"));
        assert!(f.runner.calls().is_empty());
    }

    #[test]
    fn navigation_targets_session() {
        let f = fixture();
        let mut sys = sys(&f);

        let resp = sys.execute(Command::NavPane {
            direction: PaneDirection::TopLeft,
        });
        assert_eq!(resp, Response::ok("pane:top-left"));
        sys.execute(Command::NavWindow {
            direction: WindowDirection::LastActive,
        });

        let calls = f.runner.calls();
        let nav: Vec<_> = calls
            .iter()
            .filter(|c| c.subcommand().map_or(false, |s| s.starts_with("select-")))
            .map(|c| c.args[2].clone())
            .collect();
        assert_eq!(nav, vec!["mux-app:{top-left}", "mux-app:{active}"]);
    }

    #[test]
    fn failed_navigation_reports_stderr() {
        let f = fixture();
        f.runner.respond("select-pane", ExecutionResult::failed(1, "can't find pane: {down-of}"));
        let mut sys = sys(&f);
        match sys.execute(Command::NavPane {
            direction: PaneDirection::DownOf,
        }) {
            Response::Error { message } => assert!(message.contains("can't find pane")),
            other => panic!("expected Error, got {:?}", other),
        }
    }

    #[test]
    fn kill_all_defaults_to_configured_prefix() {
        let f = fixture();
        f.runner.respond("list-sessions", ExecutionResult::ok("mux-app 1\nmux-web 2\nwork 1\n"));
        let mut sys = sys(&f);

        let resp = sys.execute(Command::KillAll { prefix: None });

        assert_eq!(resp, Response::ok("killed mux-app, mux-web"));
    }

    #[test]
    fn session_list_is_json() {
        let f = fixture();
        f.runner.respond("list-sessions", ExecutionResult::ok("mux-app 3\n"));
        let mut sys = sys(&f);
        match sys.execute(Command::SessionList) {
            Response::Ok { output } => {
                let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
                assert_eq!(parsed[0]["name"], "mux-app");
                assert_eq!(parsed[0]["windows"], 3);
            }
            other => panic!("expected Ok, got {:?}", other),
        }
    }

    #[test]
    fn status_json_reports_session() {
        let f = fixture();
        f.runner.respond("has-session", ExecutionResult::failed(1, "no session"));
        let mut sys = sys(&f);
        match sys.execute(Command::Status {
            format: Some("json".into()),
        }) {
            Response::Ok { output } => {
                let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
                assert_eq!(parsed["session"], "mux-app");
                assert_eq!(parsed["running"], false);
                assert_eq!(parsed["state"]["state"], "no_session");
            }
            other => panic!("expected Ok, got {:?}", other),
        }
    }

    #[test]
    fn unknown_provider_is_reported() {
        let f = fixture();
        let mut settings = settings(f.project.path());
        settings.provider = "zellij".into();
        let mut sys = Sys::new(settings, f.config.path(), f.runner.clone());
        match sys.execute(Command::Kill) {
            Response::Error { message } => assert!(message.contains("unknown provider")),
            other => panic!("expected Error, got {:?}", other),
        }
    }

    #[test]
    fn help_returns_overview() {
        let f = fixture();
        let mut sys = sys(&f);
        match sys.execute(Command::Help { topic: None }) {
            Response::Ok { output } => assert!(output.contains("muxlay")),
            other => panic!("expected Ok, got {:?}", other),
        }
    }
}
