//! Session lifecycle controller — decides between attaching, replaying,
//! rebuilding, and asking the user to resolve a duplicate session.
//!
//! The controller owns the session's [`SessionContext`] (command batch plus
//! configuration fingerprint) and is the only thing that mutates it: the batch
//! is reset when a build starts, appended to as build steps succeed, and
//! cleared when the session is torn down. The context is written back to the
//! [`StateStore`] after each of those points.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{MuxError, Result};
use crate::layout::builder::build_layout;
use crate::provider::MuxProvider;
use crate::runner::Invocation;
use crate::session::state::{ConfigFingerprint, ReconcileState, StateStore};
use crate::types::layout::LayoutDocument;


/// Reconciliation state for one session identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub identity: String,
    pub state: ReconcileState,
}


impl SessionContext {
    #[cfg(test)]
    pub fn new(identity: impl Into<String>) -> SessionContext {
        SessionContext {
            identity: identity.into(),
            state: ReconcileState::default(),
        }
    }

    pub fn load(store: &dyn StateStore, identity: &str) -> Result<SessionContext> {
        Ok(SessionContext {
            identity: identity.to_string(),
            state: store.load(identity)?,
        })
    }
}


#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    NoSession,
    SessionExists,
    Building,
    Attached,
    /// Session creation was refused; waiting for a [`ConflictResolution`].
    Conflict { message: String },
    /// A build or replay failed. Nothing is retried automatically.
    Failed { message: String },
    /// A conflict was dismissed; the session was left alone.
    Idle,
}


impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::NoSession => f.write_str("no session"),
            SessionState::SessionExists => f.write_str("session exists"),
            SessionState::Building => f.write_str("building"),
            SessionState::Attached => f.write_str("attached"),
            SessionState::Conflict { message } => write!(f, "conflict: {}", message),
            SessionState::Failed { message } => write!(f, "failed: {}", message),
            SessionState::Idle => f.write_str("idle"),
        }
    }
}


/// The two ways out of a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConflictResolution {
    /// Kill the existing session and build from scratch.
    Restart,
    /// Keep the existing session and attach to it.
    Attach,
}


impl ConflictResolution {
    pub const OPTIONS: [ConflictResolution; 2] = [ConflictResolution::Restart, ConflictResolution::Attach];

    pub fn label(self) -> &'static str {
        match self {
            ConflictResolution::Restart => "Restart",
            ConflictResolution::Attach => "Attach",
        }
    }
}


impl FromStr for ConflictResolution {
    type Err = MuxError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "restart" | "r" => Ok(ConflictResolution::Restart),
            "attach" | "a" => Ok(ConflictResolution::Attach),
            other => Err(MuxError::config(format!("unknown conflict resolution: '{}'", other))),
        }
    }
}


pub struct SessionController {
    provider: Box<dyn MuxProvider>,
    store: Box<dyn StateStore>,
    context: SessionContext,
    state: SessionState,
    pending: Option<LayoutDocument>,
}


impl SessionController {
    pub fn new(
        provider: Box<dyn MuxProvider>,
        store: Box<dyn StateStore>,
        context: SessionContext,
    ) -> SessionController {
        SessionController {
            provider,
            store,
            context,
            state: SessionState::NoSession,
            pending: None,
        }
    }

    /// Build a controller whose context is read from `store`.
    pub fn open(provider: Box<dyn MuxProvider>, store: Box<dyn StateStore>) -> Result<SessionController> {
        let context = SessionContext::load(store.as_ref(), provider.session_name())?;
        Ok(SessionController::new(provider, store, context))
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn provider(&self) -> &dyn MuxProvider {
        self.provider.as_ref()
    }

    /// Choices to present while in `Conflict`.
    pub fn conflict_options(&self) -> Option<[ConflictResolution; 2]> {
        match self.state {
            SessionState::Conflict { .. } => Some(ConflictResolution::OPTIONS),
            _ => None,
        }
    }

    /// Bring the backend in line with `document` and attach.
    pub fn reconcile(&mut self, document: LayoutDocument) -> Result<SessionState> {
        document.validate()?;
        let fingerprint = ConfigFingerprint::of(&document)?;
        self.pending = Some(document);

        if self.provider.session_exists()? {
            self.state = SessionState::SessionExists;
            if self.context.state.can_replay(&fingerprint) {
                log::info!(
                    "session {} exists and configuration is unchanged, replaying",
                    self.context.identity
                );
                return self.replay_and_attach();
            }
            log::info!(
                "session {} exists but configuration changed or nothing recorded",
                self.context.identity
            );
        } else {
            self.state = SessionState::NoSession;
        }
        self.build(fingerprint)
    }

    /// Leave `Conflict` by restarting or attaching.
    pub fn resolve(&mut self, choice: ConflictResolution) -> Result<SessionState> {
        if !matches!(self.state, SessionState::Conflict { .. }) {
            return Err(MuxError::config(format!(
                "no conflict to resolve (state: {})",
                self.state
            )));
        }
        log::info!("conflict on {} resolved with {}", self.context.identity, choice.label());
        match choice {
            ConflictResolution::Attach => {
                self.attach();
                Ok(self.state.clone())
            }
            ConflictResolution::Restart => {
                self.context.state.commands.clear();
                self.persist()?;
                if let Err(err) = self.provider.kill_session() {
                    if self.provider.session_exists()? {
                        self.state = SessionState::Failed {
                            message: err.to_string(),
                        };
                        return Ok(self.state.clone());
                    }
                    log::warn!("kill failed but session is gone: {}", err);
                }
                self.state = SessionState::NoSession;
                let document = self
                    .pending
                    .as_ref()
                    .ok_or_else(|| MuxError::config("no layout document to rebuild"))?;
                let fingerprint = ConfigFingerprint::of(document)?;
                self.build(fingerprint)
            }
        }
    }

    /// Any answer other than the two resolutions: leave everything alone.
    pub fn dismiss(&mut self) -> SessionState {
        if matches!(self.state, SessionState::Conflict { .. }) {
            log::info!("conflict on {} dismissed", self.context.identity);
            self.state = SessionState::Idle;
        }
        self.state.clone()
    }

    /// Tear the session down and forget what was recorded for it.
    pub fn kill(&mut self) -> Result<()> {
        self.context.state.commands.clear();
        self.persist()?;
        self.provider.kill_session()?;
        self.state = SessionState::NoSession;
        Ok(())
    }

    fn build(&mut self, fingerprint: ConfigFingerprint) -> Result<SessionState> {
        let document = self
            .pending
            .clone()
            .ok_or_else(|| MuxError::config("no layout document to build"))?;
        self.state = SessionState::Building;
        self.context.state.begin_build();

        let result = build_layout(&document, self.provider.as_mut(), &mut self.context.state.commands);
        if result.is_ok() {
            self.context.state.mark_built(fingerprint);
        }
        self.persist()?;

        match result {
            Ok(()) => {
                log::info!("built session {}", self.context.identity);
                self.attach();
            }
            Err(err) if err.is_duplicate_session() => {
                log::warn!("{}", err);
                self.state = SessionState::Conflict {
                    message: err.to_string(),
                };
            }
            Err(err) => {
                log::error!("build of {} failed: {}", self.context.identity, err);
                self.state = SessionState::Failed {
                    message: err.to_string(),
                };
            }
        }
        Ok(self.state.clone())
    }

    fn replay_and_attach(&mut self) -> Result<SessionState> {
        let commands: Vec<Invocation> = self
            .context
            .state
            .commands
            .iter()
            .filter(|inv| !self.provider.is_session_creation(inv))
            .cloned()
            .collect();
        if !commands.is_empty() {
            if let Err(err) = self.provider.replay(&commands) {
                log::error!("replay on {} failed: {}", self.context.identity, err);
                self.state = SessionState::Failed {
                    message: err.to_string(),
                };
                return Ok(self.state.clone());
            }
        }
        self.attach();
        Ok(self.state.clone())
    }

    fn attach(&mut self) {
        if let Err(err) = self.provider.attach() {
            log::warn!("attach to {} failed: {}", self.context.identity, err);
        }
        self.state = SessionState::Attached;
    }

    fn persist(&self) -> Result<()> {
        self.store.save(&self.context.identity, &self.context.state)
    }
}
