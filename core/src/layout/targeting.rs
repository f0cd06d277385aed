//! Target resolver — translates symbolic directions into tmux target
//! expressions and dispatches navigation to the active provider.
//!
//! Targets take the form `<session>:{<token>}`, e.g. `mux-app:{top-left}` for
//! a pane or `mux-app:{next}` for a window. Each dispatch is independent; no
//! "last direction" is remembered.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::provider::MuxProvider;
use crate::runner::ExecutionResult;
use crate::types::direction::{PaneDirection, WindowDirection};


/// A navigation request: move between panes or between windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", content = "direction", rename_all = "lowercase")]
pub enum NavigationTarget {
    Pane(PaneDirection),
    Window(WindowDirection),
}


/// Pane target expression for `select-pane -t`.
pub fn pane_target(session: &str, direction: PaneDirection) -> String {
    format!("{}:{{{}}}", session, direction.token())
}

/// Window target expression for `select-window -t`.
pub fn window_target(session: &str, direction: WindowDirection) -> String {
    format!("{}:{{{}}}", session, direction.token())
}


impl fmt::Display for NavigationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NavigationTarget::Pane(d) => write!(f, "pane:{}", d),
            NavigationTarget::Window(d) => write!(f, "window:{}", d),
        }
    }
}


/// Route a navigation request to the provider and return the tool's status.
pub fn dispatch(provider: &dyn MuxProvider, target: NavigationTarget) -> Result<ExecutionResult> {
    log::debug!(
        "[{}] navigating {} in {}",
        provider.name(),
        target,
        provider.session_name()
    );
    match target {
        NavigationTarget::Pane(direction) => provider.move_to_pane(direction),
        NavigationTarget::Window(direction) => provider.move_to_window(direction),
    }
}


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
