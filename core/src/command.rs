//! Command — the typed interface for all muxlay operations.
//!
//! The CLI parses its arguments into a `Command` and hands it to
//! `Sys::execute`; nothing else reaches the core.

use serde::{Deserialize, Serialize};

use crate::session::ConflictResolution;
use crate::types::direction::{PaneDirection, WindowDirection};


#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "command")]
pub enum Command {
    // -----------------------------------------------------------------
    // Session lifecycle
    // -----------------------------------------------------------------

    /// Reconcile the layout and attach.
    #[serde(rename = "show")]
    Show,

    /// Same as `Show`, but only when `run_at_startup` is enabled.
    #[serde(rename = "activate")]
    Activate,

    #[serde(rename = "resolve")]
    Resolve { choice: ConflictResolution },

    /// Leave a conflict unresolved and the session untouched.
    #[serde(rename = "dismiss")]
    Dismiss,

    #[serde(rename = "session.kill")]
    Kill,

    /// Kill every running session whose name starts with `prefix`
    /// (default: the configured prefix).
    #[serde(rename = "session.kill-all")]
    KillAll {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        prefix: Option<String>,
    },

    #[serde(rename = "session.list")]
    SessionList,

    // -----------------------------------------------------------------
    // Navigation
    // -----------------------------------------------------------------

    #[serde(rename = "nav.pane")]
    NavPane { direction: PaneDirection },

    #[serde(rename = "nav.window")]
    NavWindow { direction: WindowDirection },

    // -----------------------------------------------------------------
    // Status / Help
    // -----------------------------------------------------------------

    #[serde(rename = "status")]
    Status {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        format: Option<String>,
    },

    #[serde(rename = "help")]
    Help {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        topic: Option<String>,
    },
}
