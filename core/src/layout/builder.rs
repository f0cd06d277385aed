//! Layout builder — turns a layout document into provider calls.
//!
//! The first window creates the session and its panes are split right after;
//! every later window is appended with `create_window` followed by its panes.
//! Backends address panes and windows by creation order, so the plan keeps
//! document order exactly. The final step is always `Build`.

use crate::error::{MuxError, Result};
use crate::provider::MuxProvider;
use crate::session::state::CommandBatch;
use crate::types::layout::{LayoutDocument, Window};


/// One provider call in a layout plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutStep {
    CreateSession { window_title: String, command: String },
    CreateWindow { window_title: String, command: String },
    CreatePane { command: String, is_horizontal: bool },
    Build,
}


/// Ordered provider calls that reproduce `document`. Empty when the document
/// has no windows.
pub fn plan_layout(document: &LayoutDocument) -> Vec<LayoutStep> {
    let Some((first, rest)) = document.windows.split_first() else {
        return Vec::new();
    };

    let mut steps = vec![LayoutStep::CreateSession {
        window_title: first.display_name().to_string(),
        command: first.command.clone(),
    }];
    push_panes(&mut steps, first);

    for window in rest {
        steps.push(LayoutStep::CreateWindow {
            window_title: window.display_name().to_string(),
            command: window.command.clone(),
        });
        push_panes(&mut steps, window);
    }

    steps.push(LayoutStep::Build);
    steps
}

fn push_panes(steps: &mut Vec<LayoutStep>, window: &Window) {
    for pane in &window.panes {
        steps.push(LayoutStep::CreatePane {
            command: pane.command.clone(),
            is_horizontal: pane.is_horizontal,
        });
    }
}


/// Issue `steps` against `provider`. The result of the `Build` step is the
/// result of the whole plan.
pub fn apply_plan(
    steps: &[LayoutStep],
    provider: &mut dyn MuxProvider,
    batch: &mut CommandBatch,
) -> Result<()> {
    for step in steps {
        match step {
            LayoutStep::CreateSession { window_title, command } => {
                provider.create_session(window_title, command)
            }
            LayoutStep::CreateWindow { window_title, command } => {
                provider.create_window(window_title, command)
            }
            LayoutStep::CreatePane { command, is_horizontal } => {
                provider.create_pane(command, *is_horizontal)
            }
            LayoutStep::Build => provider.build(batch)?,
        }
    }
    Ok(())
}


/// Plan and apply `document`.
pub fn build_layout(
    document: &LayoutDocument,
    provider: &mut dyn MuxProvider,
    batch: &mut CommandBatch,
) -> Result<()> {
    let steps = plan_layout(document);
    if steps.is_empty() {
        return Err(MuxError::config("layout document has no windows"));
    }
    log::info!(
        "[{}] building {} window(s), {} pane(s) for {}",
        provider.name(),
        document.windows.len(),
        document.pane_count(),
        provider.session_name()
    );
    apply_plan(&steps, provider, batch)
}
