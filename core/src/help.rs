//! Help system for muxlay commands.

pub fn help_text(topic: Option<&str>) -> String {
    match topic {
        None => overview(),
        Some(t) => {
            if let Some(text) = command_help(t) {
                return text;
            }
            if let Some(text) = group_help(t) {
                return text;
            }
            format!("Unknown help topic: '{}'. Run 'muxlay help' for a list of commands.", t)
        }
    }
}


fn overview() -> String {
    "\
muxlay — build tmux/screen sessions from a .mux.json layout

Usage: muxlay <command> [args...]

Session commands:
  show                       Build or replay the layout, then attach
  activate                   Like show, unless run_at_startup is off
  kill                       Kill this workspace's session
  kill-all [--prefix <p>]    Kill every session starting with the prefix
  sessions                   List running sessions as JSON
  status [--json]            Show session, provider and recorded state

Navigation commands:
  pane <direction>           Focus a pane (top-left, next, left-of, ...)
  window <direction>         Focus a window (start, end, next, previous, active)

  help [topic]               Show help

Run 'muxlay help <command>' for detailed help on a specific command."
        .into()
}


fn group_help(group: &str) -> Option<String> {
    let text = match group {
        "session" => "\
Session commands — reconcile and tear down the workspace session

  show
    Build the layout if the session is missing or the layout changed,
    otherwise replay the recorded commands. Attaches afterwards. If the
    backend refuses to create an existing session you are asked to
    Restart (kill and rebuild) or Attach.

  activate
    Run show when run_at_startup is enabled in settings.yaml;
    otherwise do nothing. Meant for shell or editor startup hooks.

  kill
    Kill the session and forget its recorded commands.

  kill-all [--prefix <p>]
    Kill every running session whose name starts with <p>.
    Default prefix: '<prefix>-' from settings.yaml.

  sessions
    List running sessions with their window counts.",

        "nav" | "navigation" => "\
Navigation commands — move focus inside the session (tmux only)

  pane <direction>
    top, bottom, left, right, top-left, top-right, bottom-left,
    bottom-right, up-of, down-of, left-of, right-of, next, previous,
    active

  window <direction>
    start, end, next, previous, active",

        "config" => "\
Configuration

  <config dir>/settings.yaml, where <config dir> is $MUX_CONFIG_DIR or
  ~/.config/muxlay. Keys: prefix, provider (tmux|screen), executable_path,
  shell, project_root, project_name, run_at_startup, global_configuration,
  layout_file, state_dir.

  $MUX_PROJECT_ROOT overrides project_root. The layout is read from
  <project_root>/.mux.json; global_configuration is used when that file
  is missing or invalid.",

        _ => return None,
    };
    Some(text.into())
}


fn command_help(command: &str) -> Option<String> {
    let text = match command {
        "show" => "muxlay show — build or replay the layout and attach\n\nUsage: muxlay show",
        "activate" => "muxlay activate — show, if run_at_startup is on\n\nUsage: muxlay activate",
        "kill" => "muxlay kill — kill this workspace's session\n\nUsage: muxlay kill",
        "kill-all" => "muxlay kill-all — kill sessions by prefix\n\nUsage: muxlay kill-all [--prefix <p>]",
        "sessions" => "muxlay sessions — list running sessions\n\nUsage: muxlay sessions",
        "status" => "muxlay status — show session state\n\nUsage: muxlay status [--json]",
        "pane" => "muxlay pane — focus a pane\n\nUsage: muxlay pane <direction>",
        "window" => "muxlay window — focus a window\n\nUsage: muxlay window <direction>",
        "help" => "muxlay help — show help\n\nUsage: muxlay help [topic]",
        _ => return None,
    };
    Some(text.into())
}
