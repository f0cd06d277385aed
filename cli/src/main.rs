//! muxlay CLI — the command-line entry point.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;
use std::rc::Rc;

use clap::{Parser, Subcommand};

use muxlay_core::command::Command;
use muxlay_core::response::Response;
use muxlay_core::runner::ShellRunner;
use muxlay_core::session::ConflictResolution;
use muxlay_core::sys::Sys;
use muxlay_core::types::config::MuxSettings;
use muxlay_core::types::direction::{PaneDirection, WindowDirection};


#[derive(Parser)]
#[command(name = "muxlay")]
#[command(about = "Build tmux/screen sessions from a layout document", long_about = None)]
#[command(disable_help_subcommand = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}


#[derive(Subcommand)]
enum Commands {
    /// Build or replay the layout, then attach
    Show,
    /// Same as show, unless run_at_startup is off in settings.yaml
    Activate,
    /// Focus a pane (top-left, next, left-of, active, ...)
    Pane { direction: PaneDirection },
    /// Focus a window (start, end, next, previous, active)
    Window { direction: WindowDirection },
    /// Kill this workspace's session
    Kill,
    /// Kill every session whose name starts with a prefix
    KillAll {
        #[arg(long)]
        prefix: Option<String>,
    },
    /// List running sessions
    Sessions,
    /// Show session and recorded state
    Status {
        #[arg(long)]
        json: bool,
    },
    /// Show help for a command or group
    Help { topic: Option<String> },
}


impl From<Commands> for Command {
    fn from(cmd: Commands) -> Command {
        match cmd {
            Commands::Show => Command::Show,
            Commands::Activate => Command::Activate,
            Commands::Pane { direction } => Command::NavPane { direction },
            Commands::Window { direction } => Command::NavWindow { direction },
            Commands::Kill => Command::Kill,
            Commands::KillAll { prefix } => Command::KillAll { prefix },
            Commands::Sessions => Command::SessionList,
            Commands::Status { json } => Command::Status {
                format: json.then(|| "json".to_string()),
            },
            Commands::Help { topic } => Command::Help { topic },
        }
    }
}


fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let config_dir = resolve_config_dir();
    let mut settings = match MuxSettings::load(&config_dir) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("muxlay: {}", e);
            process::exit(1);
        }
    };
    if let Ok(root) = std::env::var("MUX_PROJECT_ROOT") {
        settings.project_root = root;
    }
    if settings.project_root.is_empty() {
        if let Ok(cwd) = std::env::current_dir() {
            settings.project_root = cwd.to_string_lossy().into_owned();
        }
    }
    log::debug!("config dir {}, project root {}", config_dir.display(), settings.project_root);

    let mut sys = Sys::new(settings, config_dir, Rc::new(ShellRunner));
    let mut response = sys.execute(cli.command.into());

    while let Response::Conflict { session, message, options } = response {
        eprintln!("muxlay: {}", message);
        response = match prompt_resolution(&session, &options) {
            Some(choice) => sys.execute(Command::Resolve { choice }),
            None => sys.execute(Command::Dismiss),
        };
    }

    match response {
        Response::Ok { output } => {
            if !output.is_empty() {
                println!("{}", output);
            }
        }
        Response::Error { message } => {
            eprintln!("muxlay error: {}", message);
            process::exit(1);
        }
        Response::Conflict { .. } => {}
    }
}


fn resolve_config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("MUX_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
    PathBuf::from(home).join(".config").join("muxlay")
}


/// Ask which way to resolve the conflict. Anything unrecognised (or EOF)
/// dismisses it.
fn prompt_resolution(session: &str, options: &[String]) -> Option<ConflictResolution> {
    eprint!("Session {} already exists. [{}]? ", session, options.join("/"));
    io::stderr().flush().ok()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line).ok()?;
    line.parse().ok()
}
