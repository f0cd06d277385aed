use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{MuxError, Result};


/// Name of the settings file inside the config directory.
pub const SETTINGS_FILE: &str = "settings.yaml";


#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MuxSettings {
    #[serde(default)]
    pub project_root: String,
    /// Session names are `<prefix>-<project>`. Default: "mux".
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Which backend to drive: "tmux" or "screen". Default: "tmux".
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Path to the multiplexer binary. Defaults to the provider name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executable_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shell: Option<String>,
    /// Overrides the basename of `project_root`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    /// Reconcile the layout as soon as the workspace is activated. Default: true.
    #[serde(default = "default_run_at_startup")]
    pub run_at_startup: bool,
    /// Layout used when the project layout is missing or invalid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_configuration: Option<String>,
    /// Layout file name, relative to `project_root`. Default: ".mux.json".
    #[serde(default = "default_layout_file")]
    pub layout_file: String,
    /// Where reconciliation state and rc files live.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_dir: Option<String>,
}

fn default_prefix() -> String {
    "mux".into()
}

fn default_provider() -> String {
    "tmux".into()
}

fn default_run_at_startup() -> bool {
    true
}

fn default_layout_file() -> String {
    ".mux.json".into()
}

impl Default for MuxSettings {
    fn default() -> Self {
        MuxSettings {
            project_root: String::new(),
            prefix: default_prefix(),
            provider: default_provider(),
            executable_path: None,
            shell: None,
            project_name: None,
            run_at_startup: default_run_at_startup(),
            global_configuration: None,
            layout_file: default_layout_file(),
            state_dir: None,
        }
    }
}


impl MuxSettings {
    /// Load `settings.yaml` from `config_dir`. A missing file yields defaults.
    pub fn load(config_dir: &Path) -> Result<MuxSettings> {
        let path = config_dir.join(SETTINGS_FILE);
        match std::fs::read_to_string(&path) {
            Ok(content) => Self::from_yaml(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(MuxSettings::default()),
            Err(e) => Err(MuxError::config(format!("cannot read {}: {}", path.display(), e))),
        }
    }

    pub fn from_yaml(input: &str) -> Result<MuxSettings> {
        if input.trim().is_empty() {
            return Ok(MuxSettings::default());
        }
        serde_yaml::from_str(input)
            .map_err(|e| MuxError::config(format!("invalid settings: {}", e)))
    }

    pub fn project_name(&self) -> String {
        if let Some(name) = &self.project_name {
            return name.clone();
        }
        Path::new(&self.project_root)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "workspace".into())
    }

    /// `<prefix>-<project>`, fixed for the lifetime of a workspace.
    pub fn session_name(&self) -> String {
        format!("{}-{}", self.prefix, self.project_name())
    }

    pub fn executable(&self) -> String {
        self.executable_path
            .clone()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| self.provider.clone())
    }

    pub fn shell(&self) -> String {
        self.shell
            .clone()
            .or_else(|| std::env::var("SHELL").ok())
            .unwrap_or_else(|| "/bin/sh".into())
    }

    pub fn layout_path(&self) -> PathBuf {
        Path::new(&self.project_root).join(&self.layout_file)
    }

    pub fn global_layout_path(&self) -> Option<PathBuf> {
        self.global_configuration.as_ref().map(PathBuf::from)
    }

    pub fn state_dir(&self, config_dir: &Path) -> PathBuf {
        match &self.state_dir {
            Some(dir) => PathBuf::from(dir),
            None => config_dir.join("state"),
        }
    }
}
