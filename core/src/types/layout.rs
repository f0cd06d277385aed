//! Layout document — the desired session/window/pane tree.
//!
//! Documents are JSON objects of the form
//! `{ "title"?, "windows": [{ "title"?, "command", "panes"?: [{ "command", "isHorizontal" }] }] }`.
//! They are parsed fresh for every reconciliation and never mutated.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{MuxError, Result};


#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LayoutDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub windows: Vec<Window>,
}


#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Window {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub command: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub panes: Vec<Pane>,
}


#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Pane {
    pub command: String,
    #[serde(rename = "isHorizontal")]
    pub is_horizontal: bool,
}


impl Window {
    /// Name shown for the window: its title, falling back to its command.
    pub fn display_name(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.command)
    }
}


impl LayoutDocument {
    /// Parse and validate a document from JSON text.
    pub fn from_json(input: &str) -> Result<LayoutDocument> {
        let doc: LayoutDocument = serde_json::from_str(input)
            .map_err(|e| MuxError::config(format!("invalid layout document: {}", e)))?;
        doc.validate()?;
        Ok(doc)
    }

    /// Read a document from disk.
    pub fn from_file(path: &Path) -> Result<LayoutDocument> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            MuxError::config(format!("cannot read layout file {}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
    }

    /// A document needs at least one window to create the session from.
    pub fn validate(&self) -> Result<()> {
        if self.windows.is_empty() {
            return Err(MuxError::config("layout document must define at least one window"));
        }
        Ok(())
    }

    pub fn pane_count(&self) -> usize {
        self.windows.iter().map(|w| w.panes.len()).sum()
    }
}


/// Load the project document, falling back to the global one when the
/// project file is missing or invalid.
pub fn load_document(project_file: &Path, global_file: Option<&Path>) -> Result<LayoutDocument> {
    match LayoutDocument::from_file(project_file) {
        Ok(doc) => {
            log::info!("using project layout {}", project_file.display());
            Ok(doc)
        }
        Err(err) => match global_file {
            Some(global) => {
                log::warn!("project layout unusable ({}), using global layout", err);
                LayoutDocument::from_file(global)
            }
            None => Err(err),
        },
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "title": "demo",
        "windows": [
            { "title": "main", "command": "bash",
              "panes": [{ "command": "htop", "isHorizontal": true }] },
            { "command": "npm run watch" }
        ]
    }"#;

    #[test]
    fn parses_full_document() {
        let doc = LayoutDocument::from_json(SAMPLE).unwrap();
        assert_eq!(doc.title.as_deref(), Some("demo"));
        assert_eq!(doc.windows.len(), 2);
        assert_eq!(doc.windows[0].panes[0].command, "htop");
        assert!(doc.windows[0].panes[0].is_horizontal);
        assert!(doc.windows[1].panes.is_empty());
        assert_eq!(doc.pane_count(), 1);
    }

    #[test]
    fn display_name_falls_back_to_command() {
        let doc = LayoutDocument::from_json(SAMPLE).unwrap();
        assert_eq!(doc.windows[0].display_name(), "main");
        assert_eq!(doc.windows[1].display_name(), "npm run watch");
    }

    #[test]
    fn empty_window_list_is_configuration_error() {
        let err = LayoutDocument::from_json(r#"{"windows": []}"#).unwrap_err();
        assert!(matches!(err, MuxError::Configuration(_)));
    }

    #[test]
    fn missing_windows_is_configuration_error() {
        let err = LayoutDocument::from_json(r#"{"title": "x"}"#).unwrap_err();
        assert!(matches!(err, MuxError::Configuration(_)));
    }

    #[test]
    fn pane_requires_orientation() {
        let input = r#"{"windows": [{"command": "bash", "panes": [{"command": "top"}]}]}"#;
        assert!(LayoutDocument::from_json(input).is_err());
    }

    #[test]
    fn empty_command_is_accepted() {
        let doc = LayoutDocument::from_json(r#"{"windows": [{"command": "", "panes": [{"command": "", "isHorizontal": false}]}]}"#).unwrap();
        assert_eq!(doc.windows[0].display_name(), "");
        assert_eq!(doc.pane_count(), 1);
    }

    #[test]
    fn window_requires_command() {
        let input = r#"{"windows": [{"title": "main"}]}"#;
        assert!(LayoutDocument::from_json(input).is_err());
    }

    #[test]
    fn serializes_orientation_in_camel_case() {
        let doc = LayoutDocument::from_json(SAMPLE).unwrap();
        let json = serde_json::to_string(&doc).unwrap();
        assert!(json.contains("\"isHorizontal\":true"));
    }

    #[test]
    fn falls_back_to_global_layout() {
        let dir = tempfile::tempdir().unwrap();
        let project = dir.path().join(".mux.json");
        let global = dir.path().join("global.json");
        std::fs::write(&project, r#"{"windows": []}"#).unwrap();
        std::fs::write(&global, r#"{"windows": [{"command": "zsh"}]}"#).unwrap();

        let doc = load_document(&project, Some(&global)).unwrap();
        assert_eq!(doc.windows[0].command, "zsh");
    }

    #[test]
    fn missing_project_layout_without_global_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_document(&dir.path().join(".mux.json"), None).unwrap_err();
        assert!(matches!(err, MuxError::Configuration(_)));
    }
}
