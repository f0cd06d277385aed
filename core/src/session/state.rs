//! Reconciliation state — the command batch and configuration fingerprint
//! recorded for one session, and the stores that persist them.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::runner::Invocation;
use crate::types::layout::LayoutDocument;


/// Ordered log of invocations that succeeded during the last build.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct CommandBatch {
    commands: Vec<Invocation>,
}


impl CommandBatch {
    pub fn new() -> CommandBatch {
        CommandBatch::default()
    }

    pub fn push(&mut self, invocation: Invocation) {
        self.commands.push(invocation);
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Invocation> {
        self.commands.iter()
    }

}


/// SHA-256 of the canonical JSON form of a layout document, hex encoded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct ConfigFingerprint(String);


impl ConfigFingerprint {
    pub fn of(document: &LayoutDocument) -> Result<ConfigFingerprint> {
        // Struct field order is fixed, so the serialization is canonical.
        let canonical = serde_json::to_vec(document)?;
        let digest = Sha256::digest(&canonical);
        Ok(ConfigFingerprint(hex::encode(digest)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}


/// What gets persisted per session.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReconcileState {
    #[serde(default)]
    pub commands: CommandBatch,
    #[serde(rename = "configurationHash", default, skip_serializing_if = "Option::is_none")]
    pub configuration_hash: Option<ConfigFingerprint>,
}


impl ReconcileState {
    /// True when the stored fingerprint matches and there is something to replay.
    pub fn can_replay(&self, fingerprint: &ConfigFingerprint) -> bool {
        self.configuration_hash.as_ref() == Some(fingerprint) && !self.commands.is_empty()
    }

    /// Reset before a build. Nothing counts as applied until
    /// [`ReconcileState::mark_built`] is called.
    pub fn begin_build(&mut self) {
        self.commands.clear();
        self.configuration_hash = None;
    }

    /// Record `fingerprint` as the last configuration that built cleanly.
    pub fn mark_built(&mut self, fingerprint: ConfigFingerprint) {
        self.configuration_hash = Some(fingerprint);
    }
}


/// Storage collaborator for [`ReconcileState`], keyed by session name.
pub trait StateStore {
    fn load(&self, session: &str) -> Result<ReconcileState>;
    fn save(&self, session: &str, state: &ReconcileState) -> Result<()>;
}


/// One JSON file per session under a state directory.
#[derive(Debug, Clone)]
pub struct JsonStateStore {
    dir: PathBuf,
}


impl JsonStateStore {
    pub fn new(dir: impl Into<PathBuf>) -> JsonStateStore {
        JsonStateStore { dir: dir.into() }
    }

    pub fn path_for(&self, session: &str) -> PathBuf {
        self.dir.join(format!("{}.json", session))
    }
}


impl StateStore for JsonStateStore {
    fn load(&self, session: &str) -> Result<ReconcileState> {
        let path = self.path_for(session);
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ReconcileState::default()),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, session: &str, state: &ReconcileState) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(session);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(state)?)?;
        std::fs::rename(&tmp, &path)?;
        log::debug!("saved reconcile state to {}", path.display());
        Ok(())
    }
}


/// Process-local store, used when no state directory is configured.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    states: RefCell<HashMap<String, ReconcileState>>,
}


impl MemoryStateStore {
    pub fn new() -> MemoryStateStore {
        MemoryStateStore::default()
    }
}


impl StateStore for MemoryStateStore {
    fn load(&self, session: &str) -> Result<ReconcileState> {
        Ok(self.states.borrow().get(session).cloned().unwrap_or_default())
    }

    fn save(&self, session: &str, state: &ReconcileState) -> Result<()> {
        self.states.borrow_mut().insert(session.to_string(), state.clone());
        Ok(())
    }
}
