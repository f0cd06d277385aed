//! Session reconciliation — persisted state and the lifecycle controller.

pub mod controller;
pub mod state;

pub use controller::{ConflictResolution, SessionContext, SessionController, SessionState};
pub use state::{CommandBatch, ConfigFingerprint, JsonStateStore, MemoryStateStore, ReconcileState, StateStore};
