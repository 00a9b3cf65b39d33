//! Remote persistence backend and the synchronization engine

pub mod backend;
pub mod engine;

pub use backend::{BackendError, HttpBackend, OverlayBackend, UserRecord};
pub use engine::{RemoteProfile, SaveOutcome, SyncEngine, SyncEvent};
