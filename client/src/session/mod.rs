//! Session context and its file-backed persistence

pub mod context;

pub use context::{SessionContext, SessionHandle};
