//! Framecast Client Library
//!
//! Core of the live feed viewer: frame relay over a persistent channel and
//! overlay state synchronization against a remote store. Rendering, routing,
//! and login screens are external collaborators; this crate consumes a user
//! identity and produces the overlay collection and the frame stream.

pub mod config;
pub mod error;
pub mod overlay;
pub mod protocol;
pub mod session;
pub mod stream;
pub mod surface;
pub mod sync;
pub mod viewer;

// Re-export commonly used types
pub use config::Config;
pub use error::ClientError;
pub use overlay::{OverlayCollection, OverlayItem, OverlayStore};
pub use protocol::Frame;
pub use session::SessionHandle;
pub use surface::{GestureEvent, InteractionSurface};
pub use sync::{SyncEngine, SyncEvent};
pub use viewer::Viewer;
