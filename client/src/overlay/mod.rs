//! Overlay item model and in-memory collection

pub mod store;
pub mod types;

pub use store::{OverlayCollection, OverlayStore};
pub use types::{
    ImagePayload, OverlayContent, OverlayError, OverlayId, OverlayItem, Position, Size,
    SizeConstraints,
};
