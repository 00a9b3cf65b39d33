//! Interaction surface: gesture commits, creation flow, readiness gating
//!
//! Gestures are committed to the store only at completion (drag-stop,
//! resize-stop); intermediate movement never reaches the store and so never
//! reaches the network. Events arriving before the initial load resolves
//! are queued and drained in order once the collection of record is
//! installed, so nothing a fast user does at mount is silently lost.

pub mod creation;

use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::ViewportConfig;
use crate::error::ClientError;
use crate::overlay::{OverlayError, OverlayId, OverlayStore};

pub use creation::{CreationFlow, Draft};

/// A completed user gesture against one overlay widget
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GestureEvent {
    /// Final position of a drag
    DragStop { id: OverlayId, x: i32, y: i32 },
    /// Final dimensions of a resize
    ResizeStop {
        id: OverlayId,
        width: u32,
        height: u32,
    },
    /// Delete affordance clicked
    Delete { id: OverlayId },
}

/// Translates gestures and creation actions into store mutations
pub struct InteractionSurface {
    store: Arc<OverlayStore>,
    viewport: ViewportConfig,
    creation: CreationFlow,
    ready: bool,
    pending: VecDeque<GestureEvent>,
}

impl InteractionSurface {
    /// A new surface starts gated: gestures queue until `mark_ready`
    pub fn new(store: Arc<OverlayStore>, viewport: ViewportConfig) -> Self {
        Self {
            store,
            viewport,
            creation: CreationFlow::new(),
            ready: false,
            pending: VecDeque::new(),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Apply a gesture, or queue it while the initial load is outstanding
    pub fn apply(&mut self, event: GestureEvent) -> Result<(), OverlayError> {
        if !self.ready {
            debug!(?event, "queueing gesture until initial load resolves");
            self.pending.push_back(event);
            return Ok(());
        }
        self.apply_now(event)
    }

    /// Install the loaded collection as source of truth and drain the queue.
    /// Queued gestures against items the load removed are dropped with a
    /// warning; the rest apply in arrival order.
    pub fn mark_ready(&mut self) {
        self.ready = true;
        while let Some(event) = self.pending.pop_front() {
            if let Err(e) = self.apply_now(event) {
                warn!(%e, "dropping queued gesture");
            }
        }
    }

    fn apply_now(&mut self, event: GestureEvent) -> Result<(), OverlayError> {
        match event {
            GestureEvent::DragStop { id, x, y } => {
                let (x, y) = self.clamp_position(id, x, y)?;
                self.store.update_position(id, x, y)
            }
            GestureEvent::ResizeStop { id, width, height } => {
                self.store.update_size(id, width, height)
            }
            GestureEvent::Delete { id } => self.store.remove(id),
        }
    }

    /// Keep the widget inside the parent frame rectangle
    fn clamp_position(&self, id: OverlayId, x: i32, y: i32) -> Result<(i32, i32), OverlayError> {
        let snapshot = self.store.snapshot();
        let item = snapshot.get(id).ok_or(OverlayError::UnknownItem(id))?;

        let max_x = (self.viewport.width as i32 - item.size.width as i32).max(0);
        let max_y = (self.viewport.height as i32 - item.size.height as i32).max(0);
        Ok((x.clamp(0, max_x), y.clamp(0, max_y)))
    }

    // Creation flow -------------------------------------------------------

    pub fn creation(&self) -> &CreationFlow {
        &self.creation
    }

    pub fn open_creation(&mut self) {
        self.creation.open();
    }

    pub fn choose_text(&mut self) {
        self.creation.choose_text();
    }

    pub fn choose_image(&mut self) {
        self.creation.choose_image();
    }

    pub fn set_text(&mut self, text: impl Into<String>) -> Result<(), ClientError> {
        self.creation.set_text(text)
    }

    pub fn attach_image(
        &mut self,
        media_type: &str,
        bytes: impl Into<bytes::Bytes>,
    ) -> Result<(), ClientError> {
        self.creation.attach_image(media_type, bytes)
    }

    pub fn attach_data_uri(&mut self, uri: &str) -> Result<(), ClientError> {
        self.creation.attach_data_uri(uri)
    }

    /// Submit the creation draft: appends with default geometry and closes
    /// the form. Validation failures block the submit and keep the draft.
    pub fn submit_creation(&mut self) -> Result<OverlayId, ClientError> {
        if !self.ready {
            return Err(ClientError::Validation(
                "overlay state is still loading".to_string(),
            ));
        }
        let content = self.creation.submit()?;
        Ok(self.store.append(content))
    }

    pub fn cancel_creation(&mut self) {
        self.creation.cancel();
    }
}
