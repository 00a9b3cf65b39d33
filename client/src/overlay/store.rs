//! In-memory overlay collection with immutable published snapshots
//!
//! Every mutation builds a fresh `OverlayCollection` value, bumps its
//! revision, and publishes it whole through a `watch` channel. Observers
//! (the sync engine) react to new collection values, never to an
//! out-of-band dirty flag. Items are keyed by stable id; their position in
//! the sequence is z-order and persisted order only.

use std::sync::Mutex;
use tokio::sync::watch;
use tracing::debug;

use super::types::{
    OverlayContent, OverlayError, OverlayId, OverlayItem, Position, Size, SizeConstraints,
};

/// Immutable snapshot of the overlay collection
#[derive(Debug, Clone, Default)]
pub struct OverlayCollection {
    /// Monotonic revision, bumped on every mutation
    pub rev: u64,
    /// Insertion order = z-order = persisted order
    pub items: Vec<OverlayItem>,
}

impl OverlayCollection {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Find an item by its stable id
    pub fn get(&self, id: OverlayId) -> Option<&OverlayItem> {
        self.items.iter().find(|item| item.id == id)
    }
}

/// Owner of the overlay collection; all mutations go through here
pub struct OverlayStore {
    current: Mutex<OverlayCollection>,
    tx: watch::Sender<OverlayCollection>,
    constraints: SizeConstraints,
}

impl OverlayStore {
    pub fn new(constraints: SizeConstraints) -> Self {
        let initial = OverlayCollection::default();
        let (tx, _) = watch::channel(initial.clone());
        Self {
            current: Mutex::new(initial),
            tx,
            constraints,
        }
    }

    /// Subscribe to published collection snapshots
    pub fn subscribe(&self) -> watch::Receiver<OverlayCollection> {
        self.tx.subscribe()
    }

    /// Current snapshot
    pub fn snapshot(&self) -> OverlayCollection {
        self.current.lock().expect("overlay store poisoned").clone()
    }

    pub fn len(&self) -> usize {
        self.current.lock().expect("overlay store poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn constraints(&self) -> &SizeConstraints {
        &self.constraints
    }

    /// Append a new item with default geometry; returns its stable id
    pub fn append(&self, content: OverlayContent) -> OverlayId {
        let item = OverlayItem::new(content, &self.constraints);
        let id = item.id;
        self.mutate(|items| {
            items.push(item);
            Ok(())
        })
        .expect("append cannot fail");
        id
    }

    /// Commit a drag position for an item
    pub fn update_position(&self, id: OverlayId, x: i32, y: i32) -> Result<(), OverlayError> {
        self.mutate(|items| {
            let item = items
                .iter_mut()
                .find(|item| item.id == id)
                .ok_or(OverlayError::UnknownItem(id))?;
            item.position = Position { x, y };
            Ok(())
        })
    }

    /// Commit a resize for an item, clamped into the configured bounds
    pub fn update_size(&self, id: OverlayId, width: u32, height: u32) -> Result<(), OverlayError> {
        let size = self.constraints.clamp(Size { width, height });
        self.mutate(|items| {
            let item = items
                .iter_mut()
                .find(|item| item.id == id)
                .ok_or(OverlayError::UnknownItem(id))?;
            item.size = size;
            Ok(())
        })
    }

    /// Remove an item; later items shift down in z-order but keep their ids
    pub fn remove(&self, id: OverlayId) -> Result<(), OverlayError> {
        self.mutate(|items| {
            let index = items
                .iter()
                .position(|item| item.id == id)
                .ok_or(OverlayError::UnknownItem(id))?;
            items.remove(index);
            Ok(())
        })
    }

    /// Install a freshly loaded collection (initial load)
    pub fn replace_all(&self, new_items: Vec<OverlayItem>) {
        self.mutate(|items| {
            *items = new_items;
            Ok(())
        })
        .expect("replace_all cannot fail");
    }

    /// Build the next collection value under the lock and publish it whole
    fn mutate<F>(&self, op: F) -> Result<(), OverlayError>
    where
        F: FnOnce(&mut Vec<OverlayItem>) -> Result<(), OverlayError>,
    {
        let mut current = self.current.lock().expect("overlay store poisoned");
        let mut next = current.clone();
        op(&mut next.items)?;
        next.rev = current.rev + 1;
        debug!(rev = next.rev, len = next.items.len(), "overlay collection updated");
        *current = next.clone();
        self.tx.send_replace(next);
        Ok(())
    }
}

impl Default for OverlayStore {
    fn default() -> Self {
        Self::new(SizeConstraints::default())
    }
}
