//! Synchronization engine: reconciles the local overlay collection with the
//! remote store
//!
//! Saves are full-replace: every push transmits the entire current
//! collection, so the consistency model across concurrent sessions for one
//! user is last-writer-wins. That is an accepted, documented design choice;
//! the collection revision is attached to every save outcome so optimistic
//! concurrency checks can be layered on later.

use metrics::{counter, histogram};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::error::ClientError;
use crate::overlay::{OverlayCollection, OverlayItem};
use crate::protocol::{decode_items, encode_items};

use super::backend::{BackendError, OverlayBackend};

/// Result of the initial load for a user
#[derive(Debug)]
pub struct RemoteProfile {
    /// Decoded overlay items, in persisted order
    pub items: Vec<OverlayItem>,
    /// Feed locator stored for the user
    pub rtsp_url: Option<String>,
    /// Number of malformed payloads skipped during decode
    pub skipped: usize,
}

/// Outcome of one save push
#[derive(Debug, Clone, Copy)]
pub struct SaveOutcome {
    /// Revision of the collection that was pushed
    pub rev: u64,
}

/// Non-fatal sync notifications, surfaced to the embedding application
#[derive(Debug, Clone)]
pub enum SyncEvent {
    Saved { rev: u64 },
    SaveFailed { rev: u64, error: String },
}

/// The synchronization engine for one user identity
pub struct SyncEngine {
    backend: Arc<dyn OverlayBackend>,
    user_name: String,
}

impl SyncEngine {
    pub fn new(backend: Arc<dyn OverlayBackend>, user_name: impl Into<String>) -> Self {
        Self {
            backend,
            user_name: user_name.into(),
        }
    }

    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    /// Fetch and decode the stored collection for this user.
    ///
    /// Zero stored overlays is an empty collection, not an error. A single
    /// malformed payload is skipped and counted, never aborting its siblings.
    pub async fn load(&self) -> Result<RemoteProfile, ClientError> {
        let start = Instant::now();
        counter!("framecast_loads_total").increment(1);

        let record = self
            .backend
            .fetch_user(&self.user_name)
            .await
            .map_err(persistence_error)?;

        let (items, skipped) = decode_items(&record.overlays);
        if skipped > 0 {
            counter!("framecast_overlay_decode_skipped_total").increment(skipped as u64);
        }

        info!(
            user = %self.user_name,
            loaded = items.len(),
            skipped,
            "loaded overlay collection"
        );
        histogram!("framecast_load_duration_seconds").record(start.elapsed());

        Ok(RemoteProfile {
            items,
            rtsp_url: record.rtsp_url,
            skipped,
        })
    }

    /// Push the full collection to the remote store (full-replace)
    pub async fn save(&self, collection: &OverlayCollection) -> Result<SaveOutcome, ClientError> {
        let start = Instant::now();
        counter!("framecast_saves_total").increment(1);

        let payloads = encode_items(&collection.items);
        self.backend
            .put_overlays(&self.user_name, &payloads)
            .await
            .map_err(persistence_error)?;

        debug!(
            user = %self.user_name,
            rev = collection.rev,
            count = payloads.len(),
            "saved overlay collection"
        );
        histogram!("framecast_save_duration_seconds").record(start.elapsed());

        Ok(SaveOutcome {
            rev: collection.rev,
        })
    }

    /// Register this user with a feed locator and the current collection.
    ///
    /// Returns the server-echoed items when the echo is present and
    /// non-empty; the caller adopts them as the collection of record.
    pub async fn register(
        &self,
        rtsp_url: &str,
        collection: &OverlayCollection,
    ) -> Result<Option<Vec<OverlayItem>>, ClientError> {
        counter!("framecast_registrations_total").increment(1);

        let payloads = encode_items(&collection.items);
        let echo = self
            .backend
            .register_user(&self.user_name, rtsp_url, &payloads)
            .await
            .map_err(persistence_error)?;

        if echo.overlays.is_empty() {
            return Ok(None);
        }

        let (items, skipped) = decode_items(&echo.overlays);
        info!(
            user = %self.user_name,
            adopted = items.len(),
            skipped,
            "adopted server-echoed overlays at registration"
        );
        Ok(Some(items))
    }

    /// Observe the store and push a save after every observed change.
    ///
    /// `watch` delivers the freshest snapshot only: bursts of mutations that
    /// land while a save is in flight coalesce into one trailing save, so
    /// each completed gesture costs at most one request and intermediate
    /// movement costs none. Failures are reported through `events` and never
    /// stop the loop.
    pub async fn run(
        self: Arc<Self>,
        mut rx: watch::Receiver<OverlayCollection>,
        events: mpsc::Sender<SyncEvent>,
    ) {
        while rx.changed().await.is_ok() {
            let snapshot = rx.borrow_and_update().clone();
            match self.save(&snapshot).await {
                Ok(outcome) => {
                    let _ = events.try_send(SyncEvent::Saved { rev: outcome.rev });
                }
                Err(e) => {
                    counter!("framecast_save_failures_total", "class" => e.class()).increment(1);
                    warn!(rev = snapshot.rev, %e, "overlay save failed");
                    let _ = events.try_send(SyncEvent::SaveFailed {
                        rev: snapshot.rev,
                        error: e.to_string(),
                    });
                }
            }
        }
        debug!("overlay store closed; sync loop ending");
    }
}

fn persistence_error(e: BackendError) -> ClientError {
    ClientError::Persistence(e.to_string())
}
