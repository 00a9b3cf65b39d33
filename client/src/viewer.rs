//! Top-level assembly: bootstraps overlay state, opens the frame channel,
//! and wires the sync loop
//!
//! Ordering at mount is load-before-interactive: the remote collection is
//! installed (or the load fails and bootstrap reports it) before the
//! interaction surface is marked ready, so a default or empty local
//! collection can never overwrite server state. The frame relay and the
//! overlay sync are independent: a dead channel does not stop saves, and
//! failed saves do not stop frames.

use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::ClientError;
use crate::overlay::{OverlayCollection, OverlayStore, SizeConstraints};
use crate::protocol::Frame;
use crate::session::SessionHandle;
use crate::stream::{ControlClient, FrameChannel};
use crate::surface::InteractionSurface;
use crate::sync::{HttpBackend, SyncEngine, SyncEvent};

/// Size of the sync notification buffer; old notifications are dropped
/// rather than blocking the sync loop.
const SYNC_EVENT_BUFFER: usize = 32;

/// A running viewer core for one user identity
pub struct Viewer {
    store: Arc<OverlayStore>,
    surface: InteractionSurface,
    session: SessionHandle,
    control: ControlClient,
    channel: Option<FrameChannel>,
    channel_url: String,
    sync_events: mpsc::Receiver<SyncEvent>,
    sync_task: JoinHandle<()>,
}

impl Viewer {
    /// Bootstrap for a returning user: load the stored collection, connect
    /// the frame channel, start the sync loop, unlock the surface.
    pub async fn bootstrap(config: &Config, user_name: &str) -> Result<Self, ClientError> {
        if user_name.trim().is_empty() {
            return Err(ClientError::Validation(
                "a user name is required".to_string(),
            ));
        }

        let session = SessionHandle::load_or_create(&config.session.state_path, user_name)?;
        let (engine, mut viewer) = Self::assemble(config, session)?;

        // Initial load gates everything: the surface stays locked and no
        // save is issued until the collection of record is installed.
        let profile = engine.load().await?;
        if let Some(rtsp_url) = profile.rtsp_url {
            viewer.session.set_rtsp_url(rtsp_url)?;
        }
        viewer.store.replace_all(profile.items);

        viewer.finish(config, engine).await;
        Ok(viewer)
    }

    /// Register a new user with a feed locator, adopting any server-echoed
    /// overlays as the collection of record.
    pub async fn register(
        config: &Config,
        user_name: &str,
        rtsp_url: &str,
    ) -> Result<Self, ClientError> {
        if user_name.trim().is_empty() || rtsp_url.trim().is_empty() {
            return Err(ClientError::Validation(
                "both a user name and an RTSP URL are required".to_string(),
            ));
        }

        let session = SessionHandle::load_or_create(&config.session.state_path, user_name)?;
        let (engine, mut viewer) = Self::assemble(config, session)?;

        let echoed = engine
            .register(rtsp_url, &viewer.store.snapshot())
            .await?;
        viewer.session.set_rtsp_url(rtsp_url)?;
        if let Some(items) = echoed {
            viewer.store.replace_all(items);
        }

        viewer.finish(config, engine).await;
        Ok(viewer)
    }

    /// Build the still-gated viewer and its sync engine
    fn assemble(
        config: &Config,
        session: SessionHandle,
    ) -> Result<(Arc<SyncEngine>, Self), ClientError> {
        let backend = HttpBackend::new(&config.api_base_url, config.request_timeout)
            .map_err(|e| ClientError::Persistence(e.to_string()))?;
        let engine = Arc::new(SyncEngine::new(Arc::new(backend), session.user_name()));

        let constraints =
            SizeConstraints::new(config.overlay.min_size, config.overlay.max_size);
        let store = Arc::new(OverlayStore::new(constraints));
        let surface = InteractionSurface::new(store.clone(), config.viewport.clone());
        let control = ControlClient::new(&config.api_base_url, config.request_timeout)?;

        let (_, sync_events) = mpsc::channel(1);
        let viewer = Self {
            store,
            surface,
            session,
            control,
            channel: None,
            channel_url: config.channel_url.clone(),
            sync_events,
            sync_task: tokio::spawn(async {}),
        };
        Ok((engine, viewer))
    }

    /// Connect the channel, start the sync loop, unlock the surface
    async fn finish(&mut self, config: &Config, engine: Arc<SyncEngine>) {
        // A fresh subscription treats the current value as seen; mark it
        // changed so the just-installed collection is pushed too.
        let mut rx = self.store.subscribe();
        rx.mark_changed();
        let (events_tx, events_rx) = mpsc::channel(SYNC_EVENT_BUFFER);
        self.sync_events = events_rx;
        self.sync_task = tokio::spawn(engine.run(rx, events_tx));

        // A dead channel never blocks overlay editing; reconnects are the
        // caller's call via connect_channel.
        match FrameChannel::connect(&config.channel_url, self.session.clone()).await {
            Ok(channel) => self.channel = Some(channel),
            Err(e) => warn!(%e, "frame channel unavailable; overlay editing continues"),
        }

        self.surface.mark_ready();
        info!(user = %self.session.user_name(), "viewer ready");
    }

    /// Re-invoke the channel connection after a drop
    pub async fn connect_channel(&mut self) -> Result<(), ClientError> {
        let channel = FrameChannel::connect(&self.channel_url, self.session.clone()).await?;
        self.channel = Some(channel);
        Ok(())
    }

    pub fn store(&self) -> &Arc<OverlayStore> {
        &self.store
    }

    pub fn surface(&mut self) -> &mut InteractionSurface {
        &mut self.surface
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    /// Freshest-frame slot, when the channel is up
    pub fn frames(&self) -> Option<watch::Receiver<Option<Frame>>> {
        self.channel.as_ref().map(|c| c.frames())
    }

    /// Next sync notification (save outcomes, surfaced to the user)
    pub async fn next_sync_event(&mut self) -> Option<SyncEvent> {
        self.sync_events.recv().await
    }

    /// Pause the upstream capture for the remembered session
    pub async fn pause(&self) {
        if let Some(sid) = self.session.sid() {
            self.control.pause(&sid).await;
        } else {
            warn!("no stream session id yet; pause ignored");
        }
    }

    /// Resume the upstream capture for the remembered session
    pub async fn resume(&self) {
        if let Some(sid) = self.session.sid() {
            self.control.resume(&sid).await;
        } else {
            warn!("no stream session id yet; resume ignored");
        }
    }

    /// Current collection snapshot
    pub fn snapshot(&self) -> OverlayCollection {
        self.store.snapshot()
    }

    /// Release the frame channel and stop the sync loop
    pub async fn shutdown(mut self) {
        if let Some(channel) = self.channel.take() {
            channel.disconnect().await;
        }
        // Dropping the store ends the sync loop's watch subscription
        let Viewer {
            store,
            surface,
            sync_task,
            ..
        } = self;
        drop(surface);
        drop(store);
        let _ = sync_task.await;
        info!("viewer shut down");
    }
}
