//! Frame channel client
//!
//! One persistent websocket subscription to the frame producer. On open the
//! cached feed locator is forwarded so the producer starts capture from the
//! right feed; after that the client only consumes `frame` events. Display
//! is latest-wins: the freshest frame sits in a `watch` slot and anything
//! the renderer did not pick up in time is simply replaced. There is no
//! automatic reconnect; a caller wanting resilience re-invokes `connect`.

use futures_util::{SinkExt, StreamExt};
use metrics::counter;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::error::ClientError;
use crate::protocol::{ChannelMessage, ControlRequest, Frame};
use crate::session::SessionHandle;

/// Handle to an open frame channel
pub struct FrameChannel {
    frames: watch::Receiver<Option<Frame>>,
    close_tx: Option<oneshot::Sender<()>>,
    read_task: JoinHandle<()>,
}

impl FrameChannel {
    /// Open the channel and start the read task.
    ///
    /// The session context supplies the cached `rtsp_url` (sent to the
    /// producer on open) and receives the producer-assigned session id.
    pub async fn connect(
        channel_url: &str,
        session: SessionHandle,
    ) -> Result<Self, ClientError> {
        let (ws_stream, _) = connect_async(channel_url)
            .await
            .map_err(|e| ClientError::Connection(e.to_string()))?;
        info!(url = %channel_url, "frame channel connected");

        let (mut ws_writer, mut ws_reader) = ws_stream.split();

        // Forward the cached feed locator so capture starts from the right feed
        if let Some(rtsp_url) = session.rtsp_url() {
            let msg = ChannelMessage::RtspUrl { rtsp_url };
            let json = serde_json::to_string(&msg)
                .map_err(|e| ClientError::Connection(e.to_string()))?;
            ws_writer
                .send(Message::text(json))
                .await
                .map_err(|e| ClientError::Connection(e.to_string()))?;
        }

        let (frames_tx, frames_rx) = watch::channel(None);
        let (close_tx, mut close_rx) = oneshot::channel();

        let read_task = tokio::spawn(async move {
            // First-session adoption: conform to whatever the producer
            // assigns, remembering it once per connection.
            let mut adopted = false;

            loop {
                tokio::select! {
                    _ = &mut close_rx => {
                        let _ = ws_writer.send(Message::Close(None)).await;
                        debug!("frame channel closed by client");
                        break;
                    }
                    inbound = ws_reader.next() => {
                        let msg = match inbound {
                            Some(Ok(msg)) => msg,
                            Some(Err(e)) => {
                                warn!(%e, "frame channel error; channel dropped");
                                break;
                            }
                            None => {
                                debug!("frame channel closed by producer");
                                break;
                            }
                        };

                        let Message::Text(text) = msg else {
                            continue;
                        };
                        match serde_json::from_str::<ChannelMessage>(text.as_str()) {
                            Ok(ChannelMessage::Frame { sid, frame }) => {
                                counter!("framecast_frames_received_total").increment(1);

                                if !adopted && session.sid().as_deref() != Some(sid.as_str()) {
                                    if let Err(e) = session.adopt_sid(&sid) {
                                        warn!(%e, "failed to persist adopted session id");
                                    } else {
                                        info!(%sid, "adopted producer session id");
                                    }
                                    adopted = true;
                                }

                                // Latest-wins: replace whatever is displayed
                                frames_tx.send_replace(Some(Frame { sid, data: frame }));
                            }
                            Ok(other) => {
                                debug!(kind = other.message_type(), "ignoring channel message");
                            }
                            Err(e) => {
                                warn!(%e, "unparseable channel message");
                            }
                        }
                    }
                }
            }
        });

        Ok(Self {
            frames: frames_rx,
            close_tx: Some(close_tx),
            read_task,
        })
    }

    /// Subscribe to the freshest-frame slot
    pub fn frames(&self) -> watch::Receiver<Option<Frame>> {
        self.frames.clone()
    }

    /// Close the channel and release the connection.
    ///
    /// Must be invoked on teardown; dropping the handle without calling
    /// this leaks the connection until the producer notices.
    pub async fn disconnect(mut self) {
        if let Some(close_tx) = self.close_tx.take() {
            let _ = close_tx.send(());
        }
        let _ = (&mut self.read_task).await;
    }
}

/// Control endpoint client: pause/resume the upstream capture.
/// Both calls are fire-and-forget; outcomes are logged and nothing more.
#[derive(Clone)]
pub struct ControlClient {
    http: reqwest::Client,
    base_url: String,
}

impl ControlClient {
    pub fn new(
        base_url: impl Into<String>,
        timeout: std::time::Duration,
    ) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Connection(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    pub async fn pause(&self, sid: &str) {
        self.post("/pause", sid).await;
    }

    pub async fn resume(&self, sid: &str) {
        self.post("/play", sid).await;
    }

    async fn post(&self, path: &str, sid: &str) {
        let url = format!("{}{}", self.base_url, path);
        let body = ControlRequest {
            sid: sid.to_string(),
        };
        match self.http.post(&url).json(&body).send().await {
            Ok(response) => debug!(%url, status = %response.status(), "control request sent"),
            Err(e) => warn!(%url, %e, "control request failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_connect_failure_is_a_connection_error() {
        let path = std::env::temp_dir().join(format!("framecast-test-{}.json", Uuid::new_v4()));
        let session = SessionHandle::load_or_create(&path, "alice").unwrap();

        // Nothing listens on this port; connect must fail, not hang
        let result = FrameChannel::connect("ws://127.0.0.1:9", session).await;
        assert!(matches!(result, Err(ClientError::Connection(_))));

        let _ = std::fs::remove_file(&path);
    }
}
