//! Wire types for the frame channel and the persisted overlay records
//!
//! Overlay records keep the legacy field names (`dragX`, `resizeW`, ...) the
//! persistence store already holds, so existing stored state decodes
//! unchanged. The in-memory model converts to and from this shape at the
//! sync boundary.

use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::error::ClientError;
use crate::overlay::{ImagePayload, OverlayContent, OverlayItem, Position, Size};

/// Messages exchanged on the frame channel
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChannelMessage {
    /// Client to producer, sent once on connect: the cached feed locator
    RtspUrl { rtsp_url: String },
    /// Producer to client: one still frame of the live feed
    Frame { sid: String, frame: String },
}

impl ChannelMessage {
    /// Message type name for metrics
    pub fn message_type(&self) -> &'static str {
        match self {
            ChannelMessage::RtspUrl { .. } => "rtsp_url",
            ChannelMessage::Frame { .. } => "frame",
        }
    }
}

/// The freshest frame of the live feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Stream session id assigned by the producer
    pub sid: String,
    /// Base64-encoded JPEG still
    pub data: String,
}

/// Body for the pause/resume control endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlRequest {
    pub sid: String,
}

/// Persisted overlay record, one independently JSON-encoded string per item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlayRecord {
    #[serde(rename = "type")]
    pub kind: RecordKind,
    pub content: Option<String>,
    #[serde(rename = "dragX")]
    pub drag_x: f64,
    #[serde(rename = "dragY")]
    pub drag_y: f64,
    #[serde(rename = "resizeW")]
    pub resize_w: f64,
    #[serde(rename = "resizeH")]
    pub resize_h: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Text,
    Image,
}

impl From<&OverlayItem> for OverlayRecord {
    fn from(item: &OverlayItem) -> Self {
        let (kind, content) = match &item.content {
            OverlayContent::Text { text } => (RecordKind::Text, Some(text.clone())),
            OverlayContent::Image { payload } => (
                RecordKind::Image,
                payload.as_ref().map(|p| p.to_data_uri()),
            ),
        };
        Self {
            kind,
            content,
            drag_x: item.position.x as f64,
            drag_y: item.position.y as f64,
            resize_w: item.size.width as f64,
            resize_h: item.size.height as f64,
        }
    }
}

impl OverlayRecord {
    /// Convert into the in-memory model, minting a fresh stable id.
    /// Positions truncate toward zero; dimensions floor at zero.
    pub fn into_item(self) -> Result<OverlayItem, ClientError> {
        let content = match self.kind {
            RecordKind::Text => OverlayContent::Text {
                text: self.content.unwrap_or_default(),
            },
            RecordKind::Image => OverlayContent::Image {
                payload: match self.content {
                    Some(uri) => Some(
                        ImagePayload::from_data_uri(&uri)
                            .map_err(|e| ClientError::Decode(e.to_string()))?,
                    ),
                    None => None,
                },
            },
        };
        Ok(OverlayItem {
            id: Uuid::new_v4(),
            content,
            position: Position {
                x: self.drag_x as i32,
                y: self.drag_y as i32,
            },
            size: Size {
                width: self.resize_w.max(0.0) as u32,
                height: self.resize_h.max(0.0) as u32,
            },
        })
    }
}

/// Serialize one item into its independently encoded wire string
pub fn encode_item(item: &OverlayItem) -> String {
    serde_json::to_string(&OverlayRecord::from(item))
        .expect("overlay record serialization is infallible")
}

/// Serialize the whole collection, one wire string per item, in z-order
pub fn encode_items(items: &[OverlayItem]) -> Vec<String> {
    items.iter().map(encode_item).collect()
}

/// Decode one wire string into an item
pub fn decode_item(payload: &str) -> Result<OverlayItem, ClientError> {
    let record: OverlayRecord =
        serde_json::from_str(payload).map_err(|e| ClientError::Decode(e.to_string()))?;
    record.into_item()
}

/// Decode a sequence of wire strings, skipping malformed payloads.
/// Returns the decoded items and the number of payloads skipped; a single
/// malformed record never aborts decoding of its siblings.
pub fn decode_items(payloads: &[String]) -> (Vec<OverlayItem>, usize) {
    let mut items = Vec::with_capacity(payloads.len());
    let mut skipped = 0;
    for (index, payload) in payloads.iter().enumerate() {
        match decode_item(payload) {
            Ok(item) => items.push(item),
            Err(e) => {
                warn!(index, %e, "skipping malformed overlay payload");
                skipped += 1;
            }
        }
    }
    (items, skipped)
}
