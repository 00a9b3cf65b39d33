//! Overlay item model and error definitions

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use thiserror::Error;
use uuid::Uuid;

/// Stable identifier for an overlay item, assigned at creation or decode.
/// Position in the collection is z-order only, never identity.
pub type OverlayId = Uuid;

/// Errors from overlay collection operations
#[derive(Debug, Error)]
pub enum OverlayError {
    #[error("No overlay item with id {0}")]
    UnknownItem(OverlayId),

    #[error("Malformed image payload: {0}")]
    MalformedPayload(String),
}

/// Committed drag position, signed pixel offsets from the frame's top-left
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

/// Committed resize dimensions in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

/// Configured [min, max] bounds for widget dimensions
#[derive(Debug, Clone, Copy)]
pub struct SizeConstraints {
    pub min: Size,
    pub max: Size,
}

impl SizeConstraints {
    pub fn new(min: (u32, u32), max: (u32, u32)) -> Self {
        Self {
            min: Size {
                width: min.0,
                height: min.1,
            },
            max: Size {
                width: max.0,
                height: max.1,
            },
        }
    }

    /// Clamp both dimensions into the configured range
    pub fn clamp(&self, size: Size) -> Size {
        Size {
            width: size.width.clamp(self.min.width, self.max.width),
            height: size.height.clamp(self.min.height, self.max.height),
        }
    }

    /// Default widget size at creation (the minimum constraint)
    pub fn default_size(&self) -> Size {
        self.min
    }
}

impl Default for SizeConstraints {
    fn default() -> Self {
        Self::new((100, 100), (300, 300))
    }
}

/// Embedded image payload, decoded from its data-URI wire form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    /// Media type, e.g. "image/png"
    pub media_type: String,
    /// Raw image bytes
    pub bytes: Bytes,
}

impl ImagePayload {
    pub fn new(media_type: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            media_type: media_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Parse a self-describing data string ("data:image/png;base64,....")
    pub fn from_data_uri(uri: &str) -> Result<Self, OverlayError> {
        let rest = uri
            .strip_prefix("data:")
            .ok_or_else(|| OverlayError::MalformedPayload("missing data: prefix".to_string()))?;
        let (media_type, encoded) = rest.split_once(";base64,").ok_or_else(|| {
            OverlayError::MalformedPayload("missing ;base64, separator".to_string())
        })?;
        let bytes = BASE64
            .decode(encoded)
            .map_err(|e| OverlayError::MalformedPayload(format!("invalid base64: {}", e)))?;
        Ok(Self {
            media_type: media_type.to_string(),
            bytes: Bytes::from(bytes),
        })
    }

    /// Encode back into the self-describing data string
    pub fn to_data_uri(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.media_type,
            BASE64.encode(&self.bytes)
        )
    }
}

/// Item content: exactly one kind, each carrying only its own fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlayContent {
    /// Literal string shown in the widget
    Text { text: String },
    /// Embedded image; payload is absent while capture/entry is incomplete
    Image { payload: Option<ImagePayload> },
}

impl OverlayContent {
    pub fn kind(&self) -> &'static str {
        match self {
            OverlayContent::Text { .. } => "text",
            OverlayContent::Image { .. } => "image",
        }
    }
}

/// One annotation widget: stable id, content, committed geometry
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayItem {
    pub id: OverlayId,
    pub content: OverlayContent,
    pub position: Position,
    pub size: Size,
}

impl OverlayItem {
    /// Create an item with default geometry (origin, minimum size)
    pub fn new(content: OverlayContent, constraints: &SizeConstraints) -> Self {
        Self {
            id: Uuid::new_v4(),
            content,
            position: Position::default(),
            size: constraints.default_size(),
        }
    }
}
