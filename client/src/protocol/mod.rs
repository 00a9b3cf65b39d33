//! Wire protocol: channel messages and overlay record codec

pub mod messages;

pub use messages::{
    ChannelMessage, ControlRequest, Frame, OverlayRecord, RecordKind, decode_item, decode_items,
    encode_item, encode_items,
};
