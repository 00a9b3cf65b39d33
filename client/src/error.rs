//! Client-wide error taxonomy
//!
//! Every failure in the core maps onto one of four classes: channel failures,
//! per-item decode failures, persistence failures, and local validation
//! failures. None of them is fatal to the process; the frame relay and the
//! overlay sync fail independently of each other.

use thiserror::Error;

/// Top-level client error
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("validation error: {0}")]
    Validation(String),
}

impl ClientError {
    /// Short class name, used as a metrics label
    pub fn class(&self) -> &'static str {
        match self {
            ClientError::Connection(_) => "connection",
            ClientError::Decode(_) => "decode",
            ClientError::Persistence(_) => "persistence",
            ClientError::Validation(_) => "validation",
        }
    }
}
