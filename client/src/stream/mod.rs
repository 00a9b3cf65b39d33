//! Frame channel subscription and capture control

pub mod client;

pub use client::{ControlClient, FrameChannel};
