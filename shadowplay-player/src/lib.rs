//! # Shadowplay Player
//!
//! The zone player service: subtitle-synchronized playback controller,
//! remote mirroring over the shared duplex channel, and the relay server
//! that carries channel traffic between panes and processes.

pub mod channel;
pub mod playback;
pub mod remote;
pub mod store;
