//! Remote mirroring
//!
//! The owner side lives next to the zone that has the media open: it
//! applies observer commands to the zone and republishes every state
//! change as an update. The observer side holds a mirrored copy of the
//! zone's state and sends commands; it renders nothing until the owner's
//! full-state answer to `startControl` arrives.

pub mod observer;
pub mod owner;

pub use observer::{MirrorObserver, ObserverState};
pub use owner::MirrorOwner;
