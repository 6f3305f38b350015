//! Remote-control wire protocol
//!
//! A media zone can be mirrored: a separate view subscribes to its
//! playback state and issues the same commands as local UI. Messages are
//! closed tagged variants (not loose action/data pairs) so handlers get
//! compile-time exhaustiveness, and every message names its target zone so
//! observers can filter strictly.
//!
//! Delivery is at-most-once with no replay buffer; the owner's full-state
//! republish on `StartControl` is what resynchronizes a late attacher.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::segment::Segment;

/// Channel subject carrying all mirror-protocol traffic
pub const REMOTE_CONTROL_SUBJECT: &str = "remoteControl";

/// Commands an observer sends to the owning zone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "data", rename_all = "camelCase")]
pub enum ObserverCommand {
    /// Handshake: request control; the owner answers with its full state
    StartControl,
    SeekTime { time_ms: u64 },
    SetSubtitles { segments: Vec<Segment> },
    ScrollToIndex { index: usize },
    LoopingSubtitle { segment: Option<Segment> },
    PlayingChange { playing: bool },
    IntensiveChange { intensive: bool },
    StrategyIndexChange { index: usize },
}

/// State broadcasts the owner publishes to its observers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "data", rename_all = "camelCase")]
pub enum OwnerUpdate {
    SetSubtitles { segments: Vec<Segment> },
    ScrollToIndex { index: Option<usize> },
    LoopingSubtitle { segment: Option<Segment> },
    PlayingChange { playing: bool },
    IntensiveChange { intensive: bool },
    StrategyIndexChange { index: usize },
    RateChange { rate: f64 },
}

/// A zone-tagged protocol message, as carried on the channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "camelCase")]
pub enum RemoteMessage {
    /// Observer -> owner
    Command { to_zone_id: Uuid, command: ObserverCommand },
    /// Owner -> observers
    Update { to_zone_id: Uuid, update: OwnerUpdate },
}

impl RemoteMessage {
    /// Zone this message is addressed to
    pub fn to_zone_id(&self) -> Uuid {
        match self {
            RemoteMessage::Command { to_zone_id, .. } | RemoteMessage::Update { to_zone_id, .. } => *to_zone_id,
        }
    }
}

/// Owner-side record of a mirroring session for one zone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorSession {
    pub zone_id: Uuid,
    pub has_active_observer: bool,
}

impl MirrorSession {
    pub fn new(zone_id: Uuid) -> Self {
        Self {
            zone_id,
            has_active_observer: false,
        }
    }
}
