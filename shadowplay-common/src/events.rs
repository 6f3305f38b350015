//! Event types for the Shadowplay zone event system
//!
//! Every open media zone owns one playback controller; state changes it
//! makes are broadcast as [`ZoneEvent`]s on an [`EventBus`]. The mirror
//! owner subscribes to the bus and relays events to remote observers, so
//! there is no hidden cross-zone coupling: every event names its zone.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::segment::Segment;

/// Shadowplay zone events
///
/// Broadcast via [`EventBus`]; serializable so they can cross process
/// boundaries unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ZoneEvent {
    /// The zone's segment sequence was replaced (load, edit, resync)
    SegmentsReplaced {
        zone_id: Uuid,
        segments: Vec<Segment>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The highlighted segment changed (None = playhead between segments)
    CursorChanged {
        zone_id: Uuid,
        index: Option<usize>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Loop region armed (Some) or disarmed (None)
    LoopChanged {
        zone_id: Uuid,
        segment: Option<Segment>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Play/pause toggled
    PlayingChanged {
        zone_id: Uuid,
        playing: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Intensive replay mode toggled
    IntensiveChanged {
        zone_id: Uuid,
        intensive: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Intensive strategy advanced to a new step
    StepChanged {
        zone_id: Uuid,
        step: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Transport playback rate changed
    RateChanged {
        zone_id: Uuid,
        rate: f64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl ZoneEvent {
    /// Get event type as string for filtering
    pub fn event_type(&self) -> &str {
        match self {
            ZoneEvent::SegmentsReplaced { .. } => "SegmentsReplaced",
            ZoneEvent::CursorChanged { .. } => "CursorChanged",
            ZoneEvent::LoopChanged { .. } => "LoopChanged",
            ZoneEvent::PlayingChanged { .. } => "PlayingChanged",
            ZoneEvent::IntensiveChanged { .. } => "IntensiveChanged",
            ZoneEvent::StepChanged { .. } => "StepChanged",
            ZoneEvent::RateChanged { .. } => "RateChanged",
        }
    }

    /// Zone this event belongs to
    pub fn zone_id(&self) -> Uuid {
        match self {
            ZoneEvent::SegmentsReplaced { zone_id, .. }
            | ZoneEvent::CursorChanged { zone_id, .. }
            | ZoneEvent::LoopChanged { zone_id, .. }
            | ZoneEvent::PlayingChanged { zone_id, .. }
            | ZoneEvent::IntensiveChanged { zone_id, .. }
            | ZoneEvent::StepChanged { zone_id, .. }
            | ZoneEvent::RateChanged { zone_id, .. } => *zone_id,
        }
    }
}

/// Central event distribution bus for zone events
///
/// Uses tokio::broadcast internally: non-blocking publish, any number of
/// concurrent subscribers, automatic cleanup when subscribers drop.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ZoneEvent>,
    capacity: usize,
}

impl EventBus {
    /// Create a new EventBus with the given channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events. Events emitted before subscription
    /// are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<ZoneEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers.
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    #[allow(clippy::result_large_err)]
    pub fn emit(&self, event: ZoneEvent) -> Result<usize, broadcast::error::SendError<ZoneEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring whether anyone is listening. Used for
    /// high-frequency updates where a missed event is harmless.
    pub fn emit_lossy(&self, event: ZoneEvent) {
        let _ = self.tx.send(event);
    }

    /// Current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bus_delivers_to_every_subscriber() {
        let bus = EventBus::new(16);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        let zone_id = Uuid::new_v4();
        bus.emit(ZoneEvent::PlayingChanged {
            zone_id,
            playing: true,
            timestamp: chrono::Utc::now(),
        })
        .expect("emit should succeed");

        let a = rx1.try_recv().expect("rx1 should receive");
        let b = rx2.try_recv().expect("rx2 should receive");
        assert_eq!(a.event_type(), "PlayingChanged");
        assert_eq!(b.zone_id(), zone_id);
    }

    #[test]
    fn emit_lossy_never_panics_without_subscribers() {
        let bus = EventBus::new(2);
        for step in 0..10 {
            bus.emit_lossy(ZoneEvent::StepChanged {
                zone_id: Uuid::new_v4(),
                step,
                timestamp: chrono::Utc::now(),
            });
        }
        assert_eq!(bus.capacity(), 2);
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let event = ZoneEvent::CursorChanged {
            zone_id: Uuid::new_v4(),
            index: Some(3),
            timestamp: chrono::Utc::now(),
        };
        let json = serde_json::to_string(&event).expect("serialize");
        assert!(json.contains("\"type\":\"CursorChanged\""));
        assert!(json.contains("\"index\":3"));
    }
}
