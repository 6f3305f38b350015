//! Zone playback engine
//!
//! A [`Zone`] is one open media file: a [`PlaybackController`] driven by a
//! background tick task while playing, the transport it controls, and the
//! debounced timeline writer. Commands take `&self` and lock the
//! controller briefly; the tick task does the same, so local UI, remote
//! mirror, and tick never race on controller state.

pub mod controller;
pub mod strategy;
pub mod transport;

pub use controller::{PlayMode, PlaybackController, PlaybackState, SEEK_LATCH, TICK_INTERVAL};
pub use strategy::{IntensiveStep, IntensiveStrategy};
pub use transport::{MediaTransport, SimulatedTransport};

use std::sync::{Arc, Mutex};
use std::time::Instant;

use tokio::task::JoinHandle;
use tracing::debug;
use uuid::Uuid;

use shadowplay_common::events::{EventBus, ZoneEvent};
use shadowplay_common::segment::{Segment, ShiftBound};
use tokio::sync::broadcast;

use crate::store::TimelineSaver;

/// One open media file and its playback machinery
pub struct Zone {
    zone_id: Uuid,
    media_id: String,
    source_file: String,
    controller: Arc<Mutex<PlaybackController>>,
    tick_task: Mutex<Option<JoinHandle<()>>>,
    bus: EventBus,
    saver: Option<TimelineSaver>,
}

impl Zone {
    pub fn new(
        media_id: impl Into<String>,
        source_file: impl Into<String>,
        transport: Arc<dyn MediaTransport>,
        bus: EventBus,
        saver: Option<TimelineSaver>,
    ) -> Self {
        let zone_id = Uuid::new_v4();
        let media_id = media_id.into();
        let controller = PlaybackController::new(zone_id, media_id.clone(), transport, bus.clone());
        Self {
            zone_id,
            media_id,
            source_file: source_file.into(),
            controller: Arc::new(Mutex::new(controller)),
            tick_task: Mutex::new(None),
            bus,
            saver,
        }
    }

    pub fn zone_id(&self) -> Uuid {
        self.zone_id
    }

    pub fn media_id(&self) -> &str {
        &self.media_id
    }

    pub fn state(&self) -> PlaybackState {
        self.lock().state()
    }

    pub fn segments(&self) -> Vec<Segment> {
        self.lock().timeline().segments().to_vec()
    }

    pub fn loop_region(&self) -> Option<Segment> {
        self.lock().timeline().loop_region.clone()
    }

    pub fn strategy(&self) -> IntensiveStrategy {
        self.lock().strategy().clone()
    }

    /// Subscribe to this zone's event stream
    pub fn subscribe(&self) -> broadcast::Receiver<ZoneEvent> {
        self.bus.subscribe()
    }

    /// Replace the segment sequence (initial load or resync); persisted
    pub fn load_segments(&self, segments: Vec<Segment>) {
        self.lock().set_segments(segments);
        self.persist();
    }

    /// Start playback and the tick loop
    pub fn play(&self) {
        self.lock().set_playing(true);
        self.spawn_tick_task();
    }

    /// Pause playback and stop the tick loop
    pub fn pause(&self) {
        self.lock().set_playing(false);
        self.abort_tick_task();
    }

    pub fn set_playing(&self, playing: bool) {
        if playing {
            self.play();
        } else {
            self.pause();
        }
    }

    pub fn seek_to(&self, time_ms: u64) {
        self.lock().seek_to(time_ms, Instant::now());
    }

    pub fn start_loop(&self, segment: Segment) {
        self.lock().start_loop(segment, Instant::now());
        // start_loop forces playing; make sure the tick loop is running
        self.spawn_tick_task();
    }

    pub fn stop_loop(&self) {
        self.lock().stop_loop();
    }

    pub fn set_intensive(&self, intensive: bool) {
        self.lock().set_intensive(intensive);
    }

    pub fn set_strategy_index(&self, index: usize) {
        self.lock().set_strategy_index(index);
    }

    pub fn set_strategy(&self, strategy: IntensiveStrategy) {
        self.lock().set_strategy(strategy);
    }

    pub fn jump_to_index(&self, index: usize) {
        self.lock().jump_to_index(index, Instant::now());
    }

    // Timeline edits; each rebroadcasts the sequence and persists

    pub fn trim_start(&self, index: usize, start_ms: u64) {
        self.lock().edit_timeline(|tl| tl.trim_start(index, start_ms));
        self.persist();
    }

    pub fn trim_end(&self, index: usize, end_ms: u64) {
        self.lock().edit_timeline(|tl| tl.trim_end(index, end_ms));
        self.persist();
    }

    pub fn merge_with_next(&self, index: usize) {
        self.lock().edit_timeline(|tl| tl.merge_with_next(index));
        self.persist();
    }

    pub fn delete_segment(&self, index: usize) {
        self.lock().edit_timeline(|tl| tl.delete(index));
        self.persist();
    }

    pub fn shift_from(&self, index: usize, delta_ms: i64, bound: ShiftBound) {
        self.lock().edit_timeline(|tl| tl.shift_from(index, delta_ms, bound));
        self.persist();
    }

    /// Collapse over-fragmented runs; returns the number of merges
    pub fn auto_merge(&self) -> usize {
        let count = self.lock().edit_timeline(|tl| tl.auto_merge());
        if count > 0 {
            self.persist();
        }
        count
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PlaybackController> {
        // Controller methods never panic while holding the lock
        match self.controller.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn persist(&self) {
        if let Some(saver) = &self.saver {
            let segments = self.lock().timeline().segments().to_vec();
            saver.submit(self.media_id.clone(), self.source_file.clone(), segments);
        }
    }

    fn spawn_tick_task(&self) {
        let mut slot = match self.tick_task.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if slot.as_ref().is_some_and(|h| !h.is_finished()) {
            return;
        }
        let controller = self.controller.clone();
        let zone_id = self.zone_id;
        *slot = Some(tokio::spawn(async move {
            debug!(zone = %zone_id, "tick loop started");
            let mut interval = tokio::time::interval(TICK_INTERVAL);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                match controller.lock() {
                    Ok(mut ctl) => ctl.tick(),
                    Err(poisoned) => poisoned.into_inner().tick(),
                }
            }
        }));
    }

    fn abort_tick_task(&self) {
        let mut slot = match self.tick_task.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(handle) = slot.take() {
            handle.abort();
            debug!(zone = %self.zone_id, "tick loop stopped");
        }
    }
}

impl Drop for Zone {
    fn drop(&mut self) {
        self.abort_tick_task();
    }
}
