//! Playback mode controller
//!
//! One controller per open media zone owns "what the transport should be
//! doing right now": the current mode, the highlighted segment, the loop
//! region, and the intensive replay progress. While playing it is driven
//! by a fixed 50 ms tick that polls the transport's current time and
//! issues seeks and rate changes; every state change is broadcast on the
//! zone's [`EventBus`].
//!
//! The tick body is synchronous ([`PlaybackController::tick_at`]) so tests
//! can drive it deterministically; the async wrapper in
//! [`crate::playback::Zone`] owns the interval timer.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use shadowplay_common::events::{EventBus, ZoneEvent};
use shadowplay_common::segment::Segment;
use shadowplay_common::timeline::Timeline;

use super::strategy::IntensiveStrategy;
use super::transport::MediaTransport;

/// Fixed controller tick interval
pub const TICK_INTERVAL: Duration = Duration::from_millis(50);

/// Suppress tick evaluation for this long after any seek, so the tick
/// handler never races the transport's own asynchronous seek completion
pub const SEEK_LATCH: Duration = Duration::from_millis(500);

/// Looping tolerates the playhead this far before the loop start before
/// seeking; generous slack avoids thrashing on seek latency jitter
const LOOP_LOWER_SLACK_MS: u64 = 1000;

/// Entering looping seeks just past the segment start so the first tick
/// does not immediately re-trigger the lower bound
const LOOP_ENTRY_OFFSET_MS: u64 = 10;

/// Playback mode; Looping and Intensive are mutually exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayMode {
    /// No segments loaded yet
    Idle,
    /// Autoplay-follow: track the segment under the playhead
    Normal,
    /// Replay one segment's span forever
    Looping,
    /// Multi-pass replay of each segment per the intensive strategy
    Intensive,
}

impl std::fmt::Display for PlayMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlayMode::Idle => write!(f, "idle"),
            PlayMode::Normal => write!(f, "normal"),
            PlayMode::Looping => write!(f, "looping"),
            PlayMode::Intensive => write!(f, "intensive"),
        }
    }
}

/// Snapshot of a zone's playback state, the single source of truth
/// mirrored to remote observers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaybackState {
    pub mode: PlayMode,
    pub cursor_index: Option<usize>,
    pub playing: bool,
    pub playback_rate: f64,
    pub intensive_step: usize,
}

/// The per-zone playback state machine
pub struct PlaybackController {
    zone_id: Uuid,
    timeline: Timeline,
    mode: PlayMode,
    playing: bool,
    rate: f64,
    strategy: IntensiveStrategy,
    intensive_step: usize,
    /// Segment the playhead is currently tracking (Normal/Intensive)
    current: Option<usize>,
    /// Seeking-back latch: ticks are no-ops until this instant
    latch_until: Option<Instant>,
    transport: Arc<dyn MediaTransport>,
    bus: EventBus,
}

impl PlaybackController {
    pub fn new(zone_id: Uuid, media_id: impl Into<String>, transport: Arc<dyn MediaTransport>, bus: EventBus) -> Self {
        Self {
            zone_id,
            timeline: Timeline::new(media_id, Vec::new()),
            mode: PlayMode::Idle,
            playing: false,
            rate: 1.0,
            strategy: IntensiveStrategy::default(),
            intensive_step: 0,
            current: None,
            latch_until: None,
            transport,
            bus,
        }
    }

    pub fn zone_id(&self) -> Uuid {
        self.zone_id
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn strategy(&self) -> &IntensiveStrategy {
        &self.strategy
    }

    pub fn set_strategy(&mut self, strategy: IntensiveStrategy) {
        self.strategy = strategy;
        self.intensive_step = 0;
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn state(&self) -> PlaybackState {
        PlaybackState {
            mode: self.mode,
            cursor_index: self.timeline.cursor_index,
            playing: self.playing,
            playback_rate: self.rate,
            intensive_step: self.intensive_step,
        }
    }

    /// Replace the zone's segment sequence (initial load, edit, resync,
    /// or a remote setSubtitles). Leaves Idle once segments exist.
    pub fn set_segments(&mut self, segments: Vec<Segment>) {
        self.timeline.replace_segments(segments);
        self.current = None;
        if self.mode == PlayMode::Idle && !self.timeline.is_empty() {
            self.mode = PlayMode::Normal;
        }
        self.emit(ZoneEvent::SegmentsReplaced {
            zone_id: self.zone_id,
            segments: self.timeline.segments().to_vec(),
            timestamp: chrono::Utc::now(),
        });
    }

    /// Apply an edit to the timeline and rebroadcast the sequence.
    ///
    /// Edits reorder or remove segments, so the tracked-segment index is
    /// invalidated; the next tick re-resolves it from the playhead.
    pub fn edit_timeline<R>(&mut self, edit: impl FnOnce(&mut Timeline) -> R) -> R {
        let result = edit(&mut self.timeline);
        self.current = None;
        self.emit(ZoneEvent::SegmentsReplaced {
            zone_id: self.zone_id,
            segments: self.timeline.segments().to_vec(),
            timestamp: chrono::Utc::now(),
        });
        result
    }

    /// Toggle play/pause. Does not change the mode.
    pub fn set_playing(&mut self, playing: bool) {
        if self.playing == playing {
            return;
        }
        self.playing = playing;
        if playing {
            self.transport.play();
        } else {
            self.transport.pause();
        }
        self.emit(ZoneEvent::PlayingChanged {
            zone_id: self.zone_id,
            playing,
            timestamp: chrono::Utc::now(),
        });
    }

    /// Plain seek (remote seekTime or a local scrub)
    pub fn seek_to(&mut self, time_ms: u64, now: Instant) {
        self.transport.seek(time_ms);
        self.latch(now);
    }

    /// Arm looping on `segment`: seek just inside it and start playing.
    /// Disarms intensive mode; the two are mutually exclusive.
    pub fn start_loop(&mut self, segment: Segment, now: Instant) {
        if self.mode == PlayMode::Intensive {
            self.leave_intensive();
        }
        self.mode = PlayMode::Looping;
        let start = segment.start_ms;
        self.timeline.loop_region = Some(segment.clone());
        self.transport.seek(start + LOOP_ENTRY_OFFSET_MS);
        self.latch(now);
        self.emit(ZoneEvent::LoopChanged {
            zone_id: self.zone_id,
            segment: Some(segment),
            timestamp: chrono::Utc::now(),
        });
        self.set_playing(true);
    }

    /// Disarm looping; no seek on exit
    pub fn stop_loop(&mut self) {
        if self.timeline.loop_region.take().is_none() && self.mode != PlayMode::Looping {
            return;
        }
        if self.mode == PlayMode::Looping {
            self.mode = PlayMode::Normal;
        }
        self.emit(ZoneEvent::LoopChanged {
            zone_id: self.zone_id,
            segment: None,
            timestamp: chrono::Utc::now(),
        });
    }

    /// Toggle intensive replay mode. Entering resets the step index and
    /// disarms looping; leaving restores normal rate.
    pub fn set_intensive(&mut self, intensive: bool) {
        if intensive == (self.mode == PlayMode::Intensive) {
            return;
        }
        if intensive {
            if self.timeline.loop_region.is_some() || self.mode == PlayMode::Looping {
                self.stop_loop();
            }
            self.mode = PlayMode::Intensive;
            self.intensive_step = 0;
            self.current = None;
            self.emit(ZoneEvent::StepChanged {
                zone_id: self.zone_id,
                step: 0,
                timestamp: chrono::Utc::now(),
            });
        } else {
            self.leave_intensive();
        }
        self.emit(ZoneEvent::IntensiveChanged {
            zone_id: self.zone_id,
            intensive,
            timestamp: chrono::Utc::now(),
        });
    }

    /// Jump the intensive strategy to a specific step (remote
    /// strategyIndexChange); saturates at the last step
    pub fn set_strategy_index(&mut self, index: usize) {
        let index = index.min(self.strategy.last_index());
        self.intensive_step = index;
        self.set_rate(self.strategy.step(index).speed);
        self.emit(ZoneEvent::StepChanged {
            zone_id: self.zone_id,
            step: index,
            timestamp: chrono::Utc::now(),
        });
    }

    /// Cursor navigation: jump to a segment by index.
    ///
    /// Always clears intensive progress and resets the rate to 1.0, then
    /// seeks to the target start; if intensive mode is active, step 0 is
    /// re-armed for the new segment.
    pub fn jump_to_index(&mut self, index: usize, now: Instant) {
        let Some(segment) = self.timeline.segments().get(index) else {
            debug!(zone = %self.zone_id, index, "jump to out-of-range segment ignored");
            return;
        };
        let start = segment.start_ms;

        self.intensive_step = 0;
        self.set_rate(1.0);
        self.transport.seek(start);
        self.latch(now);
        self.timeline.cursor_index = Some(index);
        self.current = Some(index);
        self.emit(ZoneEvent::CursorChanged {
            zone_id: self.zone_id,
            index: Some(index),
            timestamp: chrono::Utc::now(),
        });

        if self.mode == PlayMode::Intensive {
            // Re-arm the first pass for the new segment
            self.set_rate(self.strategy.step(0).speed);
            self.emit(ZoneEvent::StepChanged {
                zone_id: self.zone_id,
                step: 0,
                timestamp: chrono::Utc::now(),
            });
        }
    }

    /// One controller tick at the current instant
    pub fn tick(&mut self) {
        self.tick_at(Instant::now());
    }

    /// One controller tick. No-ops while paused, while the transport is
    /// not ready, and while the seeking-back latch is armed.
    pub fn tick_at(&mut self, now: Instant) {
        if !self.playing {
            return;
        }
        let Some(time_ms) = self.transport.current_time() else {
            // Transport not initialized yet; wait for it
            return;
        };
        if let Some(until) = self.latch_until {
            if now < until {
                return;
            }
            self.latch_until = None;
        }

        match self.mode {
            PlayMode::Idle => {}
            PlayMode::Normal => self.tick_normal(time_ms),
            PlayMode::Looping => self.tick_looping(time_ms, now),
            PlayMode::Intensive => self.tick_intensive(time_ms, now),
        }
    }

    /// Normal: keep the cursor on the segment containing the playhead
    fn tick_normal(&mut self, time_ms: u64) {
        let found = self.timeline.segment_at(time_ms);
        if found != self.current {
            self.current = found;
            self.timeline.cursor_index = found;
            self.emit(ZoneEvent::CursorChanged {
                zone_id: self.zone_id,
                index: found,
                timestamp: chrono::Utc::now(),
            });
        }
    }

    /// Looping: keep the playhead inside `[start - slack, end)`
    fn tick_looping(&mut self, time_ms: u64, now: Instant) {
        let Some(region) = self.timeline.loop_region.clone() else {
            return;
        };
        let past_end = time_ms >= region.end_ms;
        let before_window = time_ms + LOOP_LOWER_SLACK_MS < region.start_ms;
        if past_end || before_window {
            self.transport.seek(region.start_ms);
            self.latch(now);
        }
    }

    /// Intensive: walk the strategy over the current segment, then release
    fn tick_intensive(&mut self, time_ms: u64, now: Instant) {
        let Some(index) = self.current else {
            if let Some(index) = self.timeline.segment_at(time_ms) {
                self.arm_intensive(index, now);
            }
            return;
        };
        let Some(segment) = self.timeline.segments().get(index) else {
            self.current = None;
            return;
        };
        let (start, end) = (segment.start_ms, segment.end_ms);
        let last = self.strategy.last_index();

        if time_ms > end.saturating_sub(1) && self.intensive_step < last {
            // Repeat the segment at the next step's speed
            self.intensive_step += 1;
            self.set_rate(self.strategy.step(self.intensive_step).speed);
            self.transport.seek(start);
            self.latch(now);
            self.emit(ZoneEvent::StepChanged {
                zone_id: self.zone_id,
                step: self.intensive_step,
                timestamp: chrono::Utc::now(),
            });
        } else if self.intensive_step >= last && (time_ms + 1 < start || time_ms > end + 1) {
            // Strategy exhausted and the playhead moved on; ready to pick
            // up the next segment on a following tick
            self.current = None;
        }
    }

    /// Begin the intensive pass sequence on segment `index`
    fn arm_intensive(&mut self, index: usize, now: Instant) {
        let Some(segment) = self.timeline.segments().get(index) else {
            return;
        };
        let start = segment.start_ms;
        self.current = Some(index);
        self.timeline.cursor_index = Some(index);
        self.intensive_step = 0;
        self.set_rate(self.strategy.step(0).speed);
        self.transport.seek(start);
        self.latch(now);
        self.emit(ZoneEvent::CursorChanged {
            zone_id: self.zone_id,
            index: Some(index),
            timestamp: chrono::Utc::now(),
        });
        self.emit(ZoneEvent::StepChanged {
            zone_id: self.zone_id,
            step: 0,
            timestamp: chrono::Utc::now(),
        });
    }

    fn leave_intensive(&mut self) {
        self.mode = PlayMode::Normal;
        self.intensive_step = 0;
        self.current = None;
        self.set_rate(1.0);
    }

    fn set_rate(&mut self, rate: f64) {
        if (self.rate - rate).abs() < f64::EPSILON {
            return;
        }
        self.rate = rate;
        self.transport.set_rate(rate);
        self.emit(ZoneEvent::RateChanged {
            zone_id: self.zone_id,
            rate,
            timestamp: chrono::Utc::now(),
        });
    }

    fn latch(&mut self, now: Instant) {
        self.latch_until = Some(now + SEEK_LATCH);
    }

    fn emit(&self, event: ZoneEvent) {
        self.bus.emit_lossy(event);
    }
}
