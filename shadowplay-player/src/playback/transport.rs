//! Media transport collaborator contract
//!
//! The controller never talks to a real video element; it drives whatever
//! implements [`MediaTransport`]. A transport that is not yet ready
//! reports `None` from [`MediaTransport::current_time`] and the controller
//! simply waits.

use std::sync::Mutex;

/// Control surface the playback controller needs from a media transport
pub trait MediaTransport: Send + Sync {
    /// Current playhead position in milliseconds; `None` until the
    /// transport has initialized
    fn current_time(&self) -> Option<u64>;

    /// Move the playhead. May complete asynchronously in the real
    /// transport; callers latch after seeking rather than waiting.
    fn seek(&self, time_ms: u64);

    fn play(&self);

    fn pause(&self);

    /// Set the playback rate (1.0 = normal speed)
    fn set_rate(&self, rate: f64);
}

/// Deterministic in-process transport for headless zones and tests
///
/// Time does not advance on its own; [`SimulatedTransport::advance`] moves
/// the playhead by wall-milliseconds scaled by the current rate, so a test
/// interleaves advances and controller ticks however it likes.
#[derive(Debug, Default)]
pub struct SimulatedTransport {
    inner: Mutex<SimInner>,
}

#[derive(Debug)]
struct SimInner {
    ready: bool,
    playing: bool,
    rate: f64,
    position_ms: u64,
    seek_count: u64,
}

impl Default for SimInner {
    fn default() -> Self {
        Self {
            ready: true,
            playing: false,
            rate: 1.0,
            position_ms: 0,
            seek_count: 0,
        }
    }
}

impl SimulatedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport that has not finished initializing yet
    pub fn not_ready() -> Self {
        let t = Self::default();
        t.locked().ready = false;
        t
    }

    pub fn set_ready(&self, ready: bool) {
        self.locked().ready = ready;
    }

    /// Advance the playhead by `wall_ms`, scaled by the playback rate.
    /// No-op while paused, matching a real transport.
    pub fn advance(&self, wall_ms: u64) {
        let mut inner = self.locked();
        if inner.playing {
            inner.position_ms += (wall_ms as f64 * inner.rate).round() as u64;
        }
    }

    pub fn position_ms(&self) -> u64 {
        self.locked().position_ms
    }

    pub fn rate(&self) -> f64 {
        self.locked().rate
    }

    pub fn is_playing(&self) -> bool {
        self.locked().playing
    }

    /// Number of seeks issued, for asserting on seek behavior
    pub fn seek_count(&self) -> u64 {
        self.locked().seek_count
    }

    fn locked(&self) -> std::sync::MutexGuard<'_, SimInner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl MediaTransport for SimulatedTransport {
    fn current_time(&self) -> Option<u64> {
        let inner = self.locked();
        inner.ready.then_some(inner.position_ms)
    }

    fn seek(&self, time_ms: u64) {
        let mut inner = self.locked();
        inner.position_ms = time_ms;
        inner.seek_count += 1;
    }

    fn play(&self) {
        self.locked().playing = true;
    }

    fn pause(&self) {
        self.locked().playing = false;
    }

    fn set_rate(&self, rate: f64) {
        self.locked().rate = rate;
    }
}
