//! Mirror observer: the remote-view half of the remote protocol
//!
//! Holds a local copy of the mirrored zone's state, kept current by
//! applying owner updates as plain assignments. Assignments are naturally
//! idempotent, so the echo of a command the observer itself triggered
//! converges instead of oscillating. Command senders are fire-and-forget;
//! the authoritative confirmation is the owner's update coming back.

use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use shadowplay_common::remote::{ObserverCommand, OwnerUpdate, RemoteMessage, REMOTE_CONTROL_SUBJECT};
use shadowplay_common::segment::Segment;
use shadowplay_common::Result;

use crate::channel::ChannelHandle;

/// Mirrored zone state as the observer knows it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObserverState {
    pub segments: Vec<Segment>,
    pub cursor_index: Option<usize>,
    pub loop_region: Option<Segment>,
    pub playing: bool,
    pub intensive: bool,
    pub strategy_index: usize,
    pub rate: f64,
}

pub struct MirrorObserver {
    zone_id: Uuid,
    channel: ChannelHandle,
    state: Arc<Mutex<ObserverState>>,
    task: JoinHandle<()>,
}

impl MirrorObserver {
    /// Attach to the zone `zone_id`: start applying its updates and send
    /// the `startControl` handshake so the owner publishes its full state
    pub fn attach(zone_id: Uuid, channel: ChannelHandle) -> Result<Self> {
        let state = Arc::new(Mutex::new(ObserverState {
            rate: 1.0,
            ..ObserverState::default()
        }));

        let task = {
            let state = state.clone();
            let mut inbound = channel.subscribe();
            tokio::spawn(async move {
                debug!(zone = %zone_id, "mirror observer started");
                loop {
                    match inbound.recv().await {
                        Ok(envelope) => {
                            if envelope.subject != REMOTE_CONTROL_SUBJECT {
                                continue;
                            }
                            let message: RemoteMessage = match envelope.payload_as() {
                                Ok(message) => message,
                                Err(e) => {
                                    warn!(zone = %zone_id, "dropping unparseable mirror frame: {}", e);
                                    continue;
                                }
                            };
                            // Observers act on updates only, and only for
                            // their own zone
                            let RemoteMessage::Update { to_zone_id, update } = message else {
                                continue;
                            };
                            if to_zone_id != zone_id {
                                continue;
                            }
                            let mut state = match state.lock() {
                                Ok(guard) => guard,
                                Err(poisoned) => poisoned.into_inner(),
                            };
                            apply_update(&mut state, update);
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(zone = %zone_id, skipped, "mirror observer lagged; resyncing on next update");
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    }
                }
                debug!(zone = %zone_id, "mirror observer stopped");
            })
        };

        let observer = Self {
            zone_id,
            channel,
            state,
            task,
        };
        observer.send(ObserverCommand::StartControl)?;
        Ok(observer)
    }

    pub fn zone_id(&self) -> Uuid {
        self.zone_id
    }

    /// Current mirrored state
    pub fn state(&self) -> ObserverState {
        match self.state.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    // Command senders; each round-trips through the owner and comes back
    // as an update

    pub fn seek_time(&self, time_ms: u64) -> Result<()> {
        self.send(ObserverCommand::SeekTime { time_ms })
    }

    pub fn set_subtitles(&self, segments: Vec<Segment>) -> Result<()> {
        self.send(ObserverCommand::SetSubtitles { segments })
    }

    pub fn scroll_to_index(&self, index: usize) -> Result<()> {
        self.send(ObserverCommand::ScrollToIndex { index })
    }

    pub fn looping_subtitle(&self, segment: Option<Segment>) -> Result<()> {
        self.send(ObserverCommand::LoopingSubtitle { segment })
    }

    pub fn set_playing(&self, playing: bool) -> Result<()> {
        self.send(ObserverCommand::PlayingChange { playing })
    }

    pub fn set_intensive(&self, intensive: bool) -> Result<()> {
        self.send(ObserverCommand::IntensiveChange { intensive })
    }

    pub fn set_strategy_index(&self, index: usize) -> Result<()> {
        self.send(ObserverCommand::StrategyIndexChange { index })
    }

    fn send(&self, command: ObserverCommand) -> Result<()> {
        let message = RemoteMessage::Command {
            to_zone_id: self.zone_id,
            command,
        };
        self.channel.publish(REMOTE_CONTROL_SUBJECT, &message)
    }
}

impl Drop for MirrorObserver {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn apply_update(state: &mut ObserverState, update: OwnerUpdate) {
    match update {
        OwnerUpdate::SetSubtitles { segments } => state.segments = segments,
        OwnerUpdate::ScrollToIndex { index } => state.cursor_index = index,
        OwnerUpdate::LoopingSubtitle { segment } => state.loop_region = segment,
        OwnerUpdate::PlayingChange { playing } => state.playing = playing,
        OwnerUpdate::IntensiveChange { intensive } => state.intensive = intensive,
        OwnerUpdate::StrategyIndexChange { index } => state.strategy_index = index,
        OwnerUpdate::RateChange { rate } => state.rate = rate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn updates_apply_idempotently() {
        let mut state = ObserverState::default();
        let update = OwnerUpdate::PlayingChange { playing: true };
        apply_update(&mut state, update.clone());
        let after_once = state.clone();
        apply_update(&mut state, update);
        assert_eq!(state, after_once);
    }

    #[test]
    fn scroll_update_can_clear_the_cursor() {
        let mut state = ObserverState {
            cursor_index: Some(4),
            ..ObserverState::default()
        };
        apply_update(&mut state, OwnerUpdate::ScrollToIndex { index: None });
        assert_eq!(state.cursor_index, None);
    }
}
