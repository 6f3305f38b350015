//! Mirror owner: the zone-side half of the remote protocol
//!
//! Listens on the channel for commands addressed to its zone and applies
//! them through the same [`Zone`] methods local UI uses; listens on the
//! zone's event bus and republishes every change as an update. The
//! `startControl` handshake answers with the full state, newest first in
//! document order, so an observer attaching mid-session converges without
//! any replay.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use shadowplay_common::events::ZoneEvent;
use shadowplay_common::remote::{MirrorSession, ObserverCommand, OwnerUpdate, RemoteMessage, REMOTE_CONTROL_SUBJECT};

use crate::channel::{ChannelHandle, Envelope};
use crate::playback::Zone;

pub struct MirrorOwner {
    zone: Arc<Zone>,
    channel: ChannelHandle,
    session: MirrorSession,
}

impl MirrorOwner {
    /// Start mirroring `zone` on `channel`; runs until the channel closes
    pub fn spawn(zone: Arc<Zone>, channel: ChannelHandle) -> JoinHandle<()> {
        // Subscribe before spawning so a handshake sent right after this
        // call cannot slip past the owner
        let inbound = channel.subscribe();
        let events = zone.subscribe();
        let owner = Self {
            session: MirrorSession::new(zone.zone_id()),
            zone,
            channel,
        };
        tokio::spawn(owner.run(inbound, events))
    }

    async fn run(
        mut self,
        mut inbound: tokio::sync::broadcast::Receiver<Envelope>,
        mut events: tokio::sync::broadcast::Receiver<ZoneEvent>,
    ) {
        debug!(zone = %self.session.zone_id, "mirror owner started");

        loop {
            tokio::select! {
                envelope = inbound.recv() => match envelope {
                    Ok(envelope) => self.handle_envelope(envelope),
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(zone = %self.session.zone_id, skipped, "mirror owner lagged on channel");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                },
                event = events.recv() => match event {
                    Ok(event) => self.handle_event(event),
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(zone = %self.session.zone_id, skipped, "mirror owner lagged on events");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                },
            }
        }

        debug!(zone = %self.session.zone_id, "mirror owner stopped");
    }

    fn handle_envelope(&mut self, envelope: Envelope) {
        if envelope.subject != REMOTE_CONTROL_SUBJECT {
            return;
        }
        let message: RemoteMessage = match envelope.payload_as() {
            Ok(message) => message,
            Err(e) => {
                warn!(zone = %self.session.zone_id, "dropping unparseable mirror frame: {}", e);
                return;
            }
        };
        // Owner only acts on commands; updates on the wire are its own
        // (or another zone's) broadcasts
        let RemoteMessage::Command { to_zone_id, command } = message else {
            return;
        };
        if to_zone_id != self.session.zone_id {
            return;
        }
        self.apply_command(command);
    }

    fn apply_command(&mut self, command: ObserverCommand) {
        match command {
            ObserverCommand::StartControl => {
                info!(zone = %self.session.zone_id, "observer attached");
                self.session.has_active_observer = true;
                self.publish_full_state();
            }
            ObserverCommand::SeekTime { time_ms } => self.zone.seek_to(time_ms),
            ObserverCommand::SetSubtitles { segments } => self.zone.load_segments(segments),
            ObserverCommand::ScrollToIndex { index } => self.zone.jump_to_index(index),
            ObserverCommand::LoopingSubtitle { segment } => match segment {
                Some(segment) => self.zone.start_loop(segment),
                None => self.zone.stop_loop(),
            },
            ObserverCommand::PlayingChange { playing } => self.zone.set_playing(playing),
            ObserverCommand::IntensiveChange { intensive } => self.zone.set_intensive(intensive),
            ObserverCommand::StrategyIndexChange { index } => self.zone.set_strategy_index(index),
        }
    }

    /// Handshake answer: publish everything an observer needs to render,
    /// segments first so later cursor and loop updates resolve against them
    fn publish_full_state(&self) {
        let state = self.zone.state();
        self.publish(OwnerUpdate::SetSubtitles {
            segments: self.zone.segments(),
        });
        self.publish(OwnerUpdate::ScrollToIndex {
            index: state.cursor_index,
        });
        self.publish(OwnerUpdate::LoopingSubtitle {
            segment: self.zone.loop_region(),
        });
        self.publish(OwnerUpdate::PlayingChange { playing: state.playing });
        self.publish(OwnerUpdate::IntensiveChange {
            intensive: state.mode == crate::playback::PlayMode::Intensive,
        });
        self.publish(OwnerUpdate::StrategyIndexChange {
            index: state.intensive_step,
        });
        self.publish(OwnerUpdate::RateChange {
            rate: state.playback_rate,
        });
    }

    fn handle_event(&self, event: ZoneEvent) {
        if event.zone_id() != self.session.zone_id {
            return;
        }
        let update = match event {
            ZoneEvent::SegmentsReplaced { segments, .. } => OwnerUpdate::SetSubtitles { segments },
            ZoneEvent::CursorChanged { index, .. } => OwnerUpdate::ScrollToIndex { index },
            ZoneEvent::LoopChanged { segment, .. } => OwnerUpdate::LoopingSubtitle { segment },
            ZoneEvent::PlayingChanged { playing, .. } => OwnerUpdate::PlayingChange { playing },
            ZoneEvent::IntensiveChanged { intensive, .. } => OwnerUpdate::IntensiveChange { intensive },
            ZoneEvent::StepChanged { step, .. } => OwnerUpdate::StrategyIndexChange { index: step },
            ZoneEvent::RateChanged { rate, .. } => OwnerUpdate::RateChange { rate },
        };
        self.publish(update);
    }

    fn publish(&self, update: OwnerUpdate) {
        let message = RemoteMessage::Update {
            to_zone_id: self.session.zone_id,
            update,
        };
        if let Err(e) = self.channel.publish(REMOTE_CONTROL_SUBJECT, &message) {
            warn!(zone = %self.session.zone_id, "mirror update dropped: {}", e);
        }
    }
}
