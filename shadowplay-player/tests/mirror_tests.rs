//! Owner/observer mirroring over an in-process loopback channel

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use shadowplay_common::events::EventBus;
use shadowplay_common::segment::Segment;
use shadowplay_player::channel::ChannelHandle;
use shadowplay_player::playback::{SimulatedTransport, Zone};
use shadowplay_player::remote::{MirrorObserver, MirrorOwner};

fn seg(start: u64, end: u64) -> Segment {
    Segment::new(start, end, vec!["line".into()], "ep01.srt")
}

fn zone_with(segments: Vec<Segment>) -> Arc<Zone> {
    let transport = Arc::new(SimulatedTransport::new());
    let zone = Arc::new(Zone::new("ep01", "ep01.srt", transport, EventBus::new(256), None));
    zone.load_segments(segments);
    zone
}

/// Poll until `predicate` holds or the deadline passes
async fn wait_for(mut predicate: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(3);
    while !predicate() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not reached within deadline"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn attaching_observer_receives_the_full_snapshot() {
    let zone = zone_with(vec![seg(0, 1000), seg(2000, 3000)]);
    zone.start_loop(zone.segments()[1].clone());
    let expected_segments = zone.segments();

    let channel = ChannelHandle::loopback();
    let _owner = MirrorOwner::spawn(zone.clone(), channel.clone());
    let observer = MirrorObserver::attach(zone.zone_id(), channel).expect("attach");

    // Playing is published after segments and loop region, so once it is
    // visible the earlier snapshot entries have been applied too
    wait_for(|| observer.state().playing).await;
    let state = observer.state();
    assert_eq!(state.segments, expected_segments);
    assert_eq!(state.loop_region.as_ref().map(|s| s.start_ms), Some(2000));
}

#[tokio::test]
async fn observer_commands_drive_the_zone_and_echo_back() {
    let zone = zone_with(vec![seg(0, 1000), seg(2000, 3000)]);
    let channel = ChannelHandle::loopback();
    let _owner = MirrorOwner::spawn(zone.clone(), channel.clone());
    let observer = MirrorObserver::attach(zone.zone_id(), channel).expect("attach");
    wait_for(|| observer.state().segments.len() == 2).await;

    observer.set_intensive(true).expect("send");
    wait_for(|| observer.state().intensive).await;
    assert_eq!(
        zone.state().mode,
        shadowplay_player::playback::PlayMode::Intensive,
        "command applied on the owning zone"
    );

    observer.scroll_to_index(1).expect("send");
    wait_for(|| observer.state().cursor_index == Some(1)).await;
    assert_eq!(zone.state().cursor_index, Some(1));
}

#[tokio::test]
async fn repeated_commands_converge_instead_of_oscillating() {
    let zone = zone_with(vec![seg(0, 1000)]);
    let channel = ChannelHandle::loopback();
    let _owner = MirrorOwner::spawn(zone.clone(), channel.clone());
    let observer = MirrorObserver::attach(zone.zone_id(), channel).expect("attach");
    wait_for(|| observer.state().segments.len() == 1).await;

    // The same command twice: the second is a no-op on the owner and its
    // echo re-applies the same value on the observer
    observer.set_playing(true).expect("send");
    observer.set_playing(true).expect("send");
    wait_for(|| observer.state().playing).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(observer.state().playing);
    assert!(zone.state().playing);
}

#[tokio::test]
async fn observers_ignore_traffic_for_other_zones() {
    let zone = zone_with(vec![seg(0, 1000), seg(2000, 3000)]);
    let channel = ChannelHandle::loopback();
    let _owner = MirrorOwner::spawn(zone.clone(), channel.clone());

    let attached = MirrorObserver::attach(zone.zone_id(), channel.clone()).expect("attach");
    let stranger = MirrorObserver::attach(Uuid::new_v4(), channel).expect("attach");

    wait_for(|| attached.state().segments.len() == 2).await;
    zone.set_intensive(true);
    wait_for(|| attached.state().intensive).await;

    let state = stranger.state();
    assert!(state.segments.is_empty(), "stranger saw another zone's snapshot");
    assert!(!state.intensive, "stranger saw another zone's update");
}

#[tokio::test]
async fn subtitle_edits_propagate_to_the_observer() {
    let zone = zone_with(vec![seg(0, 1000), seg(900, 2000)]);
    let channel = ChannelHandle::loopback();
    let _owner = MirrorOwner::spawn(zone.clone(), channel.clone());
    let observer = MirrorObserver::attach(zone.zone_id(), channel).expect("attach");
    wait_for(|| observer.state().segments.len() == 2).await;

    zone.merge_with_next(0);
    wait_for(|| observer.state().segments.len() == 1).await;
    let merged = &observer.state().segments[0];
    assert_eq!(merged.start_ms, 0);
    assert_eq!(merged.end_ms, 2000);
}
