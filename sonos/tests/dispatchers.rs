use std::sync::{Arc, Mutex};

use sonos_upnp::device::DeviceRegistry;
use sonos_upnp::events::{
    AvTransportDispatcher, DispatchTarget, QueueDispatcher, RenderingControlDispatcher, ZoneTopologyDispatcher,
};
use sonos_upnp::streaming::{InboundEvent, UpnpEventListener};
use sonos_upnp::{AvTransportEvent, PlayMode, PlayState, QueueEvent, SonosEventListener, TrackInfo};

const DEVICE: &str = "192.168.1.20";

#[derive(Default)]
struct Recorder {
    calls: Mutex<Vec<String>>,
}

impl Recorder {
    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.calls.lock().unwrap())
    }
}

impl SonosEventListener for Recorder {
    fn volume_changed(&self, volume: u8) {
        self.record(format!("volume {}", volume));
    }

    fn play_state_changed(&self, state: PlayState) {
        self.record(format!("state {}", state.as_str()));
    }

    fn play_mode_changed(&self, mode: PlayMode) {
        self.record(format!("mode {}", mode.as_str()));
    }

    fn queue_changed(&self, queues: &[QueueEvent]) {
        let ids: Vec<String> = queues.iter().map(|q| format!("{}@{}", q.queue_id, q.update_id)).collect();
        self.record(format!("queue {}", ids.join(",")));
    }

    fn track_changed(&self, track: &TrackInfo) {
        self.record(format!("track {}", track.uri));
    }

    fn treble_changed(&self, treble: i8) {
        self.record(format!("treble {}", treble));
    }

    fn bass_changed(&self, bass: i8) {
        self.record(format!("bass {}", bass));
    }

    fn loudness_changed(&self, loudness: bool) {
        self.record(format!("loudness {}", loudness));
    }

    fn av_transport_event(&self, event: &AvTransportEvent) {
        self.record(format!("transport {}", event.current_track.queue_index));
    }

    fn device_connected(&self, device_name: &str) {
        self.record(format!("connected {}", device_name));
    }

    fn device_disconnected(&self, device_name: &str) {
        self.record(format!("disconnected {}", device_name));
    }

    fn group_changed(&self, members: &[String]) {
        let mut members = members.to_vec();
        members.sort();
        self.record(format!("group {}", members.join(",")));
    }
}

fn target_with(name: Option<&str>) -> (DispatchTarget, Arc<Recorder>) {
    let registry = Arc::new(DeviceRegistry::new());
    let entry = registry.entry(DEVICE);
    if let Some(name) = name {
        entry.set_device_name(name);
    }

    let recorder = Arc::new(Recorder::default());
    entry.add_listener(recorder.clone()).unwrap();
    (DispatchTarget::new(registry, DEVICE), recorder)
}

fn last_change(seq: u32, instance: &str) -> InboundEvent {
    let body = format!(
        r#"<e:propertyset xmlns:e="urn:schemas-upnp-org:event-1-0"><e:property><LastChange><Event><InstanceID val="0">{}</InstanceID></Event></LastChange></e:property></e:propertyset>"#,
        instance
    );
    InboundEvent::from_body("uuid:RINCON_TEST_sub", seq, &body).unwrap()
}

fn topology(seq: u32, groups: &[&[&str]]) -> InboundEvent {
    let mut xml = String::new();
    for (index, members) in groups.iter().enumerate() {
        xml.push_str(&format!("<ZoneGroup Coordinator=\"RINCON_{}\" ID=\"RINCON_{}:1\">", index, index));
        for name in members.iter() {
            xml.push_str(&format!("<ZoneGroupMember UUID=\"RINCON_{}\" ZoneName=\"{}\"/>", name, name));
        }
        xml.push_str("</ZoneGroup>");
    }
    let body = format!(
        r#"<e:propertyset xmlns:e="urn:schemas-upnp-org:event-1-0"><e:property><ZoneGroupState><ZoneGroupState><ZoneGroups>{}</ZoneGroups></ZoneGroupState></ZoneGroupState></e:property></e:propertyset>"#,
        xml
    );
    InboundEvent::from_body("uuid:RINCON_TEST_zgt", seq, &body).unwrap()
}

fn transport(state: &str, mode: &str, track: u32, uri: &str) -> String {
    format!(
        r#"<TransportState val="{}"/><CurrentPlayMode val="{}"/><CurrentTrack val="{}"/><NumberOfTracks val="10"/><CurrentTrackURI val="{}"/><CurrentTrackDuration val="0:03:00"/><CurrentTrackMetaData val=""/>"#,
        state, mode, track, uri
    )
}

#[test]
fn test_topology_reports_each_disconnect_once() {
    let (target, recorder) = target_with(Some("Kitchen"));
    let dispatcher = ZoneTopologyDispatcher::new(target);

    dispatcher.on_initial_event(&topology(0, &[&["Kitchen"], &["Den"], &["Office"]]));
    assert!(recorder.take().is_empty());

    dispatcher.on_event(&topology(1, &[&["Kitchen"], &["Den"]]));
    assert_eq!(recorder.take(), vec!["disconnected Office"]);

    dispatcher.on_event(&topology(2, &[&["Kitchen"], &["Den"]]));
    assert!(recorder.take().is_empty());

    dispatcher.on_event(&topology(3, &[&["Kitchen"], &["Den"], &["Office"]]));
    assert_eq!(recorder.take(), vec!["connected Office"]);
}

#[test]
fn test_topology_reports_group_membership_changes() {
    let (target, recorder) = target_with(Some("Kitchen"));
    let dispatcher = ZoneTopologyDispatcher::new(target);

    dispatcher.on_initial_event(&topology(0, &[&["Kitchen"], &["Den"]]));

    dispatcher.on_event(&topology(1, &[&["Den", "Kitchen"]]));
    assert_eq!(recorder.take(), vec!["group Den,Kitchen"]);

    // same members in another order
    dispatcher.on_event(&topology(2, &[&["Kitchen", "Den"]]));
    assert!(recorder.take().is_empty());

    dispatcher.on_event(&topology(3, &[&["Kitchen"], &["Den"]]));
    assert_eq!(recorder.take(), vec!["group Kitchen"]);
}

#[test]
fn test_topology_missing_own_device_keeps_previous_group() {
    let (target, recorder) = target_with(Some("Kitchen"));
    let dispatcher = ZoneTopologyDispatcher::new(target);

    dispatcher.on_initial_event(&topology(0, &[&["Kitchen", "Den"], &["Office"]]));

    // Kitchen briefly missing from the reported topology
    dispatcher.on_event(&topology(1, &[&["Den"], &["Office"]]));
    assert_eq!(recorder.take(), vec!["disconnected Kitchen"]);

    dispatcher.on_event(&topology(2, &[&["Kitchen"], &["Den"], &["Office"]]));
    assert_eq!(recorder.take(), vec!["connected Kitchen", "group Kitchen"]);
}

#[test]
fn test_topology_without_device_name_skips_group_changes() {
    let (target, recorder) = target_with(None);
    let dispatcher = ZoneTopologyDispatcher::new(target);

    dispatcher.on_initial_event(&topology(0, &[&["Kitchen"], &["Den"]]));
    dispatcher.on_event(&topology(1, &[&["Den", "Kitchen"], &["Office"]]));

    assert_eq!(recorder.take(), vec!["connected Office"]);
}

#[test]
fn test_master_volume_is_reported() {
    let (target, recorder) = target_with(Some("Kitchen"));
    let dispatcher = RenderingControlDispatcher::new(target);

    dispatcher.on_event(&last_change(
        1,
        r#"<Volume channel="Master" val="35"/><Volume channel="LF" val="100"/><Volume channel="RF" val="100"/>"#,
    ));
    assert_eq!(recorder.take(), vec!["volume 35"]);

    dispatcher.on_event(&last_change(2, r#"<Volume channel="LF" val="80"/>"#));
    assert!(recorder.take().is_empty());
}

#[test]
fn test_rendering_changes_in_document_order() {
    let (target, recorder) = target_with(Some("Kitchen"));
    let dispatcher = RenderingControlDispatcher::new(target);

    dispatcher.on_event(&last_change(
        1,
        r#"<Bass val="-3"/><Treble val="4"/><Loudness channel="Master" val="1"/><Mute channel="Master" val="0"/>"#,
    ));
    assert_eq!(recorder.take(), vec!["bass -3", "treble 4", "loudness true"]);
}

#[test]
fn test_initial_rendering_state_is_not_a_change() {
    let (target, recorder) = target_with(Some("Kitchen"));
    let dispatcher = RenderingControlDispatcher::new(target);

    dispatcher.on_initial_event(&last_change(0, r#"<Volume channel="Master" val="20"/>"#));
    assert!(recorder.take().is_empty());
}

#[test]
fn test_transport_changes_are_diffed() {
    let (target, recorder) = target_with(Some("Kitchen"));
    let dispatcher = AvTransportDispatcher::new(target);

    dispatcher.on_initial_event(&last_change(0, &transport("PLAYING", "NORMAL", 1, "x-file-cifs://a.mp3")));
    assert!(recorder.take().is_empty());

    // nothing changed, only the raw event
    dispatcher.on_event(&last_change(1, &transport("PLAYING", "NORMAL", 1, "x-file-cifs://a.mp3")));
    assert_eq!(recorder.take(), vec!["transport 1"]);

    dispatcher.on_event(&last_change(2, &transport("PAUSED_PLAYBACK", "SHUFFLE", 2, "x-file-cifs://b.mp3")));
    assert_eq!(
        recorder.take(),
        vec![
            "track x-file-cifs://b.mp3",
            "mode SHUFFLE",
            "state PAUSED_PLAYBACK",
            "transport 2",
        ]
    );
}

#[test]
fn test_oversized_track_duration_is_tolerated() {
    let (target, recorder) = target_with(Some("Kitchen"));
    let dispatcher = AvTransportDispatcher::new(target);

    let instance = transport("PLAYING", "NORMAL", 1, "x-file-cifs://a.mp3").replace("0:03:00", "2000000:00:00");
    dispatcher.on_event(&last_change(1, &instance));
    assert_eq!(recorder.take(), vec!["track x-file-cifs://a.mp3", "mode NORMAL", "state PLAYING", "transport 1"]);
}

#[test]
fn test_incomplete_transport_event_is_dropped() {
    let (target, recorder) = target_with(Some("Kitchen"));
    let dispatcher = AvTransportDispatcher::new(target);

    dispatcher.on_event(&last_change(1, r#"<CurrentPlayMode val="NORMAL"/>"#));
    dispatcher.on_event(&last_change(2, &transport("PLAYING", "NORMAL", 1, "x-file-cifs://a.mp3").replace("val=\"1\"", "val=\"one\"")));
    assert!(recorder.take().is_empty());
}

#[test]
fn test_queue_change_is_one_callback_per_event() {
    let (target, recorder) = target_with(Some("Kitchen"));
    let dispatcher = QueueDispatcher::new(target);

    let body = r#"<e:propertyset xmlns:e="urn:schemas-upnp-org:event-1-0"><e:property><LastChange><Event><QueueID val="0"><UpdateID val="12"/></QueueID><QueueID val="3"><UpdateID val="4"/><Curated val="0"/></QueueID></Event></LastChange></e:property></e:propertyset>"#;
    dispatcher.on_event(&InboundEvent::from_body("uuid:RINCON_TEST_q", 5, body).unwrap());

    assert_eq!(recorder.take(), vec!["queue 0@12,3@4"]);
}

#[test]
fn test_listeners_added_later_receive_later_events() {
    let registry = Arc::new(DeviceRegistry::new());
    let entry = registry.entry(DEVICE);
    let dispatcher = RenderingControlDispatcher::new(DispatchTarget::new(Arc::clone(&registry), DEVICE));

    dispatcher.on_event(&last_change(1, r#"<Volume channel="Master" val="10"/>"#));

    let recorder = Arc::new(Recorder::default());
    let id = entry.add_listener(recorder.clone()).unwrap();
    dispatcher.on_event(&last_change(2, r#"<Volume channel="Master" val="11"/>"#));
    assert_eq!(recorder.take(), vec!["volume 11"]);

    entry.remove_listener(id);
    dispatcher.on_event(&last_change(3, r#"<Volume channel="Master" val="12"/>"#));
    assert!(recorder.take().is_empty());
}
