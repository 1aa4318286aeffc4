use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use mockito::Matcher;
use sonos_upnp::streaming::SubscriptionConfig;
use sonos_upnp::transport::soap::SoapConfig;
use sonos_upnp::{CancellationToken, ControlPoint, PlayMode, PlayState, SonosDevice, SonosError, SonosEventListener};

const AV_TRANSPORT: &str = "/MediaRenderer/AVTransport/Control";
const RENDERING_CONTROL: &str = "/MediaRenderer/RenderingControl/Control";

const STATUS_ZP: &str = "<ZPSupportInfo><ZPInfo><ZoneName>Kitchen</ZoneName><LocalUID>RINCON_000E58A0123401400</LocalUID>\
    <SerialNumber>00-0E-58-A0-12-34:5</SerialNumber><SoftwareVersion>79.1-56030</SoftwareVersion>\
    <IPAddress>127.0.0.1</IPAddress></ZPInfo></ZPSupportInfo>";

fn device_for(server: &mockito::ServerGuard) -> SonosDevice {
    let port = server.socket_address().port();
    let subscription = SubscriptionConfig::default()
        .with_callback_address(IpAddr::V4(Ipv4Addr::LOCALHOST))
        .with_device_port(port)
        .unwrap();
    let soap = SoapConfig::default().with_port(port).unwrap();
    let control_point = Arc::new(ControlPoint::with_soap_config(subscription, soap).unwrap());
    SonosDevice::from_ip(IpAddr::V4(Ipv4Addr::LOCALHOST), control_point)
}

#[test]
fn test_set_volume_is_clamped() {
    let mut server = mockito::Server::new();
    let loud = server
        .mock("POST", RENDERING_CONTROL)
        .match_body(Matcher::Regex("<DesiredVolume>100</DesiredVolume>".to_string()))
        .with_status(200)
        .with_body("<u:SetVolumeResponse/>")
        .create();
    let quiet = server
        .mock("POST", RENDERING_CONTROL)
        .match_body(Matcher::Regex("<DesiredVolume>0</DesiredVolume>".to_string()))
        .with_status(200)
        .with_body("<u:SetVolumeResponse/>")
        .create();

    let device = device_for(&server);
    device.set_volume(150).unwrap();
    device.set_volume(-4).unwrap();

    loud.assert();
    quiet.assert();
}

#[test]
fn test_volume_is_read() {
    let mut server = mockito::Server::new();
    server
        .mock("POST", RENDERING_CONTROL)
        .match_header("SOAPACTION", "urn:schemas-upnp-org:service:RenderingControl:1#GetVolume")
        .with_status(200)
        .with_body("<u:GetVolumeResponse><CurrentVolume>42</CurrentVolume></u:GetVolumeResponse>")
        .create();

    assert_eq!(device_for(&server).volume().unwrap(), 42);
}

#[test]
fn test_eq_arguments_are_validated_without_network() {
    let mut server = mockito::Server::new();
    let untouched = server.mock("POST", RENDERING_CONTROL).expect(0).create();

    let device = device_for(&server);
    assert!(matches!(device.set_bass(11), Err(SonosError::InvalidArgument(_))));
    assert!(matches!(device.set_bass(-11), Err(SonosError::InvalidArgument(_))));
    assert!(matches!(device.set_treble(12), Err(SonosError::InvalidArgument(_))));

    untouched.assert();
}

#[test]
fn test_set_bass_within_range() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", RENDERING_CONTROL)
        .match_body(Matcher::Regex("<DesiredBass>-10</DesiredBass>".to_string()))
        .with_status(200)
        .with_body("<u:SetBassResponse/>")
        .create();

    device_for(&server).set_bass(-10).unwrap();
    mock.assert();
}

#[test]
fn test_negative_queue_index_is_rejected_without_network() {
    let mut server = mockito::Server::new();
    let untouched = server.mock("POST", AV_TRANSPORT).expect(0).create();
    let status = server.mock("GET", "/status/zp").expect(0).create();

    let device = device_for(&server);
    assert!(matches!(device.play_from_queue(-1), Err(SonosError::InvalidArgument(_))));
    assert!(matches!(device.remove_from_queue(-3), Err(SonosError::InvalidArgument(_))));

    untouched.assert();
    status.assert();
}

#[test]
fn test_current_track_info_is_parsed() {
    let mut server = mockito::Server::new();
    server
        .mock("POST", AV_TRANSPORT)
        .match_header("SOAPACTION", "urn:schemas-upnp-org:service:AVTransport:1#GetPositionInfo")
        .with_status(200)
        .with_body(
            "<s:Envelope><s:Body><u:GetPositionInfoResponse><Track>2</Track><TrackDuration>0:03:25</TrackDuration>\
             <TrackMetaData>&lt;DIDL-Lite&gt;&lt;item id=&quot;-1&quot;&gt;&lt;dc:title&gt;Heroes&lt;/dc:title&gt;\
             &lt;dc:creator&gt;David Bowie&lt;/dc:creator&gt;&lt;upnp:album&gt;Heroes&lt;/upnp:album&gt;\
             &lt;/item&gt;&lt;/DIDL-Lite&gt;</TrackMetaData><TrackURI>x-file-cifs://nas/heroes.flac</TrackURI>\
             <RelTime>0:01:00</RelTime></u:GetPositionInfoResponse></s:Body></s:Envelope>",
        )
        .create();

    let track = device_for(&server).current_track_info().unwrap();
    assert_eq!(track.queue_index, 2);
    assert_eq!(track.duration, 205);
    assert_eq!(track.position, 60);
    assert_eq!(track.uri, "x-file-cifs://nas/heroes.flac");
    assert_eq!(track.metadata.title, "Heroes");
    assert_eq!(track.metadata.creator, "David Bowie");
    assert_eq!(track.metadata.album, "Heroes");
}

#[test]
fn test_track_titled_error_code_is_not_a_fault() {
    let mut server = mockito::Server::new();
    server
        .mock("POST", AV_TRANSPORT)
        .match_header("SOAPACTION", "urn:schemas-upnp-org:service:AVTransport:1#GetPositionInfo")
        .with_status(200)
        .with_body(
            "<s:Envelope><s:Body><u:GetPositionInfoResponse><Track>4</Track><TrackDuration>0:02:10</TrackDuration>\
             <TrackMetaData>&lt;DIDL-Lite&gt;&lt;item id=&quot;-1&quot;&gt;&lt;dc:title&gt;errorCode blues&lt;/dc:title&gt;\
             &lt;/item&gt;&lt;/DIDL-Lite&gt;</TrackMetaData><TrackURI>x-file-cifs://nas/blues.flac</TrackURI>\
             <RelTime>0:00:05</RelTime></u:GetPositionInfoResponse></s:Body></s:Envelope>",
        )
        .create();

    let track = device_for(&server).current_track_info().unwrap();
    assert_eq!(track.queue_index, 4);
    assert_eq!(track.metadata.title, "errorCode blues");
}

#[test]
fn test_play_state_and_mode_are_parsed() {
    let mut server = mockito::Server::new();
    server
        .mock("POST", AV_TRANSPORT)
        .match_header("SOAPACTION", "urn:schemas-upnp-org:service:AVTransport:1#GetTransportInfo")
        .with_status(200)
        .with_body("<u:GetTransportInfoResponse><CurrentTransportState>PAUSED_PLAYBACK</CurrentTransportState></u:GetTransportInfoResponse>")
        .create();
    server
        .mock("POST", AV_TRANSPORT)
        .match_header("SOAPACTION", "urn:schemas-upnp-org:service:AVTransport:1#GetTransportSettings")
        .with_status(200)
        .with_body("<u:GetTransportSettingsResponse><PlayMode>REPEAT_ALL</PlayMode></u:GetTransportSettingsResponse>")
        .create();

    let device = device_for(&server);
    assert_eq!(device.play_state().unwrap(), PlayState::Paused);
    assert_eq!(device.play_mode().unwrap(), PlayMode::RepeatAll);
}

#[test]
fn test_unknown_play_state_is_a_parse_error() {
    let mut server = mockito::Server::new();
    server
        .mock("POST", AV_TRANSPORT)
        .with_status(200)
        .with_body("<u:GetTransportInfoResponse><CurrentTransportState>DANCING</CurrentTransportState></u:GetTransportInfoResponse>")
        .create();

    assert!(matches!(device_for(&server).play_state(), Err(SonosError::Parse(_))));
}

#[test]
fn test_protocol_errors_propagate() {
    let mut server = mockito::Server::new();
    server
        .mock("POST", AV_TRANSPORT)
        .with_status(500)
        .with_body("<s:Fault><detail><UPnPError><errorCode>701</errorCode></UPnPError></detail></s:Fault>")
        .create();

    let err = device_for(&server).next().unwrap_err();
    assert_eq!(err.protocol_code(), Some(701));
}

#[test]
fn test_queue_is_browsed() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/MediaServer/ContentDirectory/Control")
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex("<ObjectID>Q:0</ObjectID>".to_string()),
            Matcher::Regex("<StartingIndex>0</StartingIndex><RequestedCount>10</RequestedCount>".to_string()),
        ]))
        .with_status(200)
        .with_body(
            "<u:BrowseResponse><Result>&lt;DIDL-Lite&gt;\
             &lt;item id=&quot;Q:0/1&quot; parentID=&quot;Q:0&quot;&gt;&lt;dc:title&gt;One&lt;/dc:title&gt;&lt;/item&gt;\
             &lt;item id=&quot;Q:0/2&quot; parentID=&quot;Q:0&quot;&gt;&lt;dc:title&gt;Two&lt;/dc:title&gt;&lt;/item&gt;\
             &lt;/DIDL-Lite&gt;</Result><NumberReturned>2</NumberReturned></u:BrowseResponse>",
        )
        .create();

    let queue = device_for(&server).queue(0, 10).unwrap();
    let titles: Vec<_> = queue.iter().map(|item| item.title.as_str()).collect();
    assert_eq!(titles, vec!["One", "Two"]);
    mock.assert();
}

#[test]
fn test_zone_group_state() {
    let mut server = mockito::Server::new();
    server
        .mock("POST", "/ZoneGroupTopology/Control")
        .with_status(200)
        .with_body(
            "<u:GetZoneGroupAttributesResponse><CurrentZoneGroupName>Kitchen</CurrentZoneGroupName>\
             <CurrentZoneGroupID>RINCON_000E58A0123401400:58</CurrentZoneGroupID>\
             <CurrentZonePlayerUUIDsInGroup>RINCON_000E58A0123401400,RINCON_000E58B0567801400</CurrentZonePlayerUUIDsInGroup>\
             </u:GetZoneGroupAttributesResponse>",
        )
        .create();
    server.mock("GET", "/status/zp").with_status(200).with_body(STATUS_ZP).create();

    let device = device_for(&server);
    let zone = device.zone_group_state().unwrap();
    assert_eq!(zone.name, "Kitchen");
    assert_eq!(zone.members.len(), 2);
    assert!(device.is_joined().unwrap());
    assert!(device.is_coordinator().unwrap());
}

#[test]
fn test_room_name_ignores_embedded_devices() {
    let mut server = mockito::Server::new();
    let description = server
        .mock("GET", "/xml/device_description.xml")
        .with_status(200)
        .with_body(
            "<?xml version=\"1.0\"?><root xmlns=\"urn:schemas-upnp-org:device-1-0\"><device>\
             <deviceType>urn:schemas-upnp-org:device:ZonePlayer:1</deviceType>\
             <friendlyName>127.0.0.1 - Sonos One</friendlyName><manufacturer>Sonos, Inc.</manufacturer>\
             <modelName>Sonos One</modelName><UDN>uuid:RINCON_000E58A0123401400</UDN>\
             <roomName>Living Room</roomName>\
             <deviceList><device><deviceType>urn:schemas-upnp-org:device:MediaRenderer:1</deviceType>\
             <roomName>Wrong</roomName></device></deviceList></device></root>",
        )
        .expect(1)
        .create();

    let device = device_for(&server);
    assert_eq!(device.room_name().unwrap(), "Living Room");
    // served from the cache
    assert_eq!(device.room_name_cached().as_deref(), Some("Living Room"));
    description.assert();
}

#[test]
fn test_device_name_and_speaker_info() {
    let mut server = mockito::Server::new();
    server.mock("GET", "/status/zp").with_status(200).with_body(STATUS_ZP).create();

    let device = device_for(&server);
    let info = device.speaker_info().unwrap();
    assert_eq!(info.local_uid, "RINCON_000E58A0123401400");
    assert_eq!(info.software_version, "79.1-56030");
    assert_eq!(info.hardware_version, "");

    assert_eq!(device.device_name().unwrap(), "Kitchen");
    assert_eq!(device.device_name_cached().as_deref(), Some("Kitchen"));
}

#[test]
fn test_led_state() {
    let mut server = mockito::Server::new();
    server
        .mock("POST", "/DeviceProperties/Control")
        .match_header("SOAPACTION", "urn:schemas-upnp-org:service:DeviceProperties:1#GetLEDState")
        .with_status(200)
        .with_body("<u:GetLEDStateResponse><CurrentLEDState>On</CurrentLEDState></u:GetLEDStateResponse>")
        .create();
    let off = server
        .mock("POST", "/DeviceProperties/Control")
        .match_header("SOAPACTION", "urn:schemas-upnp-org:service:DeviceProperties:1#SetLEDState")
        .match_body(Matcher::Regex("<DesiredLEDState>Off</DesiredLEDState>".to_string()))
        .with_status(200)
        .with_body("<u:SetLEDStateResponse/>")
        .create();

    let device = device_for(&server);
    assert!(device.led_state().unwrap());
    device.switch_led_state().unwrap();
    off.assert();
}

#[test]
fn test_play_uri_sets_transport_then_plays() {
    let mut server = mockito::Server::new();
    let set_uri = server
        .mock("POST", AV_TRANSPORT)
        .match_header("SOAPACTION", "urn:schemas-upnp-org:service:AVTransport:1#SetAVTransportURI")
        .match_body(Matcher::Regex("<CurrentURI>x-rincon-mp3radio://radio.example/stream</CurrentURI>".to_string()))
        .with_status(200)
        .with_body("<u:SetAVTransportURIResponse/>")
        .create();
    let play = server
        .mock("POST", AV_TRANSPORT)
        .match_header("SOAPACTION", "urn:schemas-upnp-org:service:AVTransport:1#Play")
        .with_status(200)
        .with_body("<u:PlayResponse/>")
        .create();

    device_for(&server)
        .play_uri("x-rincon-mp3radio://radio.example/stream", None)
        .unwrap();

    set_uri.assert();
    play.assert();
}

#[test]
fn test_cancelled_clip_stops_polling() {
    let mut server = mockito::Server::new();
    server
        .mock("POST", AV_TRANSPORT)
        .match_header("SOAPACTION", "urn:schemas-upnp-org:service:AVTransport:1#GetTransportInfo")
        .with_status(200)
        .with_body("<CurrentTransportState>PLAYING</CurrentTransportState>")
        .create();
    server
        .mock("POST", AV_TRANSPORT)
        .match_header("SOAPACTION", "urn:schemas-upnp-org:service:AVTransport:1#GetPositionInfo")
        .with_status(200)
        .with_body("<Track>1</Track><TrackDuration>0:03:00</TrackDuration><TrackURI>x-file-cifs://a.mp3</TrackURI><RelTime>0:00:10</RelTime>")
        .create();
    server
        .mock("POST", AV_TRANSPORT)
        .match_header("SOAPACTION", Matcher::Regex("#(SetAVTransportURI|Play)$".to_string()))
        .with_status(200)
        .with_body("<ok/>")
        .create();

    let device = device_for(&server);
    let cancel = CancellationToken::new();
    let remote = cancel.clone();
    let canceller = std::thread::spawn(move || {
        std::thread::sleep(std::time::Duration::from_millis(700));
        remote.cancel();
    });

    let result = device.clip("x-file-cifs://chime.mp3", None, &cancel);
    canceller.join().unwrap();
    assert!(matches!(result, Err(SonosError::Cancelled)));
}

#[test]
fn test_clip_under_cancelled_parent_never_polls() {
    let mut server = mockito::Server::new();
    let transport_info = server
        .mock("POST", AV_TRANSPORT)
        .match_header("SOAPACTION", "urn:schemas-upnp-org:service:AVTransport:1#GetTransportInfo")
        .with_status(200)
        .with_body("<CurrentTransportState>PLAYING</CurrentTransportState>")
        .expect(1)
        .create();
    server
        .mock("POST", AV_TRANSPORT)
        .match_header("SOAPACTION", "urn:schemas-upnp-org:service:AVTransport:1#GetPositionInfo")
        .with_status(200)
        .with_body("<Track>1</Track><TrackDuration>0:03:00</TrackDuration><TrackURI>x-file-cifs://a.mp3</TrackURI><RelTime>0:00:10</RelTime>")
        .create();
    server
        .mock("POST", AV_TRANSPORT)
        .match_header("SOAPACTION", Matcher::Regex("#(SetAVTransportURI|Play)$".to_string()))
        .with_status(200)
        .with_body("<ok/>")
        .expect(2)
        .create();

    let shutdown = CancellationToken::new();
    let clip = shutdown.child_token();
    shutdown.cancel();

    let result = device_for(&server).clip("x-file-cifs://chime.mp3", None, &clip);
    assert!(matches!(result, Err(SonosError::Cancelled)));
    transport_info.assert();
}

#[derive(Default)]
struct Volumes {
    changes: AtomicUsize,
}

impl SonosEventListener for Volumes {
    fn volume_changed(&self, _volume: u8) {
        self.changes.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn test_listener_registration_subscribes_once() {
    let mut server = mockito::Server::new();
    server.mock("GET", "/status/zp").with_status(200).with_body(STATUS_ZP).create();
    let paths = [
        "/MediaRenderer/RenderingControl/Event",
        "/MediaRenderer/AVTransport/Event",
        "/MediaRenderer/Queue/Event",
        "/ZoneGroupTopology/Event",
    ];
    let mut subscribes = Vec::new();
    let mut unsubscribes = Vec::new();
    for (index, path) in paths.iter().enumerate() {
        let sid = format!("uuid:RINCON_000E58A0123401400_sub{}", index);
        subscribes.push(
            server
                .mock("SUBSCRIBE", *path)
                .with_status(200)
                .with_header("SID", &sid)
                .create(),
        );
        unsubscribes.push(
            server
                .mock("UNSUBSCRIBE", *path)
                .match_header("SID", sid.as_str())
                .with_status(200)
                .create(),
        );
    }

    let device = device_for(&server);
    let first: Arc<dyn SonosEventListener> = Arc::new(Volumes::default());
    let second: Arc<dyn SonosEventListener> = Arc::new(Volumes::default());

    let first_id = device.register_listener(Arc::clone(&first)).unwrap().unwrap();
    assert!(device.register_listener(Arc::clone(&first)).unwrap().is_none());
    let second_id = device.register_listener(second).unwrap().unwrap();
    assert_eq!(device.listener_count(), 2);
    assert_eq!(device.device_name_cached().as_deref(), Some("Kitchen"));
    for subscribe in &subscribes {
        subscribe.assert();
    }

    assert!(device.unregister_listener(first_id));
    assert!(!device.unregister_listener(first_id));
    assert!(device.unregister_listener(second_id));
    assert_eq!(device.listener_count(), 0);
    for unsubscribe in &unsubscribes {
        unsubscribe.assert();
    }

    device.control_point().shutdown();
}
