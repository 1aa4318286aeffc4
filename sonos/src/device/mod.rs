//! The per-device API: playback, rendering, queue and grouping commands
//! plus listener registration.

pub mod control_point;
pub mod registry;

use std::net::IpAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;

pub use control_point::ControlPoint;
pub use registry::{DeviceEntry, DeviceRegistry, ListenerId};

use crate::codec;
use crate::error::{Result, SonosError};
use crate::events::{
    AvTransportDispatcher, DispatchTarget, QueueDispatcher, RenderingControlDispatcher, SonosEventListener,
    ZoneTopologyDispatcher,
};
use crate::model::{PlayMode, PlayState, SpeakerInfo, TrackInfo, TrackMetadata, ZoneInfo};
use crate::streaming::UpnpEventListener;
use crate::transport::description::{self, DeviceDescription};
use crate::transport::service::EventService;
use crate::transport::soap::SoapRequest;
use crate::transport::ssdp::DeviceDescriptor;

/// How often `clip` checks whether the clip has finished
const CLIP_POLL_INTERVAL: Duration = Duration::from_millis(500);

const EQ_RANGE: std::ops::RangeInclusive<i8> = -10..=10;

/// A single Sonos device.
///
/// Every command is one request to the device. Listener registration
/// subscribes to the device's event services on first use and
/// unsubscribes once the last listener is gone.
pub struct SonosDevice {
    descriptor: DeviceDescriptor,
    ip: String,
    control_point: Arc<ControlPoint>,
    entry: Arc<DeviceEntry>,
    room_name: RwLock<Option<String>>,
    lifecycle: Mutex<()>,
}

impl SonosDevice {
    pub fn new(descriptor: DeviceDescriptor, control_point: Arc<ControlPoint>) -> Self {
        let ip = descriptor.address().to_string();
        let entry = control_point.registry().entry(&ip);
        Self {
            descriptor,
            ip,
            control_point,
            entry,
            room_name: RwLock::new(None),
            lifecycle: Mutex::new(()),
        }
    }

    /// A device at a known address that was not discovered.
    pub fn from_ip(ip: IpAddr, control_point: Arc<ControlPoint>) -> Self {
        Self::new(DeviceDescriptor::from_address(ip), control_point)
    }

    pub fn ip(&self) -> &str {
        &self.ip
    }

    pub fn descriptor(&self) -> &DeviceDescriptor {
        &self.descriptor
    }

    pub fn control_point(&self) -> &Arc<ControlPoint> {
        &self.control_point
    }

    fn execute(&self, request: SoapRequest) -> Result<String> {
        self.control_point.soap().execute(&self.ip, &request)
    }

    // AVTransport

    pub fn play(&self) -> Result<()> {
        self.execute(transport("Play").param("Speed", "1"))?;
        Ok(())
    }

    /// Switch to `uri` and start playing it.
    pub fn play_uri(&self, uri: &str, metadata: Option<&TrackMetadata>) -> Result<()> {
        self.set_transport_uri(uri, metadata)?;
        self.play()
    }

    /// Play the queue starting at `queue_index`.
    pub fn play_from_queue(&self, queue_index: i32) -> Result<()> {
        if queue_index < 0 {
            return Err(SonosError::InvalidArgument("Queue index cannot be < 0".to_string()));
        }
        self.play_uri(&self.queue_uri()?, None)?;
        self.seek_track(queue_index)?;
        self.play()
    }

    /// Play `uri` once, then return to what was playing before.
    ///
    /// Blocks until the clip has stopped. The previous queue position, seek
    /// offset and play state are restored afterwards. Returns
    /// [`SonosError::Cancelled`] without restoring if `cancel` fires first.
    pub fn clip(&self, uri: &str, metadata: Option<&TrackMetadata>, cancel: &CancellationToken) -> Result<()> {
        let previous_state = self.play_state()?;
        let previous = self.current_track_info()?;

        self.play_uri(uri, metadata)?;

        loop {
            if cancel.is_cancelled() {
                log::debug!("Clip on {} cancelled", self.ip);
                return Err(SonosError::Cancelled);
            }
            if self.play_state()? == PlayState::Stopped {
                break;
            }
            std::thread::sleep(CLIP_POLL_INTERVAL);
        }

        self.play_uri(&self.queue_uri()?, None)?;
        if previous.queue_index > 0 {
            self.seek_track(previous.queue_index)?;
        }
        self.seek(previous.position)?;

        if previous_state == PlayState::Playing {
            self.play()
        } else {
            self.pause()
        }
    }

    pub fn pause(&self) -> Result<()> {
        self.execute(transport("Pause").param("Speed", "1"))?;
        Ok(())
    }

    pub fn stop(&self) -> Result<()> {
        self.execute(transport("Stop").param("Speed", "1"))?;
        Ok(())
    }

    pub fn play_state(&self) -> Result<PlayState> {
        let response = self.execute(transport("GetTransportInfo"))?;
        parse_enum(&response, "CurrentTransportState")
    }

    /// Seek within the current track.
    pub fn seek(&self, seconds: u32) -> Result<()> {
        self.seek_to(&codec::seconds_to_timestamp(seconds))
    }

    /// Seek within the current track to a `HH:MM:SS` timestamp.
    pub fn seek_to(&self, timestamp: &str) -> Result<()> {
        self.execute(transport("Seek").param("Unit", "REL_TIME").param("Target", timestamp))?;
        Ok(())
    }

    pub fn next(&self) -> Result<()> {
        self.execute(transport("Next").param("Speed", "1"))?;
        Ok(())
    }

    pub fn previous(&self) -> Result<()> {
        self.execute(transport("Previous").param("Speed", "1"))?;
        Ok(())
    }

    /// Enqueue `uri` right after the current track.
    pub fn add_to_queue(&self, uri: &str, metadata: Option<&TrackMetadata>) -> Result<()> {
        self.execute(
            transport("AddURIToQueue")
                .param("EnqueuedURI", uri)
                .param("EnqueuedURIMetaData", didl(metadata))
                .param("DesiredFirstTrackNumberEnqueued", "0")
                .param("EnqueueAsNext", "1"),
        )?;
        Ok(())
    }

    pub fn remove_from_queue(&self, queue_index: i32) -> Result<()> {
        if queue_index < 0 {
            return Err(SonosError::InvalidArgument("Queue index cannot be < 0".to_string()));
        }
        self.execute(
            transport("RemoveTrackFromQueue")
                .param("ObjectID", format!("Q:0/{}", queue_index))
                .param("UpdateID", "0"),
        )?;
        Ok(())
    }

    pub fn clear_queue(&self) -> Result<()> {
        self.execute(transport("RemoveAllTracksFromQueue"))?;
        Ok(())
    }

    /// Up to `count` queue entries starting at `start`.
    pub fn queue(&self, start: u32, count: u32) -> Result<Vec<TrackMetadata>> {
        let response = self.execute(
            SoapRequest::content_directory("Browse")
                .param("ObjectID", "Q:0")
                .param("BrowseFlag", "BrowseDirectChildren")
                .param("Filter", "dc:title,res,dc:creator,upnp:artist,upnp:album,upnp:albumArtURI")
                .param("StartingIndex", start.to_string())
                .param("RequestedCount", count.to_string())
                .param("SortCriteria", ""),
        )?;

        Ok(codec::find_all("(?s)<item [^>]*>(.+?)</item>", &response)
            .iter()
            .map(|item| TrackMetadata::parse(item))
            .collect())
    }

    /// The track at the current position. The queue index is `-1` when the
    /// device does not report one.
    pub fn current_track_info(&self) -> Result<TrackInfo> {
        let response = self.execute(transport("GetPositionInfo").param("Channel", "Master"))?;
        parse_position_info(&response)
    }

    pub fn play_mode(&self) -> Result<PlayMode> {
        let response = self.execute(transport("GetTransportSettings"))?;
        parse_enum(&response, "PlayMode")
    }

    pub fn set_play_mode(&self, play_mode: PlayMode) -> Result<()> {
        self.execute(transport("SetPlayMode").param("NewPlayMode", play_mode.as_str()))?;
        Ok(())
    }

    // Grouping

    pub fn zone_group_state(&self) -> Result<ZoneInfo> {
        let response = self.execute(SoapRequest::zone_group_topology("GetZoneGroupAttributes"))?;
        Ok(ZoneInfo::new(
            codec::find_tag("CurrentZoneGroupName", &response),
            codec::find_tag("CurrentZoneGroupID", &response),
            ZoneInfo::parse_members(&codec::find_tag("CurrentZonePlayerUUIDsInGroup", &response)),
        ))
    }

    pub fn zone_name(&self) -> Result<String> {
        Ok(self.zone_group_state()?.name)
    }

    pub fn is_joined(&self) -> Result<bool> {
        Ok(self.zone_group_state()?.is_grouped())
    }

    /// Every device of this device's group, located by a fresh discovery
    /// per member. Members that do not answer are left out.
    pub fn joined_with(&self) -> Result<Vec<SonosDevice>> {
        let mut devices = Vec::new();
        for uid in self.zone_group_state()?.members {
            match crate::discovery::discover_by_uid(&self.control_point, &uid)? {
                Some(device) => devices.push(device),
                None => log::warn!("Group member {} of {} did not answer discovery", uid, self.ip),
            }
        }
        Ok(devices)
    }

    /// Join the group coordinated by the device with `master_uid`.
    pub fn join(&self, master_uid: &str) -> Result<()> {
        self.set_transport_uri(&format!("x-rincon:{}", master_uid), None)
    }

    pub fn join_device(&self, master: &SonosDevice) -> Result<()> {
        self.join(&master.speaker_info()?.local_uid)
    }

    pub fn unjoin(&self) -> Result<()> {
        self.execute(transport("BecomeCoordinatorOfStandaloneGroup").param("Speed", "1"))?;
        Ok(())
    }

    pub fn is_coordinator(&self) -> Result<bool> {
        let uid = self.speaker_info()?.local_uid;
        Ok(self.zone_group_state()?.id.starts_with(&uid))
    }

    pub fn switch_to_line_in(&self) -> Result<()> {
        let uid = self.speaker_info()?.local_uid;
        self.set_transport_uri(&format!("x-rincon-stream:{}", uid), None)
    }

    pub fn switch_to_tv(&self) -> Result<()> {
        let uid = self.speaker_info()?.local_uid;
        self.set_transport_uri(&format!("x-sonos-htastream:{}:spdif", uid), None)
    }

    // RenderingControl

    pub fn volume(&self) -> Result<u8> {
        let response = self.execute(rendering("GetVolume").param("Channel", "Master"))?;
        let volume: i64 = parse_number(&response, "CurrentVolume")?;
        Ok(volume.clamp(0, 100) as u8)
    }

    /// Set the volume. Values outside `0..=100` are clamped.
    pub fn set_volume(&self, volume: i32) -> Result<()> {
        let volume = volume.clamp(0, 100);
        self.execute(
            rendering("SetVolume")
                .param("Channel", "Master")
                .param("DesiredVolume", volume.to_string()),
        )?;
        Ok(())
    }

    pub fn is_muted(&self) -> Result<bool> {
        let response = self.execute(rendering("GetMute").param("Channel", "Master"))?;
        Ok(codec::find_tag("CurrentMute", &response) == "1")
    }

    pub fn set_mute(&self, mute: bool) -> Result<()> {
        self.execute(
            rendering("SetMute")
                .param("Channel", "Master")
                .param("DesiredMute", flag(mute)),
        )?;
        Ok(())
    }

    pub fn switch_mute(&self) -> Result<()> {
        self.set_mute(!self.is_muted()?)
    }

    pub fn bass(&self) -> Result<i8> {
        let response = self.execute(rendering("GetBass").param("Channel", "Master"))?;
        parse_number(&response, "CurrentBass")
    }

    /// Set the bass level, `-10..=10`.
    pub fn set_bass(&self, bass: i8) -> Result<()> {
        check_eq("Bass", bass)?;
        self.execute(rendering("SetBass").param("DesiredBass", bass.to_string()))?;
        Ok(())
    }

    pub fn treble(&self) -> Result<i8> {
        let response = self.execute(rendering("GetTreble").param("Channel", "Master"))?;
        parse_number(&response, "CurrentTreble")
    }

    /// Set the treble level, `-10..=10`.
    pub fn set_treble(&self, treble: i8) -> Result<()> {
        check_eq("Treble", treble)?;
        self.execute(rendering("SetTreble").param("DesiredTreble", treble.to_string()))?;
        Ok(())
    }

    pub fn is_loudness_activated(&self) -> Result<bool> {
        let response = self.execute(rendering("GetLoudness").param("Channel", "Master"))?;
        Ok(codec::find_tag("CurrentLoudness", &response) == "1")
    }

    pub fn set_loudness(&self, loudness: bool) -> Result<()> {
        self.execute(
            rendering("SetLoudness")
                .param("Channel", "Master")
                .param("DesiredLoudness", flag(loudness)),
        )?;
        Ok(())
    }

    pub fn is_night_mode_activated(&self) -> Result<bool> {
        self.eq_flag("NightMode")
    }

    pub fn set_night_mode(&self, on: bool) -> Result<()> {
        self.set_eq_flag("NightMode", on)
    }

    pub fn switch_night_mode(&self) -> Result<()> {
        self.set_night_mode(!self.is_night_mode_activated()?)
    }

    pub fn is_dialog_mode_activated(&self) -> Result<bool> {
        self.eq_flag("DialogLevel")
    }

    pub fn set_dialog_mode(&self, on: bool) -> Result<()> {
        self.set_eq_flag("DialogLevel", on)
    }

    pub fn switch_dialog_mode(&self) -> Result<()> {
        self.set_dialog_mode(!self.is_dialog_mode_activated()?)
    }

    fn eq_flag(&self, eq_type: &str) -> Result<bool> {
        let response = self.execute(rendering("GetEQ").param("EQType", eq_type))?;
        Ok(codec::find_tag("CurrentValue", &response) == "1")
    }

    fn set_eq_flag(&self, eq_type: &str, on: bool) -> Result<()> {
        self.execute(
            rendering("SetEQ")
                .param("EQType", eq_type)
                .param("DesiredValue", flag(on)),
        )?;
        Ok(())
    }

    // Device properties

    /// Fetch the room name from the device description.
    pub fn room_name(&self) -> Result<String> {
        let xml = self
            .control_point
            .soap()
            .download(&self.ip, description::DEVICE_DESCRIPTION_PATH)?;
        let room_name = DeviceDescription::from_xml(&xml)?.room_name;
        *self.room_name.write() = Some(room_name.clone());
        Ok(room_name)
    }

    /// The room name from the last fetch, fetching it if there was none.
    pub fn room_name_cached(&self) -> Option<String> {
        if let Some(room_name) = self.room_name.read().clone() {
            return Some(room_name);
        }
        match self.room_name() {
            Ok(room_name) => Some(room_name),
            Err(e) => {
                log::error!("Could not retrieve the room name of {}: {}", self.ip, e);
                None
            }
        }
    }

    pub fn set_room_name(&self, room_name: &str) -> Result<()> {
        self.execute(
            SoapRequest::device("SetZoneAttributes")
                .param("DesiredZoneName", room_name)
                .param("DesiredIcon", "")
                .param("DesiredConfiguration", ""),
        )?;
        *self.room_name.write() = Some(room_name.to_string());
        Ok(())
    }

    /// Fetch the zone name the device reports for itself.
    pub fn device_name(&self) -> Result<String> {
        let name = self.speaker_info()?.zone_name;
        self.entry.set_device_name(name.clone());
        Ok(name)
    }

    pub fn device_name_cached(&self) -> Option<String> {
        if let Some(name) = self.entry.device_name() {
            return Some(name);
        }
        match self.device_name() {
            Ok(name) => Some(name),
            Err(e) => {
                log::error!("Could not retrieve the device name of {}: {}", self.ip, e);
                None
            }
        }
    }

    pub fn speaker_info(&self) -> Result<SpeakerInfo> {
        let xml = self.control_point.soap().download(&self.ip, description::STATUS_ZP_PATH)?;
        description::parse_speaker_info(&xml)
    }

    pub fn led_state(&self) -> Result<bool> {
        let response = self.execute(SoapRequest::device("GetLEDState"))?;
        Ok(codec::find_tag("CurrentLEDState", &response) == "On")
    }

    pub fn set_led_state(&self, on: bool) -> Result<()> {
        let state = if on { "On" } else { "Off" };
        self.execute(SoapRequest::device("SetLEDState").param("DesiredLEDState", state))?;
        Ok(())
    }

    pub fn switch_led_state(&self) -> Result<()> {
        self.set_led_state(!self.led_state()?)
    }

    /// Absolute URL of album art reported as a device relative path.
    pub fn resolve_album_url(&self, path: &str) -> String {
        format!("http://{}:{}{}", self.ip, self.control_point.soap().port(), path)
    }

    // Listeners

    /// Register `listener` for this device's events.
    ///
    /// The first registration caches the device name and subscribes to the
    /// rendering, transport, queue and topology events. Returns `None` if
    /// this listener is already registered.
    pub fn register_listener(&self, listener: Arc<dyn SonosEventListener>) -> Result<Option<ListenerId>> {
        let _lifecycle = self.lifecycle.lock();

        let Some(id) = self.entry.add_listener(listener) else {
            return Ok(None);
        };
        if self.entry.listener_count() > 1 {
            return Ok(Some(id));
        }

        if let Err(e) = self.subscribe_all() {
            self.entry.remove_listener(id);
            return Err(e);
        }
        Ok(Some(id))
    }

    /// Remove a listener. The last removal ends every subscription of this
    /// device. Returns `false` if `id` was not registered.
    pub fn unregister_listener(&self, id: ListenerId) -> bool {
        let _lifecycle = self.lifecycle.lock();

        match self.entry.remove_listener(id) {
            None => false,
            Some(0) => {
                self.unsubscribe_all();
                true
            }
            Some(_) => true,
        }
    }

    pub fn listener_count(&self) -> usize {
        self.entry.listener_count()
    }

    fn subscribe_all(&self) -> Result<()> {
        if self.device_name_cached().is_none() {
            log::warn!("Subscribing to {} without a device name; group changes are not reported", self.ip);
        }

        let runtime = self.control_point.runtime()?;
        let target = DispatchTarget::new(Arc::clone(self.control_point.registry()), self.ip.clone());

        let mut sids = Vec::with_capacity(EventService::ALL.len());
        for service in EventService::ALL {
            let dispatcher: Arc<dyn UpnpEventListener> = match service {
                EventService::RenderingControl => Arc::new(RenderingControlDispatcher::new(target.clone())),
                EventService::AvTransport => Arc::new(AvTransportDispatcher::new(target.clone())),
                EventService::Queue => Arc::new(QueueDispatcher::new(target.clone())),
                EventService::ZoneGroupTopology => Arc::new(ZoneTopologyDispatcher::new(target.clone())),
            };

            match runtime.subscribe(&self.ip, service.path(), dispatcher) {
                Ok(sid) => sids.push(sid),
                Err(e) => {
                    for sid in &sids {
                        runtime.unsubscribe(sid);
                    }
                    return Err(e.into());
                }
            }
        }

        log::info!("Subscribed to {} event services on {}", sids.len(), self.ip);
        self.entry.set_subscriptions(sids);
        Ok(())
    }

    fn unsubscribe_all(&self) {
        let sids = self.entry.take_subscriptions();
        let Some(runtime) = self.control_point.running_runtime() else {
            return;
        };
        for sid in sids {
            runtime.unsubscribe(&sid);
        }
    }

    fn set_transport_uri(&self, uri: &str, metadata: Option<&TrackMetadata>) -> Result<()> {
        self.execute(
            transport("SetAVTransportURI")
                .param("CurrentURI", uri)
                .param("CurrentURIMetaData", didl(metadata)),
        )?;
        Ok(())
    }

    fn seek_track(&self, queue_index: i32) -> Result<()> {
        self.execute(
            transport("Seek")
                .param("Unit", "TRACK_NR")
                .param("Target", queue_index.to_string()),
        )?;
        Ok(())
    }

    fn queue_uri(&self) -> Result<String> {
        Ok(format!("x-rincon-queue:{}#0", self.speaker_info()?.local_uid))
    }
}

impl std::fmt::Debug for SonosDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SonosDevice")
            .field("ip", &self.ip)
            .field("device_name", &self.entry.device_name())
            .field("listeners", &self.entry.listener_count())
            .finish()
    }
}

fn transport(action: &str) -> SoapRequest {
    SoapRequest::transport(action).param("InstanceID", "0")
}

fn rendering(action: &str) -> SoapRequest {
    SoapRequest::rendering(action).param("InstanceID", "0")
}

fn flag(on: bool) -> &'static str {
    if on {
        "1"
    } else {
        "0"
    }
}

fn didl(metadata: Option<&TrackMetadata>) -> String {
    metadata.map(TrackMetadata::to_didl).unwrap_or_default()
}

fn check_eq(name: &str, value: i8) -> Result<()> {
    if EQ_RANGE.contains(&value) {
        Ok(())
    } else {
        Err(SonosError::InvalidArgument(format!(
            "{} value needs to be between -10 and 10, got {}",
            name, value
        )))
    }
}

fn parse_number<T: FromStr>(response: &str, tag: &str) -> Result<T> {
    let raw = codec::find_tag(tag, response);
    raw.trim()
        .parse()
        .map_err(|_| SonosError::Parse(format!("Invalid {} {:?}", tag, raw)))
}

fn parse_enum<T: FromStr<Err = String>>(response: &str, tag: &str) -> Result<T> {
    codec::find_tag(tag, response).parse().map_err(SonosError::Parse)
}

/// Read a `GetPositionInfo` response.
pub fn parse_position_info(response: &str) -> Result<TrackInfo> {
    let track = codec::find_one("<Track>([0-9]*|NOT_IMPLEMENTED)</Track>", response);
    let queue_index = match track.as_str() {
        "" | "NOT_IMPLEMENTED" => -1,
        number => number
            .parse()
            .map_err(|_| SonosError::Parse(format!("Invalid Track {:?}", number)))?,
    };

    let duration = codec::timestamp_to_seconds(&codec::find_one(
        "<TrackDuration>([0-9]*:[0-9]*:[0-9]*)</TrackDuration>",
        response,
    ))
    .unwrap_or(0);
    let position =
        codec::timestamp_to_seconds(&codec::find_one("<RelTime>([0-9]*:[0-9]*:[0-9]*)</RelTime>", response)).unwrap_or(0);

    Ok(TrackInfo::new(
        queue_index,
        duration,
        position,
        codec::find_one("<TrackURI>(.*)</TrackURI>", response),
        TrackMetadata::parse(&codec::find_one("<TrackMetaData>(.*)</TrackMetaData>", response)),
    ))
}
