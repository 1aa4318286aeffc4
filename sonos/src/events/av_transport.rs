use parking_lot::Mutex;
use xmltree::Element;

use super::DispatchTarget;
use crate::codec;
use crate::model::{AvTransportEvent, PlayMode, PlayState, TrackInfo, TrackMetadata};
use crate::streaming::event::{last_change_instance, val};
use crate::streaming::{InboundEvent, UpnpEventListener};

#[derive(Debug, Default)]
struct TransportState {
    track: Option<TrackInfo>,
    play_mode: Option<PlayMode>,
    play_state: Option<PlayState>,
}

/// Diffs AVTransport notifications against the last known track, play
/// mode and play state.
#[derive(Debug)]
pub struct AvTransportDispatcher {
    target: DispatchTarget,
    state: Mutex<TransportState>,
}

impl AvTransportDispatcher {
    pub fn new(target: DispatchTarget) -> Self {
        Self {
            target,
            state: Mutex::new(TransportState::default()),
        }
    }

    fn decode_all(event: &InboundEvent) -> Vec<AvTransportEvent> {
        event
            .properties()
            .filter(|property| property.name == "LastChange")
            .filter_map(|property| match last_change_instance(property) {
                Some(instance) => match decode(instance) {
                    Ok(decoded) => Some(decoded),
                    Err(e) => {
                        log::warn!("Dropped transport event: {}", e);
                        None
                    }
                },
                None => {
                    log::warn!("Transport event without InstanceID");
                    None
                }
            })
            .collect()
    }
}

impl UpnpEventListener for AvTransportDispatcher {
    fn on_initial_event(&self, event: &InboundEvent) {
        if let Some(decoded) = Self::decode_all(event).into_iter().next() {
            let mut state = self.state.lock();
            state.track = Some(decoded.current_track);
            state.play_mode = Some(decoded.current_play_mode);
            state.play_state = Some(decoded.transport_state);
        }
    }

    fn on_event(&self, event: &InboundEvent) {
        for decoded in Self::decode_all(event) {
            let (track_changed, mode_changed, state_changed) = {
                let mut state = self.state.lock();

                let track_changed = !state
                    .track
                    .as_ref()
                    .map(|track| track.same_base_track(&decoded.current_track))
                    .unwrap_or(false);
                if track_changed {
                    state.track = Some(decoded.current_track.clone());
                }

                let mode_changed = state.play_mode != Some(decoded.current_play_mode);
                if mode_changed {
                    state.play_mode = Some(decoded.current_play_mode);
                }

                let state_changed = state.play_state != Some(decoded.transport_state);
                if state_changed {
                    state.play_state = Some(decoded.transport_state);
                }

                (track_changed, mode_changed, state_changed)
            };

            if track_changed {
                self.target.emit(|listener| listener.track_changed(&decoded.current_track));
            }
            if mode_changed {
                self.target.emit(|listener| listener.play_mode_changed(decoded.current_play_mode));
            }
            if state_changed {
                self.target.emit(|listener| listener.play_state_changed(decoded.transport_state));
            }
            self.target.emit(|listener| listener.av_transport_event(&decoded));
        }
    }
}

/// Decode the `InstanceID` element of a transport `LastChange`.
pub fn decode(instance: &Element) -> Result<AvTransportEvent, String> {
    let transport_state: PlayState = required(instance, "TransportState")?.parse()?;
    let current_play_mode: PlayMode = required(instance, "CurrentPlayMode")?.parse()?;

    let cross_fade = number::<i32>(instance, "CurrentCrossfadeMode")? != 0;
    let number_of_tracks = number::<u32>(instance, "NumberOfTracks")?;
    let current_track_number = number::<i32>(instance, "CurrentTrack")?;
    let current_section = number::<u32>(instance, "CurrentSection")?;

    let duration = value(instance, "CurrentTrackDuration")
        .and_then(codec::timestamp_to_seconds)
        .unwrap_or(0);

    let current_track = TrackInfo::new(
        current_track_number,
        duration,
        0,
        unescaped(instance, "CurrentTrackURI"),
        metadata(instance, "CurrentTrackMetaData"),
    );
    let next_track = TrackInfo::new(
        current_track_number + 1,
        0,
        0,
        unescaped(instance, "NextTrackURI"),
        metadata(instance, "NextTrackMetaData"),
    );

    Ok(AvTransportEvent {
        transport_state,
        current_play_mode,
        cross_fade,
        number_of_tracks,
        current_section,
        current_track,
        next_track,
        enqueued_transport_uri: unescaped(instance, "EnqueuedTransportURI"),
        enqueued_transport_uri_metadata: metadata(instance, "EnqueuedTransportURIMetaData"),
    })
}

fn value<'a>(instance: &'a Element, name: &str) -> Option<&'a str> {
    instance.get_child(name).and_then(val)
}

fn required<'a>(instance: &'a Element, name: &'static str) -> Result<&'a str, String> {
    value(instance, name).ok_or_else(|| format!("missing {}", name))
}

/// Missing values read as zero; present but malformed values are errors.
fn number<T>(instance: &Element, name: &str) -> Result<T, String>
where
    T: std::str::FromStr + Default,
{
    match value(instance, name).map(str::trim) {
        None | Some("") => Ok(T::default()),
        Some(raw) => raw.parse().map_err(|_| format!("invalid {} {:?}", name, raw)),
    }
}

fn unescaped(instance: &Element, name: &str) -> String {
    value(instance, name).map(codec::unescape).unwrap_or_default()
}

fn metadata(instance: &Element, name: &str) -> TrackMetadata {
    match value(instance, name) {
        Some(raw) if !raw.is_empty() => TrackMetadata::parse(&codec::unescape(raw)),
        _ => TrackMetadata::default(),
    }
}
