use super::{PlayMode, PlayState, TrackInfo, TrackMetadata};

/// A fully decoded transport notification.
#[derive(Debug, Clone, PartialEq)]
pub struct AvTransportEvent {
    pub transport_state: PlayState,
    pub current_play_mode: PlayMode,
    pub cross_fade: bool,
    pub number_of_tracks: u32,
    pub current_section: u32,
    pub current_track: TrackInfo,
    pub next_track: TrackInfo,
    pub enqueued_transport_uri: String,
    pub enqueued_transport_uri_metadata: TrackMetadata,
}
