mod av_transport_event;
mod play_mode;
mod playback_state;
mod queue_event;
mod speaker_info;
mod track_info;
mod track_metadata;
mod zone_info;

pub use av_transport_event::AvTransportEvent;
pub use play_mode::PlayMode;
pub use playback_state::PlayState;
pub use queue_event::QueueEvent;
pub use speaker_info::SpeakerInfo;
pub use track_info::TrackInfo;
pub use track_metadata::TrackMetadata;
pub use zone_info::ZoneInfo;
