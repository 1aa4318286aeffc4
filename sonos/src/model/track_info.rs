use crate::codec;

use super::TrackMetadata;

/// A track as positioned on a device: queue slot, timing and content.
///
/// Durations and positions are in seconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackInfo {
    pub queue_index: i32,
    pub duration: u32,
    pub position: u32,
    pub uri: String,
    pub metadata: TrackMetadata,
}

impl TrackInfo {
    pub fn new(queue_index: i32, duration: u32, position: u32, uri: impl Into<String>, metadata: TrackMetadata) -> Self {
        Self {
            queue_index,
            duration,
            position,
            uri: uri.into(),
            metadata,
        }
    }

    /// Whether both values point at the same song.
    ///
    /// Only the URI and metadata are compared; position and duration move
    /// continuously during playback.
    pub fn same_base_track(&self, other: &TrackInfo) -> bool {
        self.uri == other.uri && self.metadata == other.metadata
    }

    /// True for the placeholder a device reports when its queue is empty.
    pub fn is_empty(&self) -> bool {
        self.queue_index == 0 && self.duration == 0 && self.position == 0 && self.uri.is_empty()
    }

    pub fn duration_as_string(&self) -> String {
        codec::seconds_to_timestamp(self.duration)
    }

    pub fn position_as_string(&self) -> String {
        codec::seconds_to_timestamp(self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(position: u32) -> TrackInfo {
        TrackInfo::new(
            3,
            245,
            position,
            "x-sonos-spotify:spotify%3atrack%3a123",
            TrackMetadata::new("Song", "Artist", "Artist", "Album", "/art"),
        )
    }

    #[test]
    fn test_same_base_track_is_reflexive_and_symmetric() {
        let a = track(10);
        let b = track(10);
        assert!(a.same_base_track(&a));
        assert!(a.same_base_track(&b));
        assert!(b.same_base_track(&a));
    }

    #[test]
    fn test_same_base_track_ignores_position_and_duration() {
        let a = track(10);
        let mut b = track(200);
        b.duration = 1;
        b.queue_index = 7;
        assert!(a.same_base_track(&b));
        assert_ne!(a, b);
    }

    #[test]
    fn test_different_uri_is_a_different_track() {
        let a = track(10);
        let mut b = track(10);
        b.uri = "x-file-cifs://nas/other.mp3".to_string();
        assert!(!a.same_base_track(&b));
    }

    #[test]
    fn test_is_empty() {
        assert!(TrackInfo::new(0, 0, 0, "", TrackMetadata::default()).is_empty());
        assert!(!track(0).is_empty());
    }

    #[test]
    fn test_timestamps() {
        let info = track(65);
        assert_eq!(info.duration_as_string(), "00:04:05");
        assert_eq!(info.position_as_string(), "00:01:05");
    }
}
