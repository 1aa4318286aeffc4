use crate::codec;

/// Descriptive metadata of a playable item, read from and written to the
/// DIDL-Lite dialect devices embed in commands and events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TrackMetadata {
    pub title: String,
    pub creator: String,
    pub album_artist: String,
    pub album: String,
    pub album_art_uri: String,
}

impl TrackMetadata {
    pub fn new(
        title: impl Into<String>,
        creator: impl Into<String>,
        album_artist: impl Into<String>,
        album: impl Into<String>,
        album_art_uri: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            creator: creator.into(),
            album_artist: album_artist.into(),
            album: album.into(),
            album_art_uri: album_art_uri.into(),
        }
    }

    /// Parse a DIDL-Lite fragment. Missing elements become empty strings.
    pub fn parse(didl: &str) -> Self {
        let field = |tag: &str| {
            let tag = regex::escape(tag);
            codec::unescape(&codec::find_one(&format!("<{tag}>(.*?)</{tag}>"), didl))
        };

        Self {
            title: field("dc:title"),
            creator: field("dc:creator"),
            album_artist: field("r:albumArtist"),
            album: field("upnp:album"),
            album_art_uri: field("upnp:albumArtURI"),
        }
    }

    /// Serialize to a DIDL-Lite document.
    pub fn to_didl(&self) -> String {
        format!(
            "<DIDL-Lite xmlns:dc=\"http://purl.org/dc/elements/1.1/\" \
             xmlns:upnp=\"urn:schemas-upnp-org:metadata-1-0/upnp/\" \
             xmlns:r=\"urn:schemas-rinconnetworks-com:metadata-1-0/\" \
             xmlns=\"urn:schemas-upnp-org:metadata-1-0/DIDL-Lite/\">\
             <item>\
             <dc:title>{}</dc:title>\
             <dc:creator>{}</dc:creator>\
             <r:albumArtist>{}</r:albumArtist>\
             <upnp:album>{}</upnp:album>\
             <upnp:albumArtURI>{}</upnp:albumArtURI>\
             </item>\
             </DIDL-Lite>",
            codec::escape_xml(&self.title),
            codec::escape_xml(&self.creator),
            codec::escape_xml(&self.album_artist),
            codec::escape_xml(&self.album),
            codec::escape_xml(&self.album_art_uri),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_empty()
            && self.creator.is_empty()
            && self.album_artist.is_empty()
            && self.album.is_empty()
            && self.album_art_uri.is_empty()
    }
}
