//! Parsing of inbound NOTIFY requests delivered to the callback listener.

use xmltree::Element;

use crate::codec;

/// Marker where the property set of a notification starts
const PROPERTY_SET_MARKER: &str = "<e:propertyset";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum NotifyError {
    #[error("Nothing was received")]
    Empty,

    #[error("Missing or invalid header: {0}")]
    InvalidHeader(&'static str),

    #[error("Event body is not well-formed XML: {0}")]
    MalformedBody(String),
}

/// GENA headers of one NOTIFY request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotifyHeaders {
    pub host: Option<String>,
    pub content_length: Option<usize>,
    pub nt: Option<String>,
    pub nts: Option<String>,
    pub sid: Option<String>,
    pub seq: Option<String>,
}

impl NotifyHeaders {
    pub fn new(sid: &str, seq: u32) -> Self {
        Self {
            nt: Some("upnp:event".to_string()),
            nts: Some("upnp:propchange".to_string()),
            sid: Some(sid.to_string()),
            seq: Some(seq.to_string()),
            ..Self::default()
        }
    }
}

/// Headers and decoded body text of one NOTIFY request, before the body
/// has been parsed.
#[derive(Debug, Clone)]
pub struct NotifyRequest {
    headers: NotifyHeaders,
    body: String,
}

impl NotifyRequest {
    /// If the payload looks escaped it is unescaped exactly once: nested
    /// documents (track metadata inside a `val` attribute) must stay
    /// escaped for the XML parser.
    pub fn new(headers: NotifyHeaders, body: &[u8]) -> Result<Self, NotifyError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Err(NotifyError::Empty);
        }

        let mut body = String::from_utf8_lossy(body).into_owned();
        if codec::is_escaped(&body) {
            body = codec::unescape_once(&body);
        }
        if let Some(start) = body.find(PROPERTY_SET_MARKER) {
            body.drain(..start);
        }

        Ok(Self { headers, body })
    }

    pub fn headers(&self) -> &NotifyHeaders {
        &self.headers
    }

    pub fn sid(&self) -> Option<&str> {
        self.headers.sid.as_deref().map(str::trim).filter(|sid| !sid.is_empty())
    }

    pub fn seq(&self) -> Result<u32, NotifyError> {
        self.headers
            .seq
            .as_deref()
            .and_then(|seq| seq.trim().parse().ok())
            .ok_or(NotifyError::InvalidHeader("SEQ"))
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// Parse the body into an element tree.
    pub fn into_event(self) -> Result<InboundEvent, NotifyError> {
        let sid = self.sid().ok_or(NotifyError::InvalidHeader("SID"))?.to_string();
        let seq = self.seq()?;
        let body = Element::parse(self.body.as_bytes()).map_err(|e| NotifyError::MalformedBody(e.to_string()))?;

        Ok(InboundEvent {
            host: self.headers.host.unwrap_or_default(),
            content_length: self.headers.content_length,
            nt: self.headers.nt,
            nts: self.headers.nts,
            sid,
            seq,
            body,
        })
    }
}

/// One parsed event delivery
#[derive(Debug, Clone)]
pub struct InboundEvent {
    pub host: String,
    pub content_length: Option<usize>,
    pub nt: Option<String>,
    pub nts: Option<String>,
    pub sid: String,
    pub seq: u32,
    /// The `propertyset` root element
    pub body: Element,
}

impl InboundEvent {
    /// Parse an event from headers and an XML body. Used to feed
    /// dispatchers outside of a live subscription.
    pub fn from_body(sid: &str, seq: u32, body: &str) -> Result<Self, NotifyError> {
        let body = Element::parse(body.as_bytes()).map_err(|e| NotifyError::MalformedBody(e.to_string()))?;
        Ok(Self {
            host: String::new(),
            content_length: None,
            nt: Some("upnp:event".to_string()),
            nts: Some("upnp:propchange".to_string()),
            sid: sid.to_string(),
            seq,
            body,
        })
    }

    /// The changed state variables: the element children of every
    /// `property` element of the property set.
    pub fn properties(&self) -> impl Iterator<Item = &Element> {
        self.body
            .children
            .iter()
            .filter_map(|node| node.as_element())
            .filter(|element| element.name == "property")
            .flat_map(|property| property.children.iter().filter_map(|node| node.as_element()))
    }

    pub fn property(&self, name: &str) -> Option<&Element> {
        self.properties().find(|element| element.name == name)
    }
}

/// The `InstanceID` element inside a `LastChange` property.
pub fn last_change_instance(last_change: &Element) -> Option<&Element> {
    last_change.get_child("Event")?.get_child("InstanceID")
}

/// Child elements of `element`.
pub fn child_elements(element: &Element) -> impl Iterator<Item = &Element> {
    element.children.iter().filter_map(|node| node.as_element())
}

/// The `val` attribute of a state variable element.
pub fn val(element: &Element) -> Option<&str> {
    element.attributes.get("val").map(String::as_str)
}
