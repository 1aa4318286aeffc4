//! Control point for Sonos devices: SSDP discovery, SOAP commands and GENA
//! event subscriptions with typed change callbacks.

pub mod codec;
pub mod device;
pub mod discovery;
pub mod error;
pub mod events;
pub mod model;
pub mod streaming;
pub mod transport;

// Re-export key types for easier access
pub use device::{ControlPoint, ListenerId, SonosDevice};
pub use error::{Result, SonosError};
pub use events::SonosEventListener;
pub use model::{AvTransportEvent, PlayMode, PlayState, QueueEvent, SpeakerInfo, TrackInfo, TrackMetadata, ZoneInfo};
pub use streaming::{SubscriptionConfig, SubscriptionError, SubscriptionRuntime, UpnpEventListener};
pub use transport::discovery::{dedup_by_usn, DiscoveryConfig};
pub use transport::ssdp::DeviceDescriptor;
pub use tokio_util::sync::CancellationToken;
