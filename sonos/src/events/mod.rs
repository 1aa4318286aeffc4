//! Event dispatchers: turn raw notifications of one service into typed
//! callbacks on the listeners registered for a device.

pub mod av_transport;
pub mod queue;
pub mod rendering_control;
pub mod zone_topology;

use std::sync::Arc;

pub use av_transport::AvTransportDispatcher;
pub use queue::QueueDispatcher;
pub use rendering_control::RenderingControlDispatcher;
pub use zone_topology::ZoneTopologyDispatcher;

use crate::device::registry::DeviceRegistry;
use crate::model::{AvTransportEvent, PlayMode, PlayState, QueueEvent, TrackInfo};

/// Typed device callbacks. Override only what you need.
pub trait SonosEventListener: Send + Sync {
    fn volume_changed(&self, _volume: u8) {}

    fn play_state_changed(&self, _state: PlayState) {}

    fn play_mode_changed(&self, _mode: PlayMode) {}

    /// One call per notification, carrying every queue it touched.
    fn queue_changed(&self, _queues: &[QueueEvent]) {}

    fn track_changed(&self, _track: &TrackInfo) {}

    fn treble_changed(&self, _treble: i8) {}

    fn bass_changed(&self, _bass: i8) {}

    fn loudness_changed(&self, _loudness: bool) {}

    /// Every decoded transport notification, whether or not a field changed.
    fn av_transport_event(&self, _event: &AvTransportEvent) {}

    fn device_connected(&self, _device_name: &str) {}

    fn device_disconnected(&self, _device_name: &str) {}

    /// Members of this device's group after a membership change.
    fn group_changed(&self, _members: &[String]) {}
}

/// Where a dispatcher delivers to: one device entry in a registry.
#[derive(Clone)]
pub struct DispatchTarget {
    registry: Arc<DeviceRegistry>,
    device_key: String,
}

impl DispatchTarget {
    pub fn new(registry: Arc<DeviceRegistry>, device_key: impl Into<String>) -> Self {
        Self {
            registry,
            device_key: device_key.into(),
        }
    }

    pub fn device_key(&self) -> &str {
        &self.device_key
    }

    /// Cached display name of the device, if it has been fetched.
    pub fn device_name(&self) -> Option<String> {
        self.registry.device_name(&self.device_key)
    }

    /// Invoke `callback` on every listener currently registered.
    pub fn emit<F>(&self, callback: F)
    where
        F: Fn(&dyn SonosEventListener),
    {
        for (_, listener) in self.registry.listeners(&self.device_key).iter() {
            callback(listener.as_ref());
        }
    }
}

impl std::fmt::Debug for DispatchTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchTarget").field("device_key", &self.device_key).finish()
    }
}
