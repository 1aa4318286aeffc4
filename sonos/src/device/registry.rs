use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use uuid::Uuid;

use crate::events::SonosEventListener;

/// Handle returned when a listener is registered on a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(Uuid);

impl ListenerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ListenerId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ListenerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub type ListenerList = Arc<Vec<(ListenerId, Arc<dyn SonosEventListener>)>>;

/// Per-device state shared between a facade and its event dispatchers
#[derive(Default)]
pub struct DeviceEntry {
    name: RwLock<Option<String>>,
    listeners: RwLock<ListenerList>,
    subscriptions: Mutex<Vec<String>>,
}

impl DeviceEntry {
    pub fn device_name(&self) -> Option<String> {
        self.name.read().clone()
    }

    pub fn set_device_name(&self, name: impl Into<String>) {
        *self.name.write() = Some(name.into());
    }

    /// Snapshot of the registered listeners. Readers never observe a
    /// partially updated list.
    pub fn listeners(&self) -> ListenerList {
        Arc::clone(&self.listeners.read())
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    /// Add `listener` unless this very instance is already registered.
    pub fn add_listener(&self, listener: Arc<dyn SonosEventListener>) -> Option<ListenerId> {
        let mut guard = self.listeners.write();
        let already_registered = guard
            .iter()
            .any(|(_, existing)| Arc::as_ptr(existing) as *const () == Arc::as_ptr(&listener) as *const ());
        if already_registered {
            return None;
        }

        let id = ListenerId::new();
        let mut updated = guard.as_ref().clone();
        updated.push((id, listener));
        *guard = Arc::new(updated);
        Some(id)
    }

    /// Remove a listener. Returns the number of listeners left, or `None`
    /// if `id` was not registered.
    pub fn remove_listener(&self, id: ListenerId) -> Option<usize> {
        let mut guard = self.listeners.write();
        if !guard.iter().any(|(existing, _)| *existing == id) {
            return None;
        }

        let updated: Vec<_> = guard.iter().filter(|(existing, _)| *existing != id).cloned().collect();
        let remaining = updated.len();
        *guard = Arc::new(updated);
        Some(remaining)
    }

    pub(crate) fn set_subscriptions(&self, sids: Vec<String>) {
        *self.subscriptions.lock() = sids;
    }

    pub(crate) fn take_subscriptions(&self) -> Vec<String> {
        std::mem::take(&mut *self.subscriptions.lock())
    }

    pub fn subscription_ids(&self) -> Vec<String> {
        self.subscriptions.lock().clone()
    }
}

/// Devices known to a control point, keyed by address.
///
/// Dispatchers resolve the device they report for through this registry
/// instead of holding on to the facade.
#[derive(Default)]
pub struct DeviceRegistry {
    devices: DashMap<String, Arc<DeviceEntry>>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The entry for `key`, created on first use.
    pub fn entry(&self, key: &str) -> Arc<DeviceEntry> {
        Arc::clone(self.devices.entry(key.to_string()).or_default().value())
    }

    pub fn get(&self, key: &str) -> Option<Arc<DeviceEntry>> {
        self.devices.get(key).map(|entry| Arc::clone(entry.value()))
    }

    pub fn device_name(&self, key: &str) -> Option<String> {
        self.get(key).and_then(|entry| entry.device_name())
    }

    pub fn listeners(&self, key: &str) -> ListenerList {
        self.get(key).map(|entry| entry.listeners()).unwrap_or_default()
    }

    pub fn remove(&self, key: &str) -> Option<Arc<DeviceEntry>> {
        self.devices.remove(key).map(|(_, entry)| entry)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}
