use super::ssdp::{DeviceDescriptor, SsdpClient};
use crate::error::{Result, SonosError};
use std::collections::HashSet;
use std::thread::JoinHandle;
use std::time::Duration;

/// Search target advertised by Sonos zone players
pub const ZONE_PLAYER_URN: &str = "urn:schemas-upnp-org:device:ZonePlayer:1";

/// Discovery settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryConfig {
    /// Load balancing delay (MX) devices may wait before answering, 1..=5 seconds
    pub mx: u8,
    /// How long responses are collected
    pub timeout: Duration,
    /// Search target; `None` searches for every device
    pub search_target: Option<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            mx: 1,
            timeout: Duration::from_secs(2),
            search_target: Some(ZONE_PLAYER_URN.to_string()),
        }
    }
}

impl DiscoveryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the load balancing delay with validation
    pub fn with_mx(mut self, mx: u8) -> std::result::Result<Self, String> {
        if !(1..=5).contains(&mx) {
            return Err("MX must be within 1..=5 seconds".to_string());
        }
        self.mx = mx;
        Ok(self)
    }

    /// Set the scan window with validation
    pub fn with_timeout(mut self, timeout: Duration) -> std::result::Result<Self, String> {
        if timeout.is_zero() {
            return Err("Discovery timeout must be greater than 0".to_string());
        }
        self.timeout = timeout;
        Ok(self)
    }

    pub fn with_search_target(mut self, search_target: Option<String>) -> Self {
        self.search_target = search_target;
        self
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if !(1..=5).contains(&self.mx) {
            return Err("MX must be within 1..=5 seconds".to_string());
        }
        if self.timeout.is_zero() {
            return Err("Discovery timeout must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Discovery service producing one descriptor per response datagram
pub struct Discovery {
    config: DiscoveryConfig,
}

impl Discovery {
    pub fn new(config: DiscoveryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// Collect every response that arrives within the scan window.
    ///
    /// Devices answering on several interfaces are reported once per
    /// answer; see [`dedup_by_usn`].
    pub fn discover(&self) -> Result<Vec<DeviceDescriptor>> {
        let mut found = Vec::new();
        self.scan(|descriptor| {
            found.push(descriptor);
            true
        })?;
        Ok(found)
    }

    /// Return the first responding device, if any.
    pub fn discover_one(&self) -> Result<Option<DeviceDescriptor>> {
        let mut first = None;
        self.scan(|descriptor| {
            first = Some(descriptor);
            false
        })?;
        Ok(first)
    }

    /// Scan on a background thread, invoking `callback` as each response arrives.
    pub fn discover_async<F>(self, mut callback: F) -> JoinHandle<()>
    where
        F: FnMut(DeviceDescriptor) + Send + 'static,
    {
        std::thread::spawn(move || {
            if let Err(e) = self.scan(|descriptor| {
                callback(descriptor);
                true
            }) {
                log::error!("Asynchronous discovery failed: {}", e);
            }
        })
    }

    /// Run one scan, handing each descriptor to `visit` until it returns false.
    fn scan<F>(&self, mut visit: F) -> Result<()>
    where
        F: FnMut(DeviceDescriptor) -> bool,
    {
        let client = SsdpClient::new(self.config.timeout)
            .map_err(|e| SonosError::Discovery(format!("Failed to create SSDP client: {}", e)))?;

        let responses = client
            .search(self.config.mx, self.config.search_target.as_deref())
            .map_err(|e| SonosError::Discovery(format!("SSDP search failed: {}", e)))?;

        for response in responses {
            match response {
                Ok(descriptor) => {
                    if !visit(descriptor) {
                        break;
                    }
                }
                Err(e) => {
                    log::debug!("Discovery receive error: {}", e);
                }
            }
        }

        Ok(())
    }
}

/// Keep only the first descriptor per unique service name.
///
/// Descriptors without a USN are kept as-is.
pub fn dedup_by_usn(descriptors: Vec<DeviceDescriptor>) -> Vec<DeviceDescriptor> {
    let mut seen = HashSet::new();
    descriptors
        .into_iter()
        .filter(|descriptor| match descriptor.unique_service_name() {
            Some(usn) => seen.insert(usn.to_string()),
            None => true,
        })
        .collect()
}

/// Convenience function for a scan with the default settings
pub fn discover_devices() -> Result<Vec<DeviceDescriptor>> {
    Discovery::new(DiscoveryConfig::default()).discover()
}

/// Convenience function for a scan with a custom window
pub fn discover_devices_with_timeout(timeout: Duration) -> Result<Vec<DeviceDescriptor>> {
    let config = DiscoveryConfig::default()
        .with_timeout(timeout)
        .map_err(SonosError::InvalidArgument)?;
    Discovery::new(config).discover()
}
