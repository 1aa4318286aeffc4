use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use crate::transport::soap::DEVICE_PORT;
use crate::transport::ssdp::USER_AGENT;

/// Default subscription lifetime requested from devices
pub const DEFAULT_RENEWAL_SECONDS: u32 = 3600;

/// Renewals are sent this long before a subscription would expire
pub const RENEWAL_MARGIN_SECONDS: u32 = 60;

/// Configuration for the subscription runtime and its callback listener
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionConfig {
    /// Subscription lifetime requested when none is given explicitly
    pub default_renewal_seconds: u32,
    /// Address devices call back on; auto-detected when `None`
    pub callback_address: Option<IpAddr>,
    /// Upper bound for reading one inbound notification
    pub read_timeout: Duration,
    /// Silence after which an inbound read is considered complete
    pub idle_timeout: Duration,
    /// How long a device may take to answer SUBSCRIBE, renewal or UNSUBSCRIBE
    pub request_timeout: Duration,
    /// Port devices accept subscription requests on
    pub device_port: u16,
    pub user_agent: String,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            default_renewal_seconds: DEFAULT_RENEWAL_SECONDS,
            callback_address: None,
            read_timeout: Duration::from_millis(300),
            idle_timeout: Duration::from_millis(200),
            request_timeout: Duration::from_secs(30),
            device_port: DEVICE_PORT,
            user_agent: USER_AGENT.to_string(),
        }
    }
}

impl SubscriptionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default subscription lifetime with validation
    pub fn with_default_renewal_seconds(mut self, seconds: u32) -> Result<Self, String> {
        if seconds != 0 && seconds <= RENEWAL_MARGIN_SECONDS {
            return Err(format!(
                "Renewal period must exceed {} seconds (or be 0 to disable renewal)",
                RENEWAL_MARGIN_SECONDS
            ));
        }
        self.default_renewal_seconds = seconds;
        Ok(self)
    }

    pub fn with_callback_address(mut self, address: IpAddr) -> Self {
        self.callback_address = Some(address);
        self
    }

    /// Set the inbound read timeout with validation
    pub fn with_read_timeout(mut self, timeout: Duration) -> Result<Self, String> {
        if timeout.is_zero() {
            return Err("Read timeout must be greater than 0".to_string());
        }
        self.read_timeout = timeout;
        Ok(self)
    }

    /// Set the inbound idle timeout with validation
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Result<Self, String> {
        if timeout.is_zero() {
            return Err("Idle timeout must be greater than 0".to_string());
        }
        self.idle_timeout = timeout;
        Ok(self)
    }

    /// Set the request timeout with validation
    pub fn with_request_timeout(mut self, timeout: Duration) -> Result<Self, String> {
        if timeout.is_zero() {
            return Err("Request timeout must be greater than 0".to_string());
        }
        self.request_timeout = timeout;
        Ok(self)
    }

    pub fn with_device_port(mut self, port: u16) -> Result<Self, String> {
        if port == 0 {
            return Err("Device port must be greater than 0".to_string());
        }
        self.device_port = port;
        Ok(self)
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.default_renewal_seconds != 0 && self.default_renewal_seconds <= RENEWAL_MARGIN_SECONDS {
            return Err("Default renewal period leaves no time to renew".to_string());
        }
        if self.read_timeout.is_zero() || self.idle_timeout.is_zero() {
            return Err("Read and idle timeouts must be greater than 0".to_string());
        }
        if self.request_timeout.is_zero() {
            return Err("Request timeout must be greater than 0".to_string());
        }
        if self.device_port == 0 {
            return Err("Device port must be greater than 0".to_string());
        }
        Ok(())
    }

    /// The configured callback address, or the first site-local address of
    /// this host. Falls back to loopback when no interface qualifies.
    pub fn resolve_callback_address(&self) -> IpAddr {
        if let Some(address) = self.callback_address {
            return address;
        }

        match local_ip_address::local_ip() {
            Ok(address) => address,
            Err(e) => {
                log::warn!("Could not determine a local network address ({}); using loopback", e);
                IpAddr::V4(Ipv4Addr::LOCALHOST)
            }
        }
    }
}
