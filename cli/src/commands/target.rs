use std::net::IpAddr;
use std::str::FromStr;
use std::sync::Arc;

use sonos_upnp::{discovery, ControlPoint, SonosDevice};
use crate::commands::CommandError;

/// Which device a command goes to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Talk to this address directly, without discovery
    Address(IpAddr),
    /// The device whose zone name matches, ignoring case
    Name(String),
    /// Whichever device answers discovery first
    First,
}

impl FromStr for Target {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("Device cannot be empty".to_string());
        }
        Ok(match s.parse::<IpAddr>() {
            Ok(address) => Target::Address(address),
            Err(_) => Target::Name(s.to_string()),
        })
    }
}

impl Target {
    pub fn resolve(&self, control_point: &Arc<ControlPoint>) -> Result<SonosDevice, CommandError> {
        match self {
            Target::Address(address) => Ok(SonosDevice::from_ip(*address, Arc::clone(control_point))),
            Target::Name(name) => {
                log::debug!("Looking for {:?}", name);
                discovery::discover_by_name(control_point, name)?
                    .ok_or_else(|| CommandError::DeviceNotFound(name.clone()))
            }
            Target::First => discovery::discover_one(control_point)?.ok_or(CommandError::NoDevicesFound),
        }
    }
}
