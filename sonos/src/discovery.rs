//! Device level discovery: scans that hand back [`SonosDevice`]s bound to a
//! control point.

use std::sync::Arc;
use std::thread::JoinHandle;

use crate::device::{ControlPoint, SonosDevice};
use crate::error::{Result, SonosError};
use crate::transport::discovery::{Discovery, DiscoveryConfig};

/// Every zone player that answers within the default two second window.
pub fn discover(control_point: &Arc<ControlPoint>) -> Result<Vec<SonosDevice>> {
    discover_with(control_point, DiscoveryConfig::default())
}

pub fn discover_with(control_point: &Arc<ControlPoint>, config: DiscoveryConfig) -> Result<Vec<SonosDevice>> {
    config.validate().map_err(SonosError::InvalidArgument)?;

    let devices: Vec<SonosDevice> = Discovery::new(config)
        .discover()?
        .into_iter()
        .map(|descriptor| SonosDevice::new(descriptor, Arc::clone(control_point)))
        .collect();

    log::debug!("Discovered {} device response(s)", devices.len());
    Ok(devices)
}

/// The first zone player to answer, if any.
pub fn discover_one(control_point: &Arc<ControlPoint>) -> Result<Option<SonosDevice>> {
    first_answer(control_point, DiscoveryConfig::default())
}

/// Search for the device with the given local UID, e.g. `RINCON_000E58A0123401400`.
///
/// Always performs a fresh scan.
pub fn discover_by_uid(control_point: &Arc<ControlPoint>, uid: &str) -> Result<Option<SonosDevice>> {
    let config = DiscoveryConfig::default().with_search_target(Some(format!("uuid:{}", uid)));
    first_answer(control_point, config)
}

/// Search for the device whose zone name matches `name`, ignoring case.
///
/// Always performs a fresh scan since zone names can change. Devices that
/// fail to report their zone name are skipped.
pub fn discover_by_name(control_point: &Arc<ControlPoint>, name: &str) -> Result<Option<SonosDevice>> {
    for device in discover(control_point)? {
        match device.zone_name() {
            Ok(zone_name) if zone_name.eq_ignore_ascii_case(name) => return Ok(Some(device)),
            Ok(_) => {}
            Err(e) => log::debug!("Skipping {} while searching for {:?}: {}", device.ip(), name, e),
        }
    }
    Ok(None)
}

/// Scan on a background thread and hand each device to `callback` as soon
/// as it answers.
pub fn discover_async<F>(control_point: Arc<ControlPoint>, config: DiscoveryConfig, mut callback: F) -> JoinHandle<()>
where
    F: FnMut(SonosDevice) + Send + 'static,
{
    Discovery::new(config).discover_async(move |descriptor| {
        callback(SonosDevice::new(descriptor, Arc::clone(&control_point)));
    })
}

fn first_answer(control_point: &Arc<ControlPoint>, config: DiscoveryConfig) -> Result<Option<SonosDevice>> {
    config.validate().map_err(SonosError::InvalidArgument)?;

    Ok(Discovery::new(config)
        .discover_one()?
        .map(|descriptor| SonosDevice::new(descriptor, Arc::clone(control_point))))
}
