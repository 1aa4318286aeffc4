use crate::error::{Result, SonosError};
use crate::model::SpeakerInfo;
use serde::Deserialize;

/// Path of the UPnP root device description
pub const DEVICE_DESCRIPTION_PATH: &str = "xml/device_description.xml";
/// Path of the support page describing the zone player
pub const STATUS_ZP_PATH: &str = "status/zp";

/// UPnP device description root element
#[derive(Debug, Deserialize)]
struct Root {
  device: DeviceDescription,
}

/// The top-level device of a device description. Embedded devices in
/// `deviceList` are not read.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeviceDescription {
  pub device_type: String,
  pub friendly_name: String,
  pub manufacturer: String,
  pub model_name: String,
  pub model_number: Option<String>,
  pub serial_num: Option<String>,
  #[serde(rename = "UDN")]
  pub udn: String,
  pub room_name: String,
  pub display_name: Option<String>,
}

impl DeviceDescription {
  pub fn from_xml(xml: &str) -> Result<Self> {
    let root: Root = quick_xml::de::from_str(xml)
      .map_err(|e| SonosError::Parse(format!("Failed to parse device XML: {}", e)))?;

    Ok(root.device)
  }

  /// Check if this device is a Sonos zone player
  pub fn is_zone_player(&self) -> bool {
    self.manufacturer.to_lowercase().contains("sonos") || self.device_type.contains("ZonePlayer")
  }
}

#[derive(Debug, Deserialize)]
struct ZpSupportInfo {
  #[serde(rename = "ZPInfo", default)]
  zp_info: ZpInfo,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct ZpInfo {
  zone_name: String,
  zone_icon: String,
  configuration: String,
  #[serde(rename = "LocalUID")]
  local_uid: String,
  serial_number: String,
  software_version: String,
  software_date: String,
  software_scm: String,
  min_compatible_version: String,
  legacy_compatible_version: String,
  hardware_version: String,
  dsp_version: String,
  hw_flags: String,
  hw_features: String,
  variant: String,
  general_flags: String,
  #[serde(rename = "IPAddress")]
  ip_address: String,
  #[serde(rename = "MACAddress")]
  mac_address: String,
  copyright: String,
  extra_info: String,
  #[serde(rename = "HTAudioInCode")]
  ht_audio_in_code: String,
  idx_trk: String,
  #[serde(rename = "MDP2Ver")]
  mdp2_ver: String,
  #[serde(rename = "MDP3Ver")]
  mdp3_ver: String,
}

impl From<ZpInfo> for SpeakerInfo {
  fn from(info: ZpInfo) -> Self {
    SpeakerInfo {
      zone_name: info.zone_name,
      zone_icon: info.zone_icon,
      configuration: info.configuration,
      local_uid: info.local_uid,
      serial_number: info.serial_number,
      software_version: info.software_version,
      software_date: info.software_date,
      software_scm: info.software_scm,
      min_compatible_version: info.min_compatible_version,
      legacy_compatible_version: info.legacy_compatible_version,
      hardware_version: info.hardware_version,
      dsp_version: info.dsp_version,
      hw_flags: info.hw_flags,
      hw_features: info.hw_features,
      variant: info.variant,
      general_flags: info.general_flags,
      ip_address: info.ip_address,
      mac_address: info.mac_address,
      copyright: info.copyright,
      extra_info: info.extra_info,
      ht_audio_in_code: info.ht_audio_in_code,
      idx_trk: info.idx_trk,
      mdp2_ver: info.mdp2_ver,
      mdp3_ver: info.mdp3_ver,
    }
  }
}

/// Parse the `/status/zp` support page. Missing elements become empty strings.
pub fn parse_speaker_info(xml: &str) -> Result<SpeakerInfo> {
  let support: ZpSupportInfo = quick_xml::de::from_str(xml)
    .map_err(|e| SonosError::Parse(format!("Failed to parse zone player status: {}", e)))?;

  Ok(support.zp_info.into())
}

/// Extract IP address from a URL
pub fn extract_ip_from_url(url: &str) -> Option<String> {
  url.split("//")
    .nth(1)?
    .split(['/', ':'])
    .next()
    .filter(|s| !s.is_empty())
    .map(|s| s.to_string())
}
