use std::time::Duration;

use super::service::Service;
use crate::codec;
use crate::error::{Result, SonosError};

/// Port Sonos devices serve control and description requests on
pub const DEVICE_PORT: u16 = 1400;

/// HTTP settings for the command layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoapConfig {
  pub port: u16,
  pub timeout: Duration,
}

impl Default for SoapConfig {
  fn default() -> Self {
    Self {
      port: DEVICE_PORT,
      timeout: Duration::from_secs(10),
    }
  }
}

impl SoapConfig {
  pub fn with_port(mut self, port: u16) -> std::result::Result<Self, String> {
    if port == 0 {
      return Err("Port must be greater than 0".to_string());
    }
    self.port = port;
    Ok(self)
  }

  pub fn with_timeout(mut self, timeout: Duration) -> std::result::Result<Self, String> {
    if timeout.is_zero() {
      return Err("Timeout must be greater than 0".to_string());
    }
    self.timeout = timeout;
    Ok(self)
  }
}

/// One action invocation: which service, which action, which arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoapRequest {
  pub service: Service,
  pub action: String,
  pub params: Vec<(String, String)>,
}

impl SoapRequest {
  pub fn new(service: Service, action: impl Into<String>) -> Self {
    Self {
      service,
      action: action.into(),
      params: Vec::new(),
    }
  }

  pub fn transport(action: &str) -> Self {
    Self::new(Service::AvTransport, action)
  }

  pub fn rendering(action: &str) -> Self {
    Self::new(Service::RenderingControl, action)
  }

  pub fn device(action: &str) -> Self {
    Self::new(Service::DeviceProperties, action)
  }

  pub fn content_directory(action: &str) -> Self {
    Self::new(Service::ContentDirectory, action)
  }

  pub fn zone_group_topology(action: &str) -> Self {
    Self::new(Service::ZoneGroupTopology, action)
  }

  /// Append an argument. The value is XML-escaped unless it already
  /// contains entity sequences.
  pub fn param(mut self, name: &str, value: impl AsRef<str>) -> Self {
    self.params.push((name.to_string(), codec::escape_if_needed(value.as_ref())));
    self
  }

  /// Render the SOAP 1.1 envelope for this request.
  pub fn envelope(&self) -> String {
    let mut params_xml = String::new();
    for (key, value) in &self.params {
      params_xml.push_str(&format!("<{}>{}</{}>", key, value, key));
    }

    format!(
      "<?xml version=\"1.0\" encoding=\"utf-8\"?>\
        <s:Envelope xmlns:s=\"http://schemas.xmlsoap.org/soap/envelope/\" \
        s:encodingStyle=\"http://schemas.xmlsoap.org/soap/encoding/\">\
        <s:Body>\
        <u:{} xmlns:u=\"{}\">{}</u:{}>\
        </s:Body>\
        </s:Envelope>",
      self.action,
      self.service.urn(),
      params_xml,
      self.action
    )
  }

  /// Value of the SOAPACTION header
  pub fn soap_action(&self) -> String {
    format!("{}#{}", self.service.urn(), self.action)
  }
}

/// Blocking HTTP client for device actions and document downloads
#[derive(Debug, Clone)]
pub struct SoapClient {
  http_client: reqwest::blocking::Client,
  port: u16,
}

impl SoapClient {
  pub fn new(config: &SoapConfig) -> Result<Self> {
    let http_client = reqwest::blocking::Client::builder()
      .timeout(config.timeout)
      .build()
      .map_err(|e| SonosError::Transport(format!("Failed to create HTTP client: {}", e)))?;

    Ok(Self {
      http_client,
      port: config.port,
    })
  }

  pub fn port(&self) -> u16 {
    self.port
  }

  /// Execute `request` on the device at `ip` and return the unescaped
  /// response body.
  pub fn execute(&self, ip: &str, request: &SoapRequest) -> Result<String> {
    let url = format!("http://{}:{}{}", ip, self.port, request.service.control_path());
    log::debug!("{} {} on {}", request.service.urn(), request.action, ip);

    let response = self
      .http_client
      .post(&url)
      .header("Content-Type", "text/xml; charset=\"utf-8\"")
      .header("SOAPACTION", request.soap_action())
      .body(request.envelope())
      .send()?;

    let status = response.status();
    let raw = response.text()?;

    // Faults are plain XML, so look before unescaping nested metadata.
    check_error(ip, &raw)?;

    if !status.is_success() {
      return Err(SonosError::Transport(format!(
        "{} returned HTTP {} for {}",
        ip, status, request.action
      )));
    }

    Ok(codec::unescape(&raw))
  }

  /// GET a document from the device, e.g. `xml/device_description.xml`.
  pub fn download(&self, ip: &str, path: &str) -> Result<String> {
    let url = format!("http://{}:{}/{}", ip, self.port, path.trim_start_matches('/'));

    let response = self.http_client.get(&url).send()?;
    let status = response.status();
    let body = response.text()?;

    check_error(ip, &body)?;

    if !status.is_success() {
      return Err(SonosError::Transport(format!("{} returned HTTP {} for {}", ip, status, path)));
    }

    Ok(body)
  }
}

/// Fail with a protocol error if `body` carries an `errorCode` element.
/// The word on its own, e.g. inside escaped track metadata, is not a fault.
pub fn check_error(ip: &str, body: &str) -> Result<()> {
  let raw_code = codec::find_one("<errorCode>\\s*([0-9]+)\\s*</errorCode>", body);
  if raw_code.is_empty() {
    return Ok(());
  }

  let code = raw_code
    .parse::<u16>()
    .map_err(|_| SonosError::Parse(format!("errorCode {} out of range in response from {}", raw_code, ip)))?;

  let err = SonosError::protocol(code, ip, body);
  log::debug!("{}", err);
  Err(err)
}
